//! Canonical text decoder.

use crate::encoder::to_canonical_text;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Decode a value from stored text.
///
/// Any well-formed JSON document is accepted; use [`CanonicalDecoder`] with
/// `strict` enabled to additionally reject text that is not in canonical form.
///
/// # Errors
///
/// Returns an error if the text is not valid JSON or holds an integer
/// outside the i64 range.
pub fn from_text(text: &str) -> CodecResult<Value> {
    CanonicalDecoder::new(text).decode()
}

/// A text decoder with optional canonical-form enforcement.
pub struct CanonicalDecoder<'a> {
    text: &'a str,
    strict: bool,
}

impl<'a> CanonicalDecoder<'a> {
    /// Create a new decoder for the given text.
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            strict: false,
        }
    }

    /// Reject input whose re-encoding differs from the input itself.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Decode the input.
    pub fn decode(&self) -> CodecResult<Value> {
        let json: serde_json::Value = serde_json::from_str(self.text)
            .map_err(|e| CodecError::decoding_failed(e.to_string()))?;
        let value = Value::from_json(json)?;

        if self.strict {
            let expected = to_canonical_text(&value)?;
            if expected != self.text {
                return Err(CodecError::NonCanonical { expected });
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_scalars() {
        assert_eq!(from_text("null").unwrap(), Value::Null);
        assert_eq!(from_text("true").unwrap(), Value::Bool(true));
        assert_eq!(from_text("-7").unwrap(), Value::Integer(-7));
        assert_eq!(from_text("2.5").unwrap(), Value::Float(2.5));
        assert_eq!(from_text("1e3").unwrap(), Value::Float(1000.0));
        assert_eq!(from_text(r#""web1""#).unwrap(), Value::from("web1"));
    }

    #[test]
    fn integer_and_float_stay_distinct() {
        assert_eq!(from_text("3").unwrap(), Value::Integer(3));
        assert_eq!(from_text("3.0").unwrap(), Value::Float(3.0));
    }

    #[test]
    fn decode_nested() {
        let value = from_text(r#"{"groups":["a","b"],"vars":{"port":22}}"#).unwrap();
        assert_eq!(value.get("groups"), Some(&Value::from(vec!["a", "b"])));
        assert_eq!(
            value.get("vars").and_then(|v| v.get("port")),
            Some(&Value::Integer(22))
        );
    }

    #[test]
    fn reject_out_of_range_integer() {
        assert!(matches!(
            from_text("18446744073709551615"),
            Err(CodecError::IntegerOverflow { .. })
        ));
    }

    #[test]
    fn reject_malformed_text() {
        assert!(matches!(
            from_text("{\"a\":"),
            Err(CodecError::DecodingFailed { .. })
        ));
        assert!(matches!(from_text(""), Err(CodecError::DecodingFailed { .. })));
    }

    #[test]
    fn lenient_accepts_whitespace_and_unsorted_keys() {
        let value = from_text(r#"{ "b": 1, "a": [1, 2] }"#).unwrap();
        assert_eq!(value.get("b"), Some(&Value::Integer(1)));
    }

    #[test]
    fn strict_rejects_non_canonical() {
        let err = CanonicalDecoder::new(r#"{"b":1, "a":2}"#)
            .strict(true)
            .decode()
            .unwrap_err();
        assert_eq!(
            err,
            CodecError::NonCanonical {
                expected: r#"{"a":2,"b":1}"#.to_string()
            }
        );

        assert!(CanonicalDecoder::new(r#"{"a":2,"b":1}"#)
            .strict(true)
            .decode()
            .is_ok());
    }
}
