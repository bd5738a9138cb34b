//! Canonical text encoder.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use serde_json::Number;
use std::collections::BTreeMap;

/// Encode a value to its canonical text form.
///
/// The output is compact JSON with these extra rules:
/// - Map keys appear in ascending bytewise order
/// - No insignificant whitespace
/// - Integers are written without a fraction; floats always carry one
///   (or an exponent), so the two never collide after decoding
///
/// Equal values always produce identical text, which is what lets the
/// store match attributes by comparing stored strings.
///
/// # Errors
///
/// Returns an error if the value contains a NaN or infinite float.
pub fn to_canonical_text(value: &Value) -> CodecResult<String> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode(value)?;
    Ok(encoder.into_string())
}

/// A canonical text encoder.
pub struct CanonicalEncoder {
    buffer: String,
}

impl CanonicalEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity),
        }
    }

    /// Encode a value, appending to the buffer.
    pub fn encode(&mut self, value: &Value) -> CodecResult<()> {
        match value {
            Value::Null => {
                self.buffer.push_str("null");
                Ok(())
            }
            Value::Bool(b) => {
                self.buffer.push_str(if *b { "true" } else { "false" });
                Ok(())
            }
            Value::Integer(n) => {
                self.buffer.push_str(&n.to_string());
                Ok(())
            }
            Value::Float(f) => self.encode_float(*f),
            Value::Text(s) => self.encode_text(s),
            Value::Array(items) => self.encode_array(items),
            Value::Map(entries) => self.encode_map(entries),
        }
    }

    /// Consume this encoder and return the encoded text.
    pub fn into_string(self) -> String {
        self.buffer
    }

    /// Get a reference to the encoded text.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    fn encode_float(&mut self, f: f64) -> CodecResult<()> {
        // serde_json formats through ryu: shortest text that parses back to `f`
        let number = Number::from_f64(f).ok_or(CodecError::NonFiniteFloat)?;
        self.buffer.push_str(&number.to_string());
        Ok(())
    }

    fn encode_text(&mut self, text: &str) -> CodecResult<()> {
        let quoted =
            serde_json::to_string(text).map_err(|e| CodecError::encoding_failed(e.to_string()))?;
        self.buffer.push_str(&quoted);
        Ok(())
    }

    fn encode_array(&mut self, items: &[Value]) -> CodecResult<()> {
        self.buffer.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.buffer.push(',');
            }
            self.encode(item)?;
        }
        self.buffer.push(']');
        Ok(())
    }

    fn encode_map(&mut self, entries: &BTreeMap<String, Value>) -> CodecResult<()> {
        self.buffer.push('{');
        // BTreeMap iterates in ascending key order
        for (i, (key, value)) in entries.iter().enumerate() {
            if i > 0 {
                self.buffer.push(',');
            }
            self.encode_text(key)?;
            self.buffer.push(':');
            self.encode(value)?;
        }
        self.buffer.push('}');
        Ok(())
    }
}

impl Default for CanonicalEncoder {
    fn default() -> Self {
        Self::new()
    }
}
