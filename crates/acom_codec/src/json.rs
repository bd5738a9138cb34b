//! Conversions between [`Value`] and `serde_json::Value`.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use serde_json::{Map, Number};

impl Value {
    /// Convert a parsed JSON document into a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::IntegerOverflow`] for integers above `i64::MAX`.
    pub fn from_json(json: serde_json::Value) -> CodecResult<Self> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => number_to_value(&n)?,
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(Value::from_json)
                    .collect::<CodecResult<_>>()?,
            ),
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Value::from_json(v).map(|v| (k, v)))
                    .collect::<CodecResult<_>>()?,
            ),
        })
    }

    /// Convert this value into a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NonFiniteFloat`] for NaN or infinite floats.
    pub fn to_json(&self) -> CodecResult<serde_json::Value> {
        Ok(match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(n) => serde_json::Value::Number(Number::from(*n)),
            Value::Float(f) => {
                serde_json::Value::Number(Number::from_f64(*f).ok_or(CodecError::NonFiniteFloat)?)
            }
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<CodecResult<_>>()?,
            ),
            Value::Map(entries) => {
                let mut object = Map::new();
                for (k, v) in entries {
                    object.insert(k.clone(), v.to_json()?);
                }
                serde_json::Value::Object(object)
            }
        })
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = CodecError;

    fn try_from(json: serde_json::Value) -> CodecResult<Self> {
        Value::from_json(json)
    }
}

fn number_to_value(n: &Number) -> CodecResult<Value> {
    if let Some(i) = n.as_i64() {
        return Ok(Value::Integer(i));
    }
    if n.is_u64() {
        return Err(CodecError::IntegerOverflow {
            text: n.to_string(),
        });
    }
    n.as_f64()
        .map(Value::Float)
        .ok_or_else(|| CodecError::decoding_failed(format!("unrepresentable number {n}")))
}
