//! # acom Codec
//!
//! Canonical text encoding of attribute values.
//!
//! Every attribute the store persists is written as text produced by this
//! crate, and lookups compare that text directly. The encoding therefore has
//! to be deterministic:
//! - Identical values produce identical text
//! - Map keys are sorted, so insertion order never leaks into storage
//! - Integers and floats keep distinct textual forms
//! - `decode(encode(v)) == v` for every finite value
//!
//! ## Usage
//!
//! ```
//! use acom_codec::{to_canonical_text, from_text, Value};
//!
//! let value = Value::map([("groups", Value::from(vec!["a", "b"]))]);
//! let text = to_canonical_text(&value).unwrap();
//! assert_eq!(text, r#"{"groups":["a","b"]}"#);
//!
//! let decoded = from_text(&text).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod json;
mod value;

pub use decoder::{from_text, CanonicalDecoder};
pub use encoder::{to_canonical_text, CanonicalEncoder};
pub use error::{CodecError, CodecResult};
pub use value::Value;

/// Trait for types that can be encoded to canonical text.
pub trait Encode {
    /// Encode this value to canonical text.
    fn encode(&self) -> CodecResult<String>;
}

/// Trait for types that can be decoded from stored text.
pub trait Decode: Sized {
    /// Decode a value from text.
    fn decode(text: &str) -> CodecResult<Self>;
}

impl Encode for Value {
    fn encode(&self) -> CodecResult<String> {
        to_canonical_text(self)
    }
}

impl Decode for Value {
    fn decode(text: &str) -> CodecResult<Self> {
        from_text(text)
    }
}
