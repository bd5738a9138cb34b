//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a value to text.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode stored text.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// NaN and infinite floats have no canonical text form.
    #[error("non-finite float values cannot be encoded")]
    NonFiniteFloat,

    /// Integer does not fit in a signed 64-bit value.
    #[error("integer overflow: {text}")]
    IntegerOverflow {
        /// The offending number as written.
        text: String,
    },

    /// Input decoded successfully but is not in canonical form.
    #[error("non-canonical encoding: expected {expected}")]
    NonCanonical {
        /// The canonical encoding of the decoded value.
        expected: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }
}
