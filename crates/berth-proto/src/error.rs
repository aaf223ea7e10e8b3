//! Error types for the berth-proto crate.

use thiserror::Error;

/// Errors that can occur while encoding, decoding or validating wire types.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Failed to encode a message.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Failed to decode a message.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// Resource kind not recognised.
    #[error("unknown resource kind: {0}")]
    UnknownKind(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),
}
