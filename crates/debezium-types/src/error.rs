//! Error types for debezium-types crate.

use thiserror::Error;

/// Why a message could not be turned into a change event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Envelope is not a JSON object")]
    EnvelopeNotObject,

    #[error("Envelope has no 'payload' object")]
    MissingPayload,

    #[error("Payload has no 'op' field")]
    MissingOp,

    #[error("Unsupported operation: {0}")]
    UnsupportedOp(String),

    #[error("Operation '{op}' requires a '{image}' image")]
    MissingImage { op: &'static str, image: &'static str },

    #[error("'{image}' image is not a JSON object")]
    ImageNotObject { image: &'static str },
}
