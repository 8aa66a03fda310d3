//! Raw message value → [`ChangeEvent`] conversion.

use relay_core::{ChangeEvent, ChangeOp, RowImage};
use serde_json::Value;

use crate::error::DecodeError;

/// Result of decoding one message value.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Tombstone or JSON `null`: nothing to apply
    Empty,
    /// Not a usable change event; dropped by the caller
    Unknown(DecodeError),
    /// A create, update or delete
    Change(ChangeEvent),
}

impl Decoded {
    pub fn change(self) -> Option<ChangeEvent> {
        match self {
            Self::Change(event) => Some(event),
            _ => None,
        }
    }
}

/// Decode a raw message value.
///
/// `None` and zero-length values are tombstones. Any parse or shape problem
/// yields [`Decoded::Unknown`]; this function never panics on bad input.
pub fn decode(value: Option<&[u8]>) -> Decoded {
    let bytes = match value {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Decoded::Empty,
    };

    match serde_json::from_slice::<Value>(bytes) {
        Ok(envelope) => decode_value(&envelope),
        Err(e) => Decoded::Unknown(DecodeError::InvalidJson(e.to_string())),
    }
}

/// Decode an already-parsed envelope.
pub fn decode_value(envelope: &Value) -> Decoded {
    if envelope.is_null() {
        return Decoded::Empty;
    }
    match envelope_to_change(envelope) {
        Ok(event) => Decoded::Change(event),
        Err(e) => Decoded::Unknown(e),
    }
}

fn envelope_to_change(envelope: &Value) -> Result<ChangeEvent, DecodeError> {
    let envelope = envelope.as_object().ok_or(DecodeError::EnvelopeNotObject)?;

    let payload = envelope
        .get("payload")
        .and_then(Value::as_object)
        .ok_or(DecodeError::MissingPayload)?;

    let op_code = payload
        .get("op")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingOp)?;

    let op = ChangeOp::from_code(op_code)
        .ok_or_else(|| DecodeError::UnsupportedOp(op_code.to_string()))?;

    let before = image(payload.get("before"), "before")?;
    let after = image(payload.get("after"), "after")?;

    match op {
        ChangeOp::Create => Ok(ChangeEvent::Create {
            after: after.ok_or(DecodeError::MissingImage {
                op: "c",
                image: "after",
            })?,
        }),
        ChangeOp::Update => Ok(ChangeEvent::Update {
            before,
            after: after.ok_or(DecodeError::MissingImage {
                op: "u",
                image: "after",
            })?,
        }),
        ChangeOp::Delete => Ok(ChangeEvent::Delete {
            before: before.ok_or(DecodeError::MissingImage {
                op: "d",
                image: "before",
            })?,
        }),
    }
}

/// Read an optional row image. Absent and `null` are both "no image".
fn image(value: Option<&Value>, name: &'static str) -> Result<Option<RowImage>, DecodeError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(RowImage::from(map.clone()))),
        Some(_) => Err(DecodeError::ImageNotObject { image: name }),
    }
}
