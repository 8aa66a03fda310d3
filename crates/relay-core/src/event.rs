//! Change event representation.

use crate::row::RowImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeOp {
    Create,
    Update,
    Delete,
}

impl ChangeOp {
    /// Parse a Debezium operation code (`c`, `u`, `d`).
    ///
    /// Snapshot reads (`r`), truncates (`t`) and messages (`m`) have no
    /// counterpart here and return `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "c" => Some(Self::Create),
            "u" => Some(Self::Update),
            "d" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Create => "c",
            Self::Update => "u",
            Self::Delete => "d",
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A decoded row change.
///
/// Each variant carries exactly the images its operation requires, so a
/// create without an after-image or a delete without a before-image cannot
/// be constructed. The before-image of an update is optional because the
/// source only includes it when the table has `REPLICA IDENTITY FULL`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChangeEvent {
    Create {
        after: RowImage,
    },
    Update {
        before: Option<RowImage>,
        after: RowImage,
    },
    Delete {
        before: RowImage,
    },
}

impl ChangeEvent {
    pub fn op(&self) -> ChangeOp {
        match self {
            Self::Create { .. } => ChangeOp::Create,
            Self::Update { .. } => ChangeOp::Update,
            Self::Delete { .. } => ChangeOp::Delete,
        }
    }

    pub fn before(&self) -> Option<&RowImage> {
        match self {
            Self::Create { .. } => None,
            Self::Update { before, .. } => before.as_ref(),
            Self::Delete { before } => Some(before),
        }
    }

    pub fn after(&self) -> Option<&RowImage> {
        match self {
            Self::Create { after } | Self::Update { after, .. } => Some(after),
            Self::Delete { .. } => None,
        }
    }
}
