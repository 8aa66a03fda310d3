//! Column value representation.
//!
//! Change-capture payloads arrive as JSON, so a captured value is one of the
//! JSON scalars or a nested document kept as-is.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single column value as captured at the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    /// SQL NULL
    Null,

    /// Boolean value
    Bool(bool),

    /// Integer value that fits in an i64
    Int(i64),

    /// Any other JSON number
    Float(f64),

    /// String value
    Text(String),

    /// Arrays and objects (json/jsonb columns, composite types)
    Json(serde_json::Value),
}

impl ColumnValue {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get this value as an i64.
    ///
    /// Integral floats and numeric text are accepted, since Debezium emits
    /// `NUMERIC` columns as strings unless `decimal.handling.mode=double`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render this value as text, or `None` for null.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<serde_json::Value> for ColumnValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            serde_json::Value::String(s) => Self::Text(s),
            other @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Self::Json(other)
            }
        }
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(ColumnValue::from(json!(null)), ColumnValue::Null);
        assert_eq!(ColumnValue::from(json!(true)), ColumnValue::Bool(true));
        assert_eq!(ColumnValue::from(json!(42)), ColumnValue::Int(42));
        assert_eq!(ColumnValue::from(json!(1.5)), ColumnValue::Float(1.5));
        assert_eq!(
            ColumnValue::from(json!("alice")),
            ColumnValue::Text("alice".to_string())
        );
    }

    #[test]
    fn test_from_json_nested_kept_as_json() {
        let value = ColumnValue::from(json!({"street": "main"}));
        assert_eq!(value, ColumnValue::Json(json!({"street": "main"})));
    }

    #[test]
    fn test_as_i64_coercions() {
        assert_eq!(ColumnValue::Int(7).as_i64(), Some(7));
        assert_eq!(ColumnValue::Float(7.0).as_i64(), Some(7));
        assert_eq!(ColumnValue::Float(7.5).as_i64(), None);
        assert_eq!(ColumnValue::Text(" 12 ".to_string()).as_i64(), Some(12));
        assert_eq!(ColumnValue::Text("twelve".to_string()).as_i64(), None);
        assert_eq!(ColumnValue::Null.as_i64(), None);
    }

    #[test]
    fn test_to_text() {
        assert_eq!(ColumnValue::Null.to_text(), None);
        assert_eq!(ColumnValue::Int(3).to_text().as_deref(), Some("3"));
        assert_eq!(
            ColumnValue::Text("a@x.com".to_string()).to_text().as_deref(),
            Some("a@x.com")
        );
    }
}
