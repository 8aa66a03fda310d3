//! Row representations.
//!
//! A [`RowImage`] is what the source captured; a [`TransformedRow`] is what the
//! relay computed from it; a [`TargetRecord`] is what the target store holds
//! once the row has been written.

use crate::value::ColumnValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered mapping from column name to value, as captured at source commit time.
///
/// Row images are immutable once constructed. Column order follows the
/// order in which the columns appeared in the captured payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowImage {
    columns: Vec<(String, ColumnValue)>,
}

impl RowImage {
    /// Build a row image from `(column, value)` pairs.
    ///
    /// If a column name repeats, the last occurrence wins, matching how a
    /// JSON object with duplicate keys is read.
    pub fn from_columns<I, K, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ColumnValue>,
    {
        let mut out: Vec<(String, ColumnValue)> = Vec::new();
        for (name, value) in columns {
            let name = name.into();
            let value = value.into();
            match out.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = value,
                None => out.push((name, value)),
            }
        }
        Self { columns: out }
    }

    /// Get the raw value of a column. A column captured as NULL returns
    /// `Some(ColumnValue::Null)`; a column that was not captured returns `None`.
    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Get a column value, treating NULL the same as absent.
    pub fn present(&self, column: &str) -> Option<&ColumnValue> {
        self.get(column).filter(|value| !value.is_null())
    }

    /// Iterate over the columns in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for RowImage {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self::from_columns(map)
    }
}

/// Primary key of a target record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Int(i64),
    Text(String),
}

impl RecordKey {
    /// Derive a key from a captured value. NULL has no key.
    pub fn from_value(value: &ColumnValue) -> Option<Self> {
        match value {
            ColumnValue::Null => None,
            ColumnValue::Int(i) => Some(Self::Int(*i)),
            ColumnValue::Text(s) => Some(Self::Text(s.clone())),
            other => match other.as_i64() {
                Some(i) => Some(Self::Int(i)),
                None => Some(Self::Text(other.to_string())),
            },
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Text(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Output of the row transformer: only target-table columns, fully computed.
///
/// Carries no `processed_at`; the store assigns it when the row is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformedRow {
    /// Primary key, `None` when the source row carried no usable id
    pub id: Option<RecordKey>,
    pub name: String,
    pub email: Option<String>,
    pub age: i64,
}

impl fmt::Display for TransformedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self
            .id
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "NULL".to_string());
        let email = self.email.as_deref().unwrap_or("NULL");
        write!(
            f,
            "{{id: {id}, name: {}, email: {email}, age: {}}}",
            self.name, self.age
        )
    }
}

/// A record as held by the target store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: RecordKey,
    pub name: String,
    pub email: Option<String>,
    pub age: i64,
    /// Write-time timestamp assigned by the store
    pub processed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_image_preserves_capture_order() {
        let row = RowImage::from_columns([("id", 1i64), ("age", 30i64)]);
        let names: Vec<&str> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["id", "age"]);
    }

    #[test]
    fn test_row_image_duplicate_column_last_wins() {
        let row = RowImage::from_columns([("age", 1i64), ("age", 2i64)]);
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("age"), Some(&ColumnValue::Int(2)));
    }

    #[test]
    fn test_get_vs_present() {
        let json = json!({"id": 1, "email": null});
        let row = RowImage::from(json.as_object().unwrap().clone());

        assert_eq!(row.get("email"), Some(&ColumnValue::Null));
        assert_eq!(row.present("email"), None);
        assert_eq!(row.get("name"), None);
        assert_eq!(row.present("id"), Some(&ColumnValue::Int(1)));
    }

    #[test]
    fn test_record_key_from_value() {
        assert_eq!(
            RecordKey::from_value(&ColumnValue::Int(5)),
            Some(RecordKey::Int(5))
        );
        assert_eq!(
            RecordKey::from_value(&ColumnValue::Text("k1".to_string())),
            Some(RecordKey::Text("k1".to_string()))
        );
        assert_eq!(
            RecordKey::from_value(&ColumnValue::Float(3.0)),
            Some(RecordKey::Int(3))
        );
        assert_eq!(RecordKey::from_value(&ColumnValue::Null), None);
    }

    #[test]
    fn test_transformed_row_display() {
        let row = TransformedRow {
            id: Some(RecordKey::Int(1)),
            name: "PROCESSED_ALICE".to_string(),
            email: None,
            age: 31,
        };
        assert_eq!(
            row.to_string(),
            "{id: 1, name: PROCESSED_ALICE, email: NULL, age: 31}"
        );
    }
}
