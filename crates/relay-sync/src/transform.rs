//! Row transformer.
//!
//! The rule set is a fixed contract and must stay byte-for-byte reproducible:
//!
//! | target  | rule                                         |
//! |---------|----------------------------------------------|
//! | `id`    | source `id`, unchanged                       |
//! | `name`  | `PROCESSED_` + uppercase(source `name` or "")|
//! | `email` | source `email`, unchanged                    |
//! | `age`   | (source `age` or 0) + 1                      |
//!
//! `processed_at` is not computed here; the store stamps it at write time.

use relay_core::{ChangeEvent, ColumnValue, RecordKey, RowImage, TransformedRow};

pub const NAME_PREFIX: &str = "PROCESSED_";

/// Map a source row image to the target row. Pure and total: a missing or
/// NULL column falls back to its default, never to an error.
pub fn transform(row: &RowImage) -> TransformedRow {
    let id = row.present("id").and_then(RecordKey::from_value);

    let name = row
        .present("name")
        .and_then(ColumnValue::to_text)
        .unwrap_or_default();

    let email = row.present("email").and_then(ColumnValue::to_text);

    // Non-numeric ages count as absent.
    let age = row
        .present("age")
        .and_then(ColumnValue::as_i64)
        .unwrap_or(0)
        .saturating_add(1);

    TransformedRow {
        id,
        name: format!("{NAME_PREFIX}{}", name.to_uppercase()),
        email,
        age,
    }
}

/// The write a change event turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetWrite {
    Upsert(TransformedRow),
    /// `None` when the before-image carried no id
    Remove(Option<RecordKey>),
}

/// Plan the target write for an event.
///
/// Create and Update both upsert the transformed after-image; the
/// before-image of an update is not consulted. Delete removes by the
/// before-image's id.
pub fn plan_write(event: &ChangeEvent) -> TargetWrite {
    match event {
        ChangeEvent::Create { after } | ChangeEvent::Update { after, .. } => {
            TargetWrite::Upsert(transform(after))
        }
        ChangeEvent::Delete { before } => {
            TargetWrite::Remove(before.present("id").and_then(RecordKey::from_value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(columns: &[(&str, ColumnValue)]) -> RowImage {
        RowImage::from_columns(columns.iter().cloned())
    }

    #[test]
    fn test_transform_full_row() {
        let source = row(&[
            ("id", ColumnValue::Int(1)),
            ("name", "alice".into()),
            ("email", "a@x.com".into()),
            ("age", ColumnValue::Int(30)),
        ]);

        assert_eq!(
            transform(&source),
            TransformedRow {
                id: Some(RecordKey::Int(1)),
                name: "PROCESSED_ALICE".to_string(),
                email: Some("a@x.com".to_string()),
                age: 31,
            }
        );
    }

    #[test]
    fn test_transform_defaults_for_missing_columns() {
        let transformed = transform(&RowImage::default());
        assert_eq!(transformed.id, None);
        assert_eq!(transformed.name, "PROCESSED_");
        assert_eq!(transformed.email, None);
        assert_eq!(transformed.age, 1);
    }

    #[test]
    fn test_transform_null_columns_count_as_absent() {
        let source = row(&[
            ("id", ColumnValue::Int(2)),
            ("name", ColumnValue::Null),
            ("email", ColumnValue::Null),
            ("age", ColumnValue::Null),
        ]);
        let transformed = transform(&source);
        assert_eq!(transformed.name, "PROCESSED_");
        assert_eq!(transformed.email, None);
        assert_eq!(transformed.age, 1);
    }

    #[test]
    fn test_transform_name_rule_holds_for_varied_names() {
        for name in ["", "bob", "Mixed Case", "o'brien", "straße", "日本", "ALREADY"] {
            let source = row(&[("name", name.into())]);
            assert_eq!(
                transform(&source).name,
                format!("PROCESSED_{}", name.to_uppercase())
            );
        }
    }

    #[test]
    fn test_transform_age_rule_holds_for_varied_ages() {
        for age in [-5i64, 0, 1, 30, 120, i64::MAX - 1] {
            let source = row(&[("age", ColumnValue::Int(age))]);
            assert_eq!(transform(&source).age, age + 1);
        }
        let source = row(&[("age", ColumnValue::Int(i64::MAX))]);
        assert_eq!(transform(&source).age, i64::MAX);
    }

    #[test]
    fn test_transform_non_numeric_age_defaults() {
        let source = row(&[("age", "thirty".into())]);
        assert_eq!(transform(&source).age, 1);
    }

    #[test]
    fn test_transform_ignores_extra_columns() {
        let source = row(&[
            ("id", ColumnValue::Int(3)),
            ("created_at", ColumnValue::Int(1_700_000_000)),
        ]);
        let transformed = transform(&source);
        assert_eq!(transformed.id, Some(RecordKey::Int(3)));
        assert_eq!(transformed.age, 1);
    }

    #[test]
    fn test_plan_write_update_uses_after_image_only() {
        let event = ChangeEvent::Update {
            before: Some(row(&[("id", ColumnValue::Int(1)), ("age", ColumnValue::Int(5))])),
            after: row(&[("id", ColumnValue::Int(1)), ("age", ColumnValue::Int(10))]),
        };
        match plan_write(&event) {
            TargetWrite::Upsert(transformed) => assert_eq!(transformed.age, 11),
            other => panic!("expected upsert, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_write_delete_uses_before_id() {
        let event = ChangeEvent::Delete {
            before: row(&[("id", ColumnValue::Int(9))]),
        };
        assert_eq!(
            plan_write(&event),
            TargetWrite::Remove(Some(RecordKey::Int(9)))
        );

        let event = ChangeEvent::Delete {
            before: RowImage::default(),
        };
        assert_eq!(plan_write(&event), TargetWrite::Remove(None));
    }
}
