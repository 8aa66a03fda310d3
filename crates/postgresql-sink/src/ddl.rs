//! Target table DDL.

use anyhow::{bail, Result};

/// Check that `name` is a plain, unquoted SQL identifier, optionally
/// schema-qualified (`schema.table`).
///
/// Table names are interpolated into statements, so anything else is rejected.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("Identifier must not be empty");
    }
    for part in name.split('.') {
        let mut chars = part.chars();
        let valid_start = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            bail!("Invalid SQL identifier: '{name}'");
        }
    }
    if name.split('.').count() > 2 {
        bail!("Invalid SQL identifier: '{name}' (at most schema.table)");
    }
    Ok(())
}

/// `CREATE TABLE IF NOT EXISTS` for the derived table.
pub fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
    id INTEGER PRIMARY KEY,
    name VARCHAR(255),
    email VARCHAR(255),
    age INTEGER,
    processed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)"
    )
}
