//! Upsert/delete against the target table.

use anyhow::{Context, Result};
use relay_core::{RecordKey, TransformedRow};
use target_sink::TargetSink;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Statement};
use tracing::{debug, info};

use crate::connect::PgConfig;
use crate::ddl::{create_table_sql, validate_identifier};

/// Insert-or-replace keyed by `id`, stamping `processed_at` with the
/// database clock on both paths.
pub fn upsert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table} (id, name, email, age, processed_at)
VALUES ($1::bigint, $2::text, $3::text, $4::bigint, NOW())
ON CONFLICT (id) DO UPDATE SET
    name = EXCLUDED.name,
    email = EXCLUDED.email,
    age = EXCLUDED.age,
    processed_at = NOW()"
    )
}

pub fn delete_sql(table: &str) -> String {
    format!("DELETE FROM {table} WHERE id = $1::bigint")
}

/// [`TargetSink`] writing to a PostgreSQL table over one autocommit connection.
pub struct PostgresSink {
    client: Client,
    connection: JoinHandle<()>,
    table: String,
    upsert: Statement,
    delete: Statement,
}

impl PostgresSink {
    /// Connect and prepare the upsert/delete statements for `table`.
    ///
    /// With `create_table` set, the table is created first if it does not exist.
    pub async fn connect(config: &PgConfig, table: &str, create_table: bool) -> Result<Self> {
        validate_identifier(table)?;

        let (client, connection) = config.connect().await?;
        info!("Connected to PostgreSQL at {config}");

        if create_table {
            client
                .batch_execute(&create_table_sql(table))
                .await
                .with_context(|| format!("Failed to create target table '{table}'"))?;
            info!("Ensured target table '{table}' exists");
        }

        let upsert = client
            .prepare(&upsert_sql(table))
            .await
            .with_context(|| format!("Failed to prepare upsert for '{table}'"))?;
        let delete = client
            .prepare(&delete_sql(table))
            .await
            .with_context(|| format!("Failed to prepare delete for '{table}'"))?;

        Ok(Self {
            client,
            connection,
            table: table.to_string(),
            upsert,
            delete,
        })
    }
}

/// Bind a key as the `bigint` parameter. A missing key binds NULL and is
/// rejected by the primary-key constraint.
fn key_param(key: Option<&RecordKey>) -> Result<Option<i64>> {
    match key {
        None => Ok(None),
        Some(key) => key
            .as_i64()
            .map(Some)
            .ok_or_else(|| anyhow::anyhow!("Key '{key}' is not an integer")),
    }
}

#[async_trait::async_trait]
impl TargetSink for PostgresSink {
    async fn upsert(&self, row: &TransformedRow) -> Result<()> {
        let id = key_param(row.id.as_ref())?;
        self.client
            .execute(&self.upsert, &[&id, &row.name, &row.email, &row.age])
            .await
            .with_context(|| format!("Failed to upsert into {}", self.table))?;
        Ok(())
    }

    async fn remove(&self, key: &RecordKey) -> Result<bool> {
        let id = key_param(Some(key))?;
        let affected = self
            .client
            .execute(&self.delete, &[&id])
            .await
            .with_context(|| format!("Failed to delete from {}", self.table))?;
        Ok(affected > 0)
    }

    async fn close(self) -> Result<()> {
        let Self {
            client, connection, ..
        } = self;
        drop(client);
        connection
            .await
            .context("PostgreSQL connection task panicked")?;
        debug!("PostgreSQL connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_sql_is_single_conditional_write() {
        let sql = upsert_sql("tableb");
        assert!(sql.starts_with("INSERT INTO tableb (id, name, email, age, processed_at)"));
        assert!(sql.contains("ON CONFLICT (id) DO UPDATE SET"));
        assert!(sql.contains("age = EXCLUDED.age"));
        assert_eq!(sql.matches("NOW()").count(), 2);
    }

    #[test]
    fn test_delete_sql() {
        assert_eq!(
            delete_sql("public.tableb"),
            "DELETE FROM public.tableb WHERE id = $1::bigint"
        );
    }

    #[test]
    fn test_key_param() {
        assert_eq!(key_param(None).unwrap(), None);
        assert_eq!(key_param(Some(&RecordKey::Int(7))).unwrap(), Some(7));
        assert_eq!(
            key_param(Some(&RecordKey::Text("8".to_string()))).unwrap(),
            Some(8)
        );
        assert!(key_param(Some(&RecordKey::Text("abc".to_string()))).is_err());
    }
}
