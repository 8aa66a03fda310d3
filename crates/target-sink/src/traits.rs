//! TargetSink trait definition.

use anyhow::Result;
use relay_core::{RecordKey, TransformedRow};

/// Trait for writing derived rows to the target store.
///
/// # Usage Pattern
///
/// Callers use generics for static dispatch:
///
/// ```ignore
/// pub async fn apply<S: TargetSink>(sink: &S, row: &TransformedRow) -> Result<()> {
///     sink.upsert(row).await
/// }
/// ```
///
/// The CLI entry point branches once (PostgreSQL or dry-run), and after that
/// all code is monomorphized for the chosen sink.
#[async_trait::async_trait]
pub trait TargetSink: Send + Sync {
    /// Insert the row, or overwrite every non-key column if a record with the
    /// same key exists.
    ///
    /// This must be a single atomic conditional write, never a read followed
    /// by a write. The store stamps `processed_at` at write time. A row
    /// without a key fails the way the store's primary-key constraint does.
    async fn upsert(&self, row: &TransformedRow) -> Result<()>;

    /// Delete the record with `key`.
    ///
    /// Returns whether a record was removed. Removing an absent key is not
    /// an error.
    async fn remove(&self, key: &RecordKey) -> Result<bool>;

    /// Release the connection to the store.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}
