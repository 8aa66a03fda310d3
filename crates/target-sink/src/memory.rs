//! In-memory target store.

use anyhow::Result;
use chrono::Utc;
use relay_core::{RecordKey, TargetRecord, TransformedRow};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::traits::TargetSink;

/// A [`TargetSink`] backed by an in-memory map.
///
/// Used by `--dry-run` and by tests. Clones share the same records, so a
/// test can keep a handle while the dispatcher owns the sink.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<BTreeMap<RecordKey, TargetRecord>>>,
    closed: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record by key.
    pub fn get(&self, key: &RecordKey) -> Option<TargetRecord> {
        self.lock().ok().and_then(|records| records.get(key).cloned())
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all records, ordered by key.
    pub fn records(&self) -> Vec<TargetRecord> {
        self.lock()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.lock().map(|closed| *closed).unwrap_or(false)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<RecordKey, TargetRecord>>> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink poisoned"))
    }
}

#[async_trait::async_trait]
impl TargetSink for MemorySink {
    async fn upsert(&self, row: &TransformedRow) -> Result<()> {
        let key = row.id.clone().ok_or_else(|| {
            anyhow::anyhow!("null value in column \"id\" violates not-null constraint")
        })?;

        let record = TargetRecord {
            id: key.clone(),
            name: row.name.clone(),
            email: row.email.clone(),
            age: row.age,
            processed_at: Utc::now(),
        };

        debug!("memory sink upsert: {record:?}");
        self.lock()?.insert(key, record);
        Ok(())
    }

    async fn remove(&self, key: &RecordKey) -> Result<bool> {
        let removed = self.lock()?.remove(key).is_some();
        debug!("memory sink remove {key}: removed={removed}");
        Ok(removed)
    }

    async fn close(self) -> Result<()> {
        let mut closed = self
            .closed
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink poisoned"))?;
        *closed = true;
        Ok(())
    }
}
