//! Apply engine: the only writer to the target store.

use relay_core::{ChangeOp, RecordKey, TransformedRow};
use std::sync::Arc;
use target_sink::TargetSink;
use tracing::{info, warn};

use crate::failure::{ApplyFailure, FailureSink, LogFailures, RetryPolicy};
use crate::transform::TargetWrite;

/// Result of applying one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Upserted(TransformedRow),
    /// `existed` is false when no record had that key
    Removed { key: RecordKey, existed: bool },
    /// Nothing was written, e.g. a delete whose before-image had no id
    Skipped(String),
    /// Every attempt failed; the failure has been handed to the failure sink
    Failed(ApplyFailure),
}

/// Owns the target sink and applies planned writes to it.
///
/// Each write is a single atomic call on the sink. A failed write is retried
/// per the [`RetryPolicy`] and then given to the [`FailureSink`]; it never
/// propagates as an error.
pub struct ApplyEngine<S> {
    sink: S,
    retry: RetryPolicy,
    failures: Arc<dyn FailureSink>,
}

impl<S: TargetSink> ApplyEngine<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            retry: RetryPolicy::default(),
            failures: Arc::new(LogFailures),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_failure_sink(mut self, failures: Arc<dyn FailureSink>) -> Self {
        self.failures = failures;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Give the sink back, e.g. to close it.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Apply one planned write.
    pub async fn apply(&self, op: ChangeOp, write: TargetWrite) -> ApplyOutcome {
        match write {
            TargetWrite::Upsert(row) => self.upsert(op, row).await,
            TargetWrite::Remove(Some(key)) => self.remove(op, key).await,
            TargetWrite::Remove(None) => {
                warn!("Delete event without an id in its before-image; nothing to remove");
                ApplyOutcome::Skipped("delete without id".to_string())
            }
        }
    }

    async fn upsert(&self, op: ChangeOp, row: TransformedRow) -> ApplyOutcome {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.sink.upsert(&row).await {
                Ok(()) => {
                    info!("Upserted record into target: {row}");
                    return ApplyOutcome::Upserted(row);
                }
                Err(e) if attempt < self.retry.max_attempts => {
                    warn!("Upsert attempt {attempt} failed, retrying: {e:#}");
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => return self.give_up(op, row.id.clone(), attempt, e),
            }
        }
    }

    async fn remove(&self, op: ChangeOp, key: RecordKey) -> ApplyOutcome {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.sink.remove(&key).await {
                Ok(existed) => {
                    info!("Deleted record with id: {key}");
                    return ApplyOutcome::Removed { key, existed };
                }
                Err(e) if attempt < self.retry.max_attempts => {
                    warn!("Delete attempt {attempt} failed, retrying: {e:#}");
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => return self.give_up(op, Some(key), attempt, e),
            }
        }
    }

    fn give_up(
        &self,
        op: ChangeOp,
        key: Option<RecordKey>,
        attempts: u32,
        error: anyhow::Error,
    ) -> ApplyOutcome {
        let failure = ApplyFailure {
            op,
            key,
            attempts,
            error: format!("{error:#}"),
        };
        self.failures.on_failure(&failure);
        ApplyOutcome::Failed(failure)
    }
}
