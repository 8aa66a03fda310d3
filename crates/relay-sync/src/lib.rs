//! Transform-and-apply pipeline for cdc-relay.
//!
//! ```text
//! EventStream ──► decode ──► transform ──► ApplyEngine ──► TargetSink
//!      ▲                                                      │
//!      └────────────────── commit offset ◄────────────────────┘
//! ```
//!
//! - [`transform`] - The fixed row rule set and event → write planning
//! - [`apply`] - Upsert/remove with a configurable failure policy
//! - [`failure`] - Retry policy and the failure sink seam
//! - [`dispatch`] - The dispatcher state machine and the per-event loop
//!
//! Everything runs on one task: one message is fully applied and committed
//! before the next is received, which keeps last-write-wins per key
//! deterministic relative to stream order.

pub mod apply;
pub mod dispatch;
pub mod failure;
pub mod transform;

pub use apply::{ApplyEngine, ApplyOutcome};
pub use dispatch::{
    Bootstrap, Dispatcher, DispatcherState, EventOutcome, RelayResources, RunSummary,
};
pub use failure::{ApplyFailure, FailureSink, LogFailures, RetryPolicy};
pub use transform::{plan_write, transform, TargetWrite, NAME_PREFIX};
