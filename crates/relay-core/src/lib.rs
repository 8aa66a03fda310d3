//! Core types for cdc-relay.
//!
//! This crate provides the types shared by every stage of the relay:
//!
//! - [`ColumnValue`] - A single captured column value
//! - [`RowImage`] - An immutable, ordered row snapshot taken at source commit time
//! - [`ChangeEvent`] - A decoded create/update/delete with the images it requires
//! - [`TransformedRow`] / [`TargetRecord`] - The derived row before and after it is written
//! - [`EventStream`] - The seam between the dispatcher and the message transport
//!
//! # Architecture
//!
//! ```text
//! relay-core (this crate)
//!    │
//!    ├─── debezium-types   (raw bytes → ChangeEvent)
//!    ├─── target-sink      (TransformedRow → TargetRecord)
//!    ├─── kafka-source     (implements EventStream over rdkafka)
//!    └─── relay-sync       (transform, apply, dispatch)
//! ```

pub mod event;
pub mod row;
pub mod stream;
pub mod value;

pub use event::{ChangeEvent, ChangeOp};
pub use row::{RecordKey, RowImage, TargetRecord, TransformedRow};
pub use stream::{EventStream, MemoryStream, RawMessage, StreamLog, TransientError};
pub use value::ColumnValue;
