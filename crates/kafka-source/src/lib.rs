//! Kafka consumer for cdc-relay.
//!
//! Reads the Debezium change topic one message at a time, in offset order,
//! from a single member of a fixed consumer group. Offsets are committed
//! manually after each message has been applied, so a restart resumes from
//! the last processed message instead of replaying the topic.

/// Stream consumer implementing [`relay_core::EventStream`]
///
/// Created from a [`ConsumerConfig`]; subscribes to exactly one topic.
pub mod consumer;
pub mod error;

/// Broker reachability probe used by the readiness gate
pub mod probe;

pub use consumer::{ConsumerConfig, KafkaStream};
pub use error::{Error, Result};
pub use probe::check_broker;
