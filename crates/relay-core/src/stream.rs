//! The seam between the dispatcher and the message transport.

use anyhow::Result;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A message as delivered by the transport, before decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    /// Topic the message was read from
    pub topic: String,
    /// Partition number
    pub partition: i32,
    /// Offset within the partition
    pub offset: i64,
    /// Message key (if any)
    pub key: Option<Vec<u8>>,
    /// Message value; `None` for tombstones
    pub payload: Option<Vec<u8>>,
    /// Message timestamp in milliseconds since epoch (if available)
    pub timestamp: Option<i64>,
}

impl RawMessage {
    /// Build a message carrying `payload` at the given position.
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, payload: Option<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload,
            timestamp: None,
        }
    }
}

/// A receive failure the transport expects to clear without intervention,
/// such as a topic that does not exist yet or a dropped broker connection.
///
/// [`EventStream::recv`] wraps it in its `anyhow::Error`; any other error
/// from `recv` is fatal to the consumer.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransientError(pub String);

/// An ordered stream of raw change messages.
///
/// The dispatcher pulls one message at a time, processes it, then commits
/// its position. Implementations must deliver messages of a partition in
/// offset order.
#[async_trait::async_trait]
pub trait EventStream: Send {
    /// Receive the next message.
    ///
    /// Blocks until a message is available. `Ok(None)` means the stream has
    /// ended and no further messages will arrive. An error carrying a
    /// [`TransientError`] may be followed by further messages.
    async fn recv(&mut self) -> Result<Option<RawMessage>>;

    /// Record that `message` has been processed.
    async fn commit(&mut self, message: &RawMessage) -> Result<()>;

    /// Release the underlying connection.
    async fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// What happened to a [`MemoryStream`], readable after the stream is closed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StreamLog {
    /// `(partition, offset)` of every committed message, in commit order
    pub committed: Vec<(i32, i64)>,
    pub closed: bool,
}

/// An in-memory [`EventStream`] that yields a fixed list of messages and then ends.
pub struct MemoryStream {
    messages: VecDeque<RawMessage>,
    log: Arc<Mutex<StreamLog>>,
}

impl MemoryStream {
    pub fn new(messages: impl IntoIterator<Item = RawMessage>) -> Self {
        Self {
            messages: messages.into_iter().collect(),
            log: Arc::new(Mutex::new(StreamLog::default())),
        }
    }

    /// Build a stream from payloads on a single partition, offsets starting at 0.
    pub fn from_payloads<I>(topic: &str, payloads: I) -> Self
    where
        I: IntoIterator<Item = Option<Vec<u8>>>,
    {
        Self::new(
            payloads
                .into_iter()
                .enumerate()
                .map(|(offset, payload)| RawMessage::new(topic, 0, offset as i64, payload)),
        )
    }

    /// Shared handle to the stream's log.
    pub fn log(&self) -> Arc<Mutex<StreamLog>> {
        Arc::clone(&self.log)
    }

    fn with_log<T>(&self, f: impl FnOnce(&mut StreamLog) -> T) -> Result<T> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| anyhow::anyhow!("memory stream log poisoned"))?;
        Ok(f(&mut log))
    }
}

#[async_trait::async_trait]
impl EventStream for MemoryStream {
    async fn recv(&mut self) -> Result<Option<RawMessage>> {
        Ok(self.messages.pop_front())
    }

    async fn commit(&mut self, message: &RawMessage) -> Result<()> {
        self.with_log(|log| log.committed.push((message.partition, message.offset)))
    }

    async fn close(self) -> Result<()> {
        self.with_log(|log| log.closed = true)
    }
}
