//! Dispatcher: lifecycle state machine and the per-event loop.
//!
//! ```text
//! Bootstrapping ──► Ready ──► Consuming ──► ShuttingDown ──► Stopped
//!       │             │                          ▲
//!       └─────────────┴──── interrupt ───────────┘
//! ```
//!
//! Resources (stream and sink) are acquired once on the way into
//! `Consuming` and released exactly once on the way out: stream first,
//! then sink. An interrupt before they exist releases nothing.

use anyhow::Result;
use debezium_types::{decode, DecodeError, Decoded};
use futures::FutureExt;
use relay_core::{EventStream, RawMessage, TransientError};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use target_sink::TargetSink;
use tracing::{debug, error, info, warn};

use crate::apply::{ApplyEngine, ApplyOutcome};
use crate::failure::{FailureSink, LogFailures, RetryPolicy};
use crate::transform::plan_write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Waiting for the broker, the database, and Kafka Connect
    Bootstrapping,
    /// Dependencies are up; registering the connector and opening connections
    Ready,
    Consuming,
    ShuttingDown,
    Stopped,
}

/// The steps that bring the relay from nothing to open resources.
///
/// The production implementation probes real services; tests supply fakes.
#[async_trait::async_trait]
pub trait Bootstrap: Send {
    type Stream: EventStream;
    type Sink: TargetSink;

    /// Block until every dependency answers.
    async fn wait_ready(&mut self) -> Result<()>;

    /// Register the capture connector. Failures here are logged by the
    /// implementation and do not stop startup.
    async fn register(&mut self);

    /// Open the event stream and the target connection.
    async fn acquire(&mut self) -> Result<(Self::Stream, Self::Sink)>;
}

/// The open stream and the engine that owns the target sink.
pub struct RelayResources<E, S> {
    pub stream: E,
    pub engine: ApplyEngine<S>,
}

impl<E: EventStream, S: TargetSink> RelayResources<E, S> {
    /// Close the stream, then the sink. Both are attempted even if the
    /// first close fails; the first error is returned.
    pub async fn release(self) -> Result<()> {
        let stream_closed = self.stream.close().await;
        if let Err(e) = &stream_closed {
            warn!("Error closing event stream: {e:#}");
        } else {
            info!("Event stream closed");
        }

        let sink_closed = self.engine.into_sink().close().await;
        if let Err(e) = &sink_closed {
            warn!("Error closing target connection: {e:#}");
        } else {
            info!("Target connection closed");
        }

        stream_closed.and(sink_closed)
    }
}

/// What happened to one received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Empty payload (tombstone); nothing to do
    Tombstone,
    /// Payload could not be classified and was dropped
    Dropped(DecodeError),
    Applied(ApplyOutcome),
    /// Processing panicked; the event was abandoned
    Panicked,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub received: u64,
    pub upserted: u64,
    pub removed: u64,
    pub skipped: u64,
    pub dropped: u64,
    pub failed: u64,
    /// Transient receive errors that were waited out
    pub recv_errors: u64,
    /// The run ended because of an interrupt rather than end of stream
    pub interrupted: bool,
}

impl RunSummary {
    fn record(&mut self, outcome: &EventOutcome) {
        match outcome {
            EventOutcome::Tombstone => self.skipped += 1,
            EventOutcome::Dropped(_) => self.dropped += 1,
            EventOutcome::Applied(ApplyOutcome::Upserted(_)) => self.upserted += 1,
            EventOutcome::Applied(ApplyOutcome::Removed { .. }) => self.removed += 1,
            EventOutcome::Applied(ApplyOutcome::Skipped(_)) => self.skipped += 1,
            EventOutcome::Applied(ApplyOutcome::Failed(_)) | EventOutcome::Panicked => {
                self.failed += 1
            }
        }
    }
}

/// Drives the relay through its lifecycle.
pub struct Dispatcher {
    state: DispatcherState,
    retry: RetryPolicy,
    failures: Arc<dyn FailureSink>,
    progress_every: u64,
    recv_backoff: Duration,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            state: DispatcherState::Bootstrapping,
            retry: RetryPolicy::default(),
            failures: Arc::new(LogFailures),
            progress_every: 100,
            recv_backoff: Duration::from_secs(1),
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

    /// Pause after a transient receive error before asking the stream again.
    pub fn with_recv_backoff(mut self, backoff: Duration) -> Self {
        self.recv_backoff = backoff;
        self
    }

    fn transition(&mut self, to: DispatcherState) {
        debug!("Dispatcher state {:?} -> {to:?}", self.state);
        self.state = to;
    }

    /// Run the full lifecycle until the stream ends, `shutdown` resolves, or
    /// a fatal error occurs.
    ///
    /// Errors from readiness and acquisition are fatal, as are receive
    /// errors that do not carry a [`TransientError`]; they are returned after
    /// resources are released. Transient receive errors and errors inside a
    /// single event are logged and consumption continues.
    pub async fn run<B, F>(mut self, mut bootstrap: B, shutdown: F) -> Result<RunSummary>
    where
        B: Bootstrap,
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        self.transition(DispatcherState::Bootstrapping);
        info!("Waiting for services to be ready...");
        tokio::select! {
            ready = bootstrap.wait_ready() => ready?,
            _ = &mut shutdown => return Ok(self.interrupted_early()),
        }

        self.transition(DispatcherState::Ready);
        let acquired = tokio::select! {
            acquired = async {
                bootstrap.register().await;
                bootstrap.acquire().await
            } => acquired?,
            _ = &mut shutdown => return Ok(self.interrupted_early()),
        };

        let (stream, sink) = acquired;
        let mut resources = RelayResources {
            stream,
            engine: ApplyEngine::new(sink)
                .with_retry(self.retry)
                .with_failure_sink(Arc::clone(&self.failures)),
        };

        self.transition(DispatcherState::Consuming);
        info!("Starting CDC consumer...");
        let mut summary = RunSummary::default();
        let consumed = self
            .consume(&mut resources, &mut summary, shutdown.as_mut())
            .await;

        self.transition(DispatcherState::ShuttingDown);
        info!("Shutting down...");
        let released = resources.release().await;

        self.transition(DispatcherState::Stopped);
        info!(
            "Relay stopped: {} received, {} upserted, {} removed, {} skipped, {} dropped, {} failed, {} receive errors",
            summary.received,
            summary.upserted,
            summary.removed,
            summary.skipped,
            summary.dropped,
            summary.failed,
            summary.recv_errors
        );

        consumed?;
        released?;
        Ok(summary)
    }

    fn interrupted_early(&mut self) -> RunSummary {
        info!("Interrupted before consuming started");
        self.transition(DispatcherState::ShuttingDown);
        self.transition(DispatcherState::Stopped);
        RunSummary {
            interrupted: true,
            ..RunSummary::default()
        }
    }

    async fn consume<E, S, F>(
        &self,
        resources: &mut RelayResources<E, S>,
        summary: &mut RunSummary,
        mut shutdown: std::pin::Pin<&mut F>,
    ) -> Result<()>
    where
        E: EventStream,
        S: TargetSink,
        F: Future<Output = ()> + Send,
    {
        loop {
            // Only waiting for the next message is interruptible; an event
            // already received is applied and committed first.
            let message = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Interrupt received");
                    summary.interrupted = true;
                    return Ok(());
                }
                received = resources.stream.recv() => match received {
                    Ok(Some(message)) => message,
                    Ok(None) => {
                        info!("Event stream ended");
                        return Ok(());
                    }
                    Err(e) if e.downcast_ref::<TransientError>().is_some() => {
                        warn!(
                            "Transient error receiving from event stream, retrying in {:?}: {e:#}",
                            self.recv_backoff
                        );
                        summary.recv_errors += 1;
                        tokio::select! {
                            biased;
                            _ = &mut shutdown => {
                                info!("Interrupt received");
                                summary.interrupted = true;
                                return Ok(());
                            }
                            _ = tokio::time::sleep(self.recv_backoff) => continue,
                        }
                    }
                    Err(e) => {
                        error!("Error receiving from event stream: {e:#}");
                        return Err(e);
                    }
                },
            };

            summary.received += 1;
            let outcome = self.handle(&message, &resources.engine).await;
            summary.record(&outcome);

            if let Err(e) = resources.stream.commit(&message).await {
                warn!(
                    "Failed to commit offset {} on {}[{}]: {e:#}",
                    message.offset, message.topic, message.partition
                );
            }

            if summary.received % self.progress_every == 0 {
                info!("Processed {} messages", summary.received);
            }
        }
    }

    /// Decode, transform, and apply one message. Never fails: every error
    /// and panic is contained here.
    pub async fn handle<S: TargetSink>(
        &self,
        message: &RawMessage,
        engine: &ApplyEngine<S>,
    ) -> EventOutcome {
        let processed = AssertUnwindSafe(Self::process(message, engine))
            .catch_unwind()
            .await;

        processed.unwrap_or_else(|_| {
            error!(
                "Panic while processing {}[{}]@{}; event abandoned",
                message.topic, message.partition, message.offset
            );
            EventOutcome::Panicked
        })
    }

    async fn process<S: TargetSink>(message: &RawMessage, engine: &ApplyEngine<S>) -> EventOutcome {
        match decode(message.payload.as_deref()) {
            Decoded::Empty => {
                debug!(
                    "Skipping empty message at {}[{}]@{}",
                    message.topic, message.partition, message.offset
                );
                EventOutcome::Tombstone
            }
            Decoded::Unknown(reason) => {
                warn!(
                    "Dropping unrecognised event at {}[{}]@{}: {reason}",
                    message.topic, message.partition, message.offset
                );
                EventOutcome::Dropped(reason)
            }
            Decoded::Change(event) => {
                info!(
                    "Received CDC event {} at {}[{}]@{}",
                    event.op(),
                    message.topic,
                    message.partition,
                    message.offset
                );
                let write = plan_write(&event);
                EventOutcome::Applied(engine.apply(event.op(), write).await)
            }
        }
    }
}
