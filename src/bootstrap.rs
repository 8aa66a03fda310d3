//! Readiness gate and resource acquisition for the relay.

use anyhow::Context;
use connect_client::{ConnectClient, ConnectorRequest};
use kafka_source::{check_broker, ConsumerConfig, KafkaStream};
use postgresql_sink::{check_connection, PgConfig, PostgresSink};
use relay_sync::Bootstrap;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use target_sink::{MemorySink, TargetSink};
use tracing::{error, info, warn};

/// Upper bound on a single broker metadata probe.
const BROKER_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Call `probe` until it succeeds, sleeping `delay` after each failure.
///
/// Polls forever; only an interrupt or a successful probe ends the wait.
/// Returns the number of attempts made.
pub async fn wait_until_ready<F, Fut, E>(service: &str, delay: Duration, mut probe: F) -> u32
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match probe().await {
            Ok(()) => {
                info!("{service} is ready");
                return attempts;
            }
            Err(e) => {
                info!("Waiting for {service}: {e:#}");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Where transformed rows are written.
#[async_trait::async_trait]
pub trait OpenTarget: Send + Sync {
    type Sink: TargetSink;

    /// Name used in readiness logs
    fn service(&self) -> &'static str;

    /// Cheap reachability check.
    async fn check(&self) -> anyhow::Result<()>;

    async fn open(&mut self) -> anyhow::Result<Self::Sink>;
}

pub struct PostgresTarget {
    pub config: PgConfig,
    pub table: String,
    pub create_table: bool,
}

#[async_trait::async_trait]
impl OpenTarget for PostgresTarget {
    type Sink = PostgresSink;

    fn service(&self) -> &'static str {
        "PostgreSQL"
    }

    async fn check(&self) -> anyhow::Result<()> {
        check_connection(&self.config).await
    }

    async fn open(&mut self) -> anyhow::Result<PostgresSink> {
        PostgresSink::connect(&self.config, &self.table, self.create_table)
            .await
            .context("Failed to open target connection")
    }
}

/// In-memory target for `--dry-run`. The handle kept by the caller sees
/// every write.
pub struct DryRunTarget {
    pub sink: MemorySink,
}

#[async_trait::async_trait]
impl OpenTarget for DryRunTarget {
    type Sink = MemorySink;

    fn service(&self) -> &'static str {
        "in-memory target"
    }

    async fn check(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn open(&mut self) -> anyhow::Result<MemorySink> {
        Ok(self.sink.clone())
    }
}

/// Wait for the broker, the target, and Kafka Connect, in that order.
pub async fn wait_for_services<T: OpenTarget>(
    brokers: &str,
    target: &T,
    connect: &ConnectClient,
    delay: Duration,
) {
    wait_until_ready("Kafka", delay, || check_broker(brokers, BROKER_PROBE_TIMEOUT)).await;
    wait_until_ready(target.service(), delay, || target.check()).await;
    wait_until_ready("Kafka Connect", delay, || connect.check_ready()).await;
}

/// Production [`Bootstrap`]: real services, Kafka stream, target chosen by `T`.
pub struct ServiceBootstrap<T> {
    pub consumer: ConsumerConfig,
    pub connect: ConnectClient,
    pub connector: ConnectorRequest,
    pub target: T,
    pub ready_delay: Duration,
}

#[async_trait::async_trait]
impl<T: OpenTarget> Bootstrap for ServiceBootstrap<T> {
    type Stream = KafkaStream;
    type Sink = T::Sink;

    async fn wait_ready(&mut self) -> anyhow::Result<()> {
        wait_for_services(
            &self.consumer.brokers,
            &self.target,
            &self.connect,
            self.ready_delay,
        )
        .await;
        Ok(())
    }

    async fn register(&mut self) {
        info!("Setting up Debezium connector...");
        if let Err(e) = self.connect.register(&self.connector).await {
            error!(
                "Failed to register connector '{}': {e}",
                self.connector.name
            );
        }
    }

    async fn acquire(&mut self) -> anyhow::Result<(KafkaStream, T::Sink)> {
        let sink = self.target.open().await?;

        let stream = match KafkaStream::new(&self.consumer) {
            Ok(stream) => stream,
            Err(e) => {
                if let Err(close_err) = sink.close().await {
                    warn!("Error closing target connection: {close_err:#}");
                }
                return Err(e).context("Failed to create Kafka consumer");
            }
        };

        info!("Listening for CDC events on topic '{}'", stream.topic());
        Ok((stream, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_wait_until_ready_retries_until_success() {
        let calls = Cell::new(0);
        let attempts = wait_until_ready("test service", Duration::from_millis(1), || {
            calls.set(calls.get() + 1);
            let outcome = if calls.get() < 3 {
                Err("connection refused")
            } else {
                Ok(())
            };
            async move { outcome }
        })
        .await;

        assert_eq!(attempts, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_wait_until_ready_first_try() {
        let attempts = wait_until_ready("test service", Duration::from_secs(60), || async {
            Ok::<(), String>(())
        })
        .await;
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_wait_until_ready_sleeps_between_attempts() {
        tokio::time::pause();
        let start = tokio::time::Instant::now();
        let calls = Cell::new(0);

        wait_until_ready("test service", Duration::from_secs(5), || {
            calls.set(calls.get() + 1);
            let outcome = if calls.get() < 4 { Err("down") } else { Ok(()) };
            async move { outcome }
        })
        .await;

        assert!(start.elapsed() >= Duration::from_secs(15));
        assert_eq!(calls.get(), 4);
    }

    #[tokio::test]
    async fn test_dry_run_target_shares_records() {
        let handle = MemorySink::new();
        let mut target = DryRunTarget {
            sink: handle.clone(),
        };
        target.check().await.unwrap();

        let sink = target.open().await.unwrap();
        sink.upsert(&relay_core::TransformedRow {
            id: Some(relay_core::RecordKey::Int(1)),
            name: "PROCESSED_A".to_string(),
            email: None,
            age: 1,
        })
        .await
        .unwrap();

        assert_eq!(handle.len(), 1);
    }
}
