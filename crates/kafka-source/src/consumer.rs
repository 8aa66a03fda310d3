use crate::error::{Error, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer as RdkafkaConsumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{BorrowedMessage, Message as RdkafkaMessage};
use rdkafka::{Offset, TopicPartitionList};
use relay_core::{EventStream, RawMessage, TransientError};
use tracing::{debug, info};

/// Configuration for the change-topic consumer
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Kafka brokers (comma-separated list)
    pub brokers: String,
    /// Consumer group ID
    pub group_id: String,
    /// Topic to consume from
    pub topic: String,
    /// Auto offset reset strategy ("earliest" or "latest")
    ///
    /// Only applies when the group has no committed offset.
    pub auto_offset_reset: String,
    /// Session timeout in milliseconds
    pub session_timeout_ms: String,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "kafka:29092".to_string(),
            group_id: "cdc-processor-group".to_string(),
            topic: "cdc.tablea".to_string(),
            auto_offset_reset: "earliest".to_string(),
            session_timeout_ms: "6000".to_string(),
        }
    }
}

/// Single-member stream consumer with manual offset commits
pub struct KafkaStream {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaStream {
    /// Create the consumer and subscribe to the configured topic
    pub fn new(config: &ConsumerConfig) -> Result<Self> {
        if config.topic.is_empty() {
            return Err(Error::InvalidConfig("topic must not be empty".to_string()));
        }

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("session.timeout.ms", &config.session_timeout_ms)
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| Error::Consumer(format!("Failed to create consumer: {e}")))?;

        consumer
            .subscribe(&[&config.topic])
            .map_err(|e| Error::Consumer(format!("Failed to subscribe to topic: {e}")))?;

        info!(
            "Subscribed to topic {} as group {} (auto.offset.reset={})",
            config.topic, config.group_id, config.auto_offset_reset
        );

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

fn to_raw_message(msg: &BorrowedMessage<'_>) -> RawMessage {
    RawMessage {
        topic: msg.topic().to_string(),
        partition: msg.partition(),
        offset: msg.offset(),
        key: msg.key().map(|k| k.to_vec()),
        payload: msg.payload().map(|p| p.to_vec()),
        timestamp: msg.timestamp().to_millis(),
    }
}

/// Consumer errors librdkafka recovers from by itself: a topic that does not
/// exist yet, a broker transport failure, a rebalance in progress.
fn is_transient(e: &KafkaError) -> bool {
    matches!(e, KafkaError::MessageConsumption(code) if *code != RDKafkaErrorCode::Fatal)
}

#[async_trait::async_trait]
impl EventStream for KafkaStream {
    async fn recv(&mut self) -> anyhow::Result<Option<RawMessage>> {
        match self.consumer.recv().await {
            Ok(msg) => Ok(Some(to_raw_message(&msg))),
            Err(e) if is_transient(&e) => Err(TransientError(format!(
                "Error receiving message from {}: {e}",
                self.topic
            ))
            .into()),
            Err(e) => Err(Error::Consumer(format!("Error receiving message: {e}")).into()),
        }
    }

    async fn commit(&mut self, message: &RawMessage) -> anyhow::Result<()> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(
            &message.topic,
            message.partition,
            Offset::Offset(message.offset + 1),
        )
        .map_err(|e| Error::Consumer(format!("Failed to add partition offset: {e}")))?;

        // A lost async commit only causes redelivery.
        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| Error::Consumer(format!("Failed to commit offset: {e}")))?;

        debug!(
            "Committed {}[{}] offset {}",
            message.topic,
            message.partition,
            message.offset + 1
        );
        Ok(())
    }

    async fn close(self) -> anyhow::Result<()> {
        // Flush the position of the last processed message before leaving the group.
        if let Err(e) = self.consumer.commit_consumer_state(CommitMode::Sync) {
            debug!("No final offset commit for {}: {e}", self.topic);
        }
        self.consumer.unsubscribe();
        drop(self.consumer);
        info!("Kafka consumer for {} closed", self.topic);
        Ok(())
    }
}
