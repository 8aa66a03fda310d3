use crate::error::{Error, Result};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer as RdkafkaConsumer};
use std::time::Duration;
use tracing::debug;

/// Check that the brokers answer a metadata request.
///
/// Creating a client alone does not contact the cluster, so this fetches
/// cluster metadata and requires at least one broker in the answer.
pub async fn check_broker(brokers: &str, timeout: Duration) -> Result<()> {
    let brokers = brokers.to_string();

    let broker_count = tokio::task::spawn_blocking(move || -> Result<usize> {
        let consumer: BaseConsumer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .create()?;
        let metadata = consumer.fetch_metadata(None, timeout)?;
        Ok(metadata.brokers().len())
    })
    .await
    .map_err(|e| Error::Unreachable(format!("metadata probe task failed: {e}")))??;

    if broker_count == 0 {
        return Err(Error::Unreachable(
            "metadata response listed no brokers".to_string(),
        ));
    }

    debug!("Kafka metadata lists {broker_count} broker(s)");
    Ok(())
}
