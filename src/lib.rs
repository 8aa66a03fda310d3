//! cdc-relay library
//!
//! Relays Debezium change events for one source table from Kafka into a
//! derived PostgreSQL table.
//!
//! # Pipeline
//!
//! - `kafka_source` - consumes the routed change topic
//! - `debezium_types` - decodes each message into a change event
//! - `relay_sync` - transforms rows, applies them, drives the lifecycle
//! - `postgresql_sink` - upserts and deletes in the target table
//! - `connect_client` - registers the Debezium connector with Kafka Connect
//!
//! # CLI Usage
//!
//! ```bash
//! # Wait for dependencies, register the connector, relay changes
//! cdc-relay run
//!
//! # Same, but apply into memory instead of PostgreSQL
//! cdc-relay run --dry-run
//!
//! # Register the connector only
//! cdc-relay register-connector --connect-url http://localhost:8083
//! ```

use anyhow::Context;
use clap::Parser;
use connect_client::ConnectorSettings;
use kafka_source::ConsumerConfig;
use postgresql_sink::{validate_identifier, PgConfig};
use relay_sync::RetryPolicy;
use std::time::Duration;

pub mod bootstrap;
pub mod config;

use config::parse_duration;

#[derive(Parser, Clone, Debug)]
pub struct KafkaOpts {
    /// Kafka bootstrap servers (comma-separated)
    #[arg(long, default_value = "kafka:29092", env = "KAFKA_BOOTSTRAP_SERVERS")]
    pub kafka_bootstrap_servers: String,

    /// Consumer group ID; committed offsets are kept per group
    #[arg(long, default_value = "cdc-processor-group", env = "KAFKA_GROUP_ID")]
    pub kafka_group_id: String,

    /// Where a group without committed offsets starts
    #[arg(
        long,
        default_value = "earliest",
        value_parser = ["earliest", "latest"],
        env = "KAFKA_AUTO_OFFSET_RESET"
    )]
    pub kafka_auto_offset_reset: String,

    /// Topic to consume (default: <route prefix>.<source table>)
    #[arg(long, env = "KAFKA_TOPIC")]
    pub kafka_topic: Option<String>,
}

impl KafkaOpts {
    pub fn consumer_config(&self, default_topic: String) -> ConsumerConfig {
        ConsumerConfig {
            brokers: self.kafka_bootstrap_servers.clone(),
            group_id: self.kafka_group_id.clone(),
            topic: self.kafka_topic.clone().unwrap_or(default_topic),
            auto_offset_reset: self.kafka_auto_offset_reset.clone(),
            ..ConsumerConfig::default()
        }
    }
}

#[derive(Parser, Clone)]
pub struct PostgresOpts {
    #[arg(long, default_value = "postgres", env = "POSTGRES_HOST")]
    pub postgres_host: String,

    #[arg(long, default_value = "5432", env = "POSTGRES_PORT")]
    pub postgres_port: u16,

    #[arg(long, default_value = "testdb", env = "POSTGRES_DB")]
    pub postgres_db: String,

    #[arg(long, default_value = "postgres", env = "POSTGRES_USER")]
    pub postgres_user: String,

    #[arg(long, default_value = "postgres", env = "POSTGRES_PASSWORD", hide_env_values = true)]
    pub postgres_password: String,
}

impl std::fmt::Debug for PostgresOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresOpts")
            .field("postgres_host", &self.postgres_host)
            .field("postgres_port", &self.postgres_port)
            .field("postgres_db", &self.postgres_db)
            .field("postgres_user", &self.postgres_user)
            .finish_non_exhaustive()
    }
}

impl PostgresOpts {
    pub fn pg_config(&self) -> PgConfig {
        PgConfig {
            host: self.postgres_host.clone(),
            port: self.postgres_port,
            database: self.postgres_db.clone(),
            user: self.postgres_user.clone(),
            password: self.postgres_password.clone(),
        }
    }
}

#[derive(Parser, Clone, Debug)]
pub struct ConnectOpts {
    /// Kafka Connect REST endpoint
    #[arg(long, default_value = "http://connect:8083", env = "CONNECT_URL")]
    pub connect_url: String,

    #[arg(long, default_value = "postgres-connector", env = "CONNECTOR_NAME")]
    pub connector_name: String,

    /// Database host as seen from Kafka Connect (default: --postgres-host)
    #[arg(long, env = "CONNECTOR_DATABASE_HOST")]
    pub connector_database_host: Option<String>,

    /// Schema of the captured source table
    #[arg(long, default_value = "public", env = "SOURCE_SCHEMA")]
    pub source_schema: String,

    /// Captured source table
    #[arg(long, default_value = "tablea", env = "SOURCE_TABLE")]
    pub source_table: String,

    /// Logical server name and topic prefix used by Debezium
    #[arg(long, default_value = "dbserver1", env = "SERVER_NAME")]
    pub server_name: String,

    /// Prefix of the routed change topic
    #[arg(long, default_value = "cdc", env = "ROUTE_PREFIX")]
    pub route_prefix: String,

    #[arg(long, default_value = "debezium", env = "REPLICATION_SLOT")]
    pub slot_name: String,

    #[arg(long, default_value = "dbz_publication", env = "PUBLICATION_NAME")]
    pub publication_name: String,
}

impl ConnectOpts {
    /// Build the connector settings for the configured source table.
    pub fn connector_settings(
        &self,
        postgres: &PostgresOpts,
        kafka: &KafkaOpts,
    ) -> anyhow::Result<ConnectorSettings> {
        validate_identifier(&self.source_schema).context("Invalid --source-schema")?;
        validate_identifier(&self.source_table).context("Invalid --source-table")?;
        if self.source_schema.contains('.') || self.source_table.contains('.') {
            anyhow::bail!(
                "Source schema and table must be unqualified: {}.{}",
                self.source_schema,
                self.source_table
            );
        }
        if self.route_prefix.is_empty() || self.server_name.is_empty() {
            anyhow::bail!("--route-prefix and --server-name must not be empty");
        }

        Ok(ConnectorSettings {
            name: self.connector_name.clone(),
            database_hostname: self
                .connector_database_host
                .clone()
                .unwrap_or_else(|| postgres.postgres_host.clone()),
            database_port: postgres.postgres_port,
            database_user: postgres.postgres_user.clone(),
            database_password: postgres.postgres_password.clone(),
            database_dbname: postgres.postgres_db.clone(),
            server_name: self.server_name.clone(),
            source_schema: self.source_schema.clone(),
            source_table: self.source_table.clone(),
            topic_prefix: self.server_name.clone(),
            plugin_name: "pgoutput".to_string(),
            slot_name: self.slot_name.clone(),
            publication_name: self.publication_name.clone(),
            history_bootstrap_servers: kafka.kafka_bootstrap_servers.clone(),
            route_prefix: self.route_prefix.clone(),
        })
    }
}

#[derive(Parser, Clone, Debug)]
pub struct RelayOpts {
    /// Target table for transformed rows
    #[arg(long, default_value = "tableb", env = "TARGET_TABLE")]
    pub target_table: String,

    /// Create the target table if it does not exist
    #[arg(long)]
    pub create_target_table: bool,

    /// Apply into memory instead of PostgreSQL
    #[arg(long)]
    pub dry_run: bool,

    /// Attempts per write before it is logged and dropped
    #[arg(
        long,
        default_value = "1",
        value_parser = clap::value_parser!(u32).range(1..),
        env = "APPLY_ATTEMPTS"
    )]
    pub apply_attempts: u32,

    /// Pause between write attempts (e.g. "500ms", "2s")
    #[arg(long, default_value = "1s", value_parser = parse_duration, env = "RETRY_DELAY")]
    pub retry_delay: Duration,
}

impl RelayOpts {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.apply_attempts, self.retry_delay)
    }
}

#[derive(Parser, Clone, Debug)]
pub struct ReadinessOpts {
    /// Pause between readiness probes (e.g. "5s", "250ms")
    #[arg(long, default_value = "5s", value_parser = parse_duration, env = "READY_DELAY")]
    pub ready_delay: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        kafka: KafkaOpts,
        #[command(flatten)]
        postgres: PostgresOpts,
        #[command(flatten)]
        connect: ConnectOpts,
        #[command(flatten)]
        relay: RelayOpts,
        #[command(flatten)]
        readiness: ReadinessOpts,
    }

    fn parse(args: &[&str]) -> TestCli {
        let mut argv = vec!["cdc-relay"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_match_reference_deployment() {
        let cli = parse(&[]);
        let settings = cli
            .connect
            .connector_settings(&cli.postgres, &cli.kafka)
            .unwrap();
        let consumer = cli.kafka.consumer_config(settings.routed_topic());

        assert_eq!(consumer.brokers, "kafka:29092");
        assert_eq!(consumer.group_id, "cdc-processor-group");
        assert_eq!(consumer.topic, "cdc.tablea");
        assert_eq!(consumer.auto_offset_reset, "earliest");

        assert_eq!(settings.name, "postgres-connector");
        assert_eq!(settings.database_hostname, "postgres");
        assert_eq!(settings.history_bootstrap_servers, "kafka:29092");

        let pg = cli.postgres.pg_config();
        assert_eq!(pg.host, "postgres");
        assert_eq!(pg.port, 5432);
        assert_eq!(pg.database, "testdb");

        assert_eq!(cli.relay.target_table, "tableb");
        assert_eq!(
            cli.relay.retry_policy(),
            RetryPolicy::fixed(1, Duration::from_secs(1))
        );
        assert_eq!(cli.readiness.ready_delay, Duration::from_secs(5));
        assert!(!cli.relay.dry_run);
    }

    #[test]
    fn test_overrides() {
        let cli = parse(&[
            "--source-table",
            "orders",
            "--route-prefix",
            "changes",
            "--connector-database-host",
            "db.internal",
            "--apply-attempts",
            "3",
            "--retry-delay",
            "250ms",
            "--ready-delay",
            "1m",
        ]);
        let settings = cli
            .connect
            .connector_settings(&cli.postgres, &cli.kafka)
            .unwrap();

        assert_eq!(settings.routed_topic(), "changes.orders");
        assert_eq!(settings.database_hostname, "db.internal");
        assert_eq!(
            cli.relay.retry_policy(),
            RetryPolicy::fixed(3, Duration::from_millis(250))
        );
        assert_eq!(cli.readiness.ready_delay, Duration::from_secs(60));
    }

    #[test]
    fn test_explicit_topic_wins() {
        let cli = parse(&["--kafka-topic", "custom.topic"]);
        assert_eq!(
            cli.kafka.consumer_config("cdc.tablea".to_string()).topic,
            "custom.topic"
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(TestCli::try_parse_from(["cdc-relay", "--apply-attempts", "0"]).is_err());
        assert!(TestCli::try_parse_from(["cdc-relay", "--ready-delay", "soon"]).is_err());
        assert!(
            TestCli::try_parse_from(["cdc-relay", "--kafka-auto-offset-reset", "middle"]).is_err()
        );

        let cli = parse(&["--source-table", "table-a"]);
        assert!(cli
            .connect
            .connector_settings(&cli.postgres, &cli.kafka)
            .is_err());

        let cli = parse(&["--source-table", "public.tablea"]);
        assert!(cli
            .connect
            .connector_settings(&cli.postgres, &cli.kafka)
            .is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let cli = parse(&["--postgres-password", "hunter2"]);
        assert!(!format!("{:?}", cli.postgres).contains("hunter2"));
    }
}
