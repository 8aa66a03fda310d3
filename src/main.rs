//! Command-line interface for cdc-relay
//!
//! # Usage Examples
//!
//! ```bash
//! # Relay changes from cdc.tablea into tableb (defaults match docker-compose)
//! cdc-relay run
//!
//! # Against local services, creating the target table first
//! cdc-relay run \
//!   --kafka-bootstrap-servers localhost:9092 \
//!   --postgres-host localhost \
//!   --connect-url http://localhost:8083 \
//!   --create-target-table
//!
//! # Retry each failed write up to 3 times, 500ms apart
//! cdc-relay run --apply-attempts 3 --retry-delay 500ms
//!
//! # Only wait until Kafka, PostgreSQL and Kafka Connect answer
//! cdc-relay wait --ready-delay 2s
//! ```
//!
//! Set `RUST_LOG` to adjust verbosity (default: `info`).

use anyhow::Context;
use cdc_relay::bootstrap::{
    wait_for_services, wait_until_ready, DryRunTarget, PostgresTarget, ServiceBootstrap,
};
use cdc_relay::{ConnectOpts, KafkaOpts, PostgresOpts, ReadinessOpts, RelayOpts};
use clap::{Parser, Subcommand};
use connect_client::ConnectClient;
use relay_sync::{Dispatcher, RunSummary};
use target_sink::MemorySink;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "cdc-relay")]
#[command(about = "Relay Debezium change events from Kafka into a transformed PostgreSQL table")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wait for dependencies, register the connector, and relay changes until interrupted
    Run {
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
    },

    /// Wait for Kafka Connect and register the Debezium connector, then exit
    RegisterConnector {
        #[command(flatten)]
        kafka: KafkaOpts,

        #[command(flatten)]
        postgres: PostgresOpts,

        #[command(flatten)]
        connect: ConnectOpts,

        #[command(flatten)]
        readiness: ReadinessOpts,
    },

    /// Wait until Kafka, PostgreSQL and Kafka Connect all answer, then exit
    Wait {
        #[command(flatten)]
        kafka: KafkaOpts,

        #[command(flatten)]
        postgres: PostgresOpts,

        #[command(flatten)]
        connect: ConnectOpts,

        #[command(flatten)]
        readiness: ReadinessOpts,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            kafka,
            postgres,
            connect,
            relay,
            readiness,
        } => run_relay(kafka, postgres, connect, relay, readiness).await,
        Commands::RegisterConnector {
            kafka,
            postgres,
            connect,
            readiness,
        } => register_connector(kafka, postgres, connect, readiness).await,
        Commands::Wait {
            kafka,
            postgres,
            connect,
            readiness,
        } => {
            let client = ConnectClient::new(&connect.connect_url)?;
            let target = PostgresTarget {
                config: postgres.pg_config(),
                table: String::new(),
                create_table: false,
            };
            info!("Waiting for services to be ready...");
            wait_for_services(
                &kafka.kafka_bootstrap_servers,
                &target,
                &client,
                readiness.ready_delay,
            )
            .await;
            info!("All services are ready");
            Ok(())
        }
    }
}

async fn run_relay(
    kafka: KafkaOpts,
    postgres: PostgresOpts,
    connect: ConnectOpts,
    relay: RelayOpts,
    readiness: ReadinessOpts,
) -> anyhow::Result<()> {
    info!("Starting CDC relay...");
    postgresql_sink::validate_identifier(&relay.target_table).context("Invalid --target-table")?;

    let settings = connect.connector_settings(&postgres, &kafka)?;
    let consumer = kafka.consumer_config(settings.routed_topic());
    let client = ConnectClient::new(&connect.connect_url)?;

    let dispatcher = Dispatcher::new().with_retry(relay.retry_policy());
    let shutdown = shutdown_future(setup_shutdown_handler());

    // Branch once on the target; everything after is monomorphized for it.
    if relay.dry_run {
        info!("Dry-run mode: applying to an in-memory target");
        let sink = MemorySink::new();
        let bootstrap = ServiceBootstrap {
            consumer,
            connect: client,
            connector: settings.to_request(),
            target: DryRunTarget { sink: sink.clone() },
            ready_delay: readiness.ready_delay,
        };
        let summary = dispatcher.run(bootstrap, shutdown).await?;
        report(&summary);
        for record in sink.records() {
            info!("Dry-run record: {record:?}");
        }
    } else {
        let bootstrap = ServiceBootstrap {
            consumer,
            connect: client,
            connector: settings.to_request(),
            target: PostgresTarget {
                config: postgres.pg_config(),
                table: relay.target_table.clone(),
                create_table: relay.create_target_table,
            },
            ready_delay: readiness.ready_delay,
        };
        let summary = dispatcher.run(bootstrap, shutdown).await?;
        report(&summary);
    }

    Ok(())
}

async fn register_connector(
    kafka: KafkaOpts,
    postgres: PostgresOpts,
    connect: ConnectOpts,
    readiness: ReadinessOpts,
) -> anyhow::Result<()> {
    let settings = connect.connector_settings(&postgres, &kafka)?;
    let client = ConnectClient::new(&connect.connect_url)?;

    wait_until_ready("Kafka Connect", readiness.ready_delay, || client.check_ready()).await;

    let outcome = client
        .register(&settings.to_request())
        .await
        .with_context(|| format!("Failed to register connector '{}'", settings.name))?;
    info!(
        "Connector '{}' ready ({outcome:?}); changes route to '{}'",
        settings.name,
        settings.routed_topic()
    );
    Ok(())
}

fn report(summary: &RunSummary) {
    if summary.interrupted {
        info!("CDC relay stopped by interrupt");
    } else {
        info!("CDC relay stopped: event stream ended");
    }
    if summary.recv_errors > 0 {
        warn!("{} transient receive error(s) were waited out", summary.recv_errors);
    }
    if summary.failed > 0 {
        warn!("{} change(s) could not be applied", summary.failed);
    }
}

/// Sets up a shutdown signal handler
fn setup_shutdown_handler() -> broadcast::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(());
    });

    shutdown_rx
}

async fn shutdown_future(mut shutdown_rx: broadcast::Receiver<()>) {
    let _ = shutdown_rx.recv().await;
}

/// Resolves on Ctrl+C, or SIGTERM on unix. A handler that cannot be
/// installed never fires.
async fn wait_for_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received interrupt signal (Ctrl+C)"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received termination signal");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
