//! Kafka Connect REST client.
//!
//! This crate talks to the Kafka Connect worker that hosts the Debezium
//! PostgreSQL connector:
//!
//! - `GET /connectors` - liveness probe (200 = ready)
//! - `GET /connectors/{name}` - existence check (200 = registered)
//! - `POST /connectors` - registration (201 = created, 409 = already exists)
//!
//! Registration is idempotent: an existing connector is left alone and a
//! 409 from a concurrent registration counts as success.
//!
//! # Example
//!
//! ```ignore
//! use connect_client::{ConnectClient, ConnectorSettings};
//!
//! let client = ConnectClient::new("http://connect:8083")?;
//! client.check_ready().await?;
//! let outcome = client.register(&ConnectorSettings::default().to_request()).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{ConnectClient, Registration};
pub use config::{ConnectorRequest, ConnectorSettings, DebeziumPostgresConfig, ROUTE_REGEX};
pub use error::{Error, Result};
