//! Connection setup.

use anyhow::{Context, Result};
use std::fmt;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

/// Connection parameters for the target database.
#[derive(Clone)]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl PgConfig {
    fn to_tokio_postgres(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .password(&self.password);
        config
    }

    /// Open a connection and spawn its driver task.
    ///
    /// The returned handle completes once the client is dropped.
    pub(crate) async fn connect(&self) -> Result<(Client, JoinHandle<()>)> {
        let (client, connection) = self
            .to_tokio_postgres()
            .connect(NoTls)
            .await
            .with_context(|| format!("Failed to connect to PostgreSQL at {self}"))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {e}");
            }
        });

        Ok((client, handle))
    }
}

// Keeps the password out of logs.
impl fmt::Display for PgConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for PgConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Check that the database accepts connections, then disconnect.
pub async fn check_connection(config: &PgConfig) -> Result<()> {
    let (client, handle) = config.connect().await?;
    client
        .simple_query("SELECT 1")
        .await
        .context("PostgreSQL liveness query failed")?;
    drop(client);
    let _ = handle.await;
    debug!("PostgreSQL at {config} is reachable");
    Ok(())
}
