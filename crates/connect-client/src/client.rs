//! HTTP client for the Kafka Connect REST API.

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ConnectorRequest;
use crate::error::{Error, Result};

/// How a registration attempt ended. Every variant counts as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The connector was already registered; nothing was sent
    AlreadyExists,
    /// Kafka Connect answered 201
    Created,
    /// Kafka Connect answered 409; another registration won the race
    Conflict,
}

/// Client for one Kafka Connect worker.
#[derive(Debug, Clone)]
pub struct ConnectClient {
    http: Client,
    base_url: String,
}

impl ConnectClient {
    /// Create a client for the worker at `base_url` (e.g. `http://connect:8083`).
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidUrl(base_url.to_string()));
        }

        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn connectors_url(&self) -> String {
        format!("{}/connectors", self.base_url)
    }

    /// Liveness probe: `GET /connectors` must answer 200.
    pub async fn check_ready(&self) -> Result<()> {
        let url = self.connectors_url();
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                url,
                body,
            });
        }
        debug!("Kafka Connect at {} is ready", self.base_url);
        Ok(())
    }

    /// Whether a connector named `name` is registered (`GET /connectors/{name}` answers 200).
    pub async fn connector_exists(&self, name: &str) -> Result<bool> {
        let url = format!("{}/{name}", self.connectors_url());
        let response = self.http.get(&url).send().await?;
        Ok(response.status() == StatusCode::OK)
    }

    /// `POST /connectors`. 201 and 409 both count as success.
    pub async fn create_connector(&self, request: &ConnectorRequest) -> Result<Registration> {
        let url = self.connectors_url();
        let response = self.http.post(&url).json(request).send().await?;

        match response.status() {
            StatusCode::CREATED => Ok(Registration::Created),
            StatusCode::CONFLICT => Ok(Registration::Conflict),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::UnexpectedStatus {
                    status: status.as_u16(),
                    url,
                    body,
                })
            }
        }
    }

    /// Register the connector unless it already exists.
    pub async fn register(&self, request: &ConnectorRequest) -> Result<Registration> {
        if self.connector_exists(&request.name).await? {
            info!("Connector '{}' already exists", request.name);
            return Ok(Registration::AlreadyExists);
        }

        let outcome = self.create_connector(request).await?;
        info!("Connector '{}' registered ({outcome:?})", request.name);
        Ok(outcome)
    }
}
