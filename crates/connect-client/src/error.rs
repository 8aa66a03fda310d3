//! Error types for connect-client crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}: {body}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Invalid Kafka Connect URL '{0}'")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, Error>;
