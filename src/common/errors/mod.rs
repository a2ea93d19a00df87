use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Required setting {0} is not set")]
    Missing(&'static str),
    #[error("Setting {key} is not a valid URL: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },
    #[error("Setting {key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Could not open stream {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Stream {endpoint} answered with status {status}")]
    Status { endpoint: String, status: StatusCode },
    #[error("Stream {endpoint} was interrupted: {source}")]
    Interrupted {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Could not reach the webhook: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Webhook rejected the message with status {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("Relay task {0} panicked")]
    TaskPanicked(String),
}
