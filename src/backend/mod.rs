pub mod api;

pub use api::SendGridBackend;

use log::{debug, info};
use thiserror::Error;

use crate::message::Message;

/// Environment variable overriding the provider endpoint.
pub const API_URL_ENV: &str = "SENDGRID_API_URL";
pub const DEFAULT_API_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Invalid API URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("HTTP transport error: {message} (URL: {url})")]
    Transport { url: String, message: String },
    #[error("{message}")]
    Status { code: u16, message: String },
    #[error("Failed to read API response: {0}")]
    Response(#[from] std::io::Error),
}

/// What the provider answered to an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

/// Delivery seam between the assembled message and the outside world.
pub trait EmailBackend: Send + Sync {
    /// Send one message. A single attempt is made; any failure is returned as-is.
    fn send(&self, message: &Message) -> Result<DeliveryResponse, BackendError>;
}

/// Create the SendGrid backend, honouring an endpoint override from the environment.
pub fn create_from_env(
    envs: &[(String, String)],
    api_key: &str,
) -> Result<Box<dyn EmailBackend>, BackendError> {
    let url = envs
        .iter()
        .find(|(key, _)| key == API_URL_ENV)
        .map(|(_, value)| value.as_str())
        .unwrap_or(DEFAULT_API_URL);

    if url != DEFAULT_API_URL {
        info!("Using API endpoint override from {}", API_URL_ENV);
    }
    debug!("API backend: url={}", url);

    Ok(Box::new(SendGridBackend::new(url, api_key)?))
}
