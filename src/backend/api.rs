use std::fmt;

use log::{debug, info, trace};
use url::Url;

use super::{BackendError, DeliveryResponse, EmailBackend};
use crate::message::Message;

/// Longest provider error body echoed back to the user.
const MAX_ERROR_BODY: usize = 100;

pub struct SendGridBackend {
    url: Url,
    api_key: String,
}

impl SendGridBackend {
    pub fn new(url: &str, api_key: &str) -> Result<Self, BackendError> {
        let parsed = Url::parse(url).map_err(|source| BackendError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        Ok(Self {
            url: parsed,
            api_key: api_key.to_string(),
        })
    }
}

impl fmt::Debug for SendGridBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendGridBackend")
            .field("url", &self.url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl EmailBackend for SendGridBackend {
    fn send(&self, message: &Message) -> Result<DeliveryResponse, BackendError> {
        let payload = serde_json::to_string(message)?;
        info!(
            "API backend: sending to {} recipient(s) with {} attachment(s)",
            message.recipients().count(),
            message.attachments.len()
        );
        trace!("API backend: payload_bytes={}", payload.len());

        let response = ureq::post(self.url.as_str())
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_string(&payload);

        let (status, response_body) = match response {
            Ok(response) => {
                let status = response.status();
                let headers = response
                    .headers_names()
                    .into_iter()
                    .filter_map(|name| {
                        let value = response.header(&name)?.to_string();
                        Some((name, value))
                    })
                    .collect();
                let body = response.into_string()?;
                info!("API backend: message accepted with status {}", status);
                return Ok(DeliveryResponse {
                    status,
                    body,
                    headers,
                });
            }
            Err(ureq::Error::Transport(e)) => {
                return Err(BackendError::Transport {
                    url: self.url.to_string(),
                    message: e.to_string(),
                });
            }
            Err(ureq::Error::Status(code, response)) => (code, response.into_string().ok()),
        };

        debug!(
            "API backend: error with status={} and message={:?}",
            status, response_body
        );

        Err(BackendError::Status {
            code: status,
            message: status_message(status, response_body),
        })
    }
}

/// Human readable description of a rejected request.
fn status_message(status: u16, body: Option<String>) -> String {
    let fallback = match status {
        400 => "Invalid request",
        401 => "Unauthorized",
        403 => "Forbidden",
        413 => "Message too large",
        429 => "Rate limit exceeded",
        500..=599 => "Server error",
        _ => "Unknown error",
    };

    let mut detail = body
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    if let Some((cut, _)) = detail.char_indices().nth(MAX_ERROR_BODY) {
        detail.truncate(cut);
    }

    match status {
        400 => format!("API request failed (400 Bad Request): {}", detail),
        401 => format!("API request failed (401 Unauthorized): {}", detail),
        403 => format!("API request failed (403 Forbidden): {}", detail),
        413 => format!("API request failed (413 Payload Too Large): {}", detail),
        429 => format!("API request failed (429 Too Many Requests): {}", detail),
        500..=599 => format!("API request failed ({} Server Error): {}", status, detail),
        _ => format!("API request failed ({}): {}", status, detail),
    }
}
