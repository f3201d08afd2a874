//! [`HttpTransport`] – stateless JSON POST with bounded retries.
//!
//! Each call POSTs `{"action": <type>, "parameters": {…}}` to the endpoint.
//! A non-success status, a network failure or an unparseable body counts as
//! a failed attempt; attempts are separated by a fixed delay.  Nothing is
//! carried between calls.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use voxbot_types::{Action, ActionResult, RequestEnvelope, TransportKind, VoxError};

use crate::config::TransportConfig;
use crate::transport::Transport;

/// Error returned once every attempt has failed.
pub const RETRIES_EXHAUSTED_ERROR: &str = "Failed to execute action after multiple attempts";

/// HTTP request/response transport.
pub struct HttpTransport {
    endpoint: String,
    retry_attempts: u32,
    retry_delay: Duration,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from `config`.  `config.timeout` bounds each attempt.
    ///
    /// # Errors
    ///
    /// Returns [`VoxError::Transport`] if the HTTP client cannot be built
    /// (e.g. the TLS backend fails to initialise).
    pub fn new(config: TransportConfig) -> Result<Self, VoxError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VoxError::Transport(format!("http client init: {e}")))?;
        Ok(Self {
            endpoint: config.endpoint,
            retry_attempts: config.retry_attempts,
            retry_delay: config.retry_delay,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn attempt(&self, body: &RequestEnvelope<'_>) -> Result<ActionResult, VoxError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| VoxError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(VoxError::Transport(format!("HTTP {status}: {text}")));
        }

        response
            .json::<ActionResult>()
            .await
            .map_err(|e| VoxError::Protocol(format!("unparseable response body: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    async fn execute(&self, action: &Action) -> ActionResult {
        let body = RequestEnvelope::http(action);

        for attempt in 1..=self.retry_attempts {
            match self.attempt(&body).await {
                Ok(result) => {
                    debug!(action = %action.action_type, attempt, "http action completed");
                    return result;
                }
                Err(e) => {
                    warn!(
                        action = %action.action_type,
                        attempt,
                        attempts = self.retry_attempts,
                        error = %e,
                        "http attempt failed"
                    );
                }
            }
            if attempt < self.retry_attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        ActionResult::failure(RETRIES_EXHAUSTED_ERROR)
    }
}
