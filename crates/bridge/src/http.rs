//! HTTP client for a remote bridge service.
//!
//! The service exposes a single endpoint that accepts a [`BridgeRequest`] and
//! answers once the intent settled (or failed). Settlement can take minutes,
//! so the client timeout is configured separately from RPC timeouts.

use crate::{BridgeError, BridgeReceipt, BridgeRequest, BridgeService};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Bridge service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBridgeService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBridgeService {
    /// Creates a client posting to `{base_url}/bridge`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Transport(e.to_string()))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Creates a client with a custom HTTP client.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/bridge", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn transport_error(e: reqwest::Error) -> BridgeError {
    if e.is_timeout() {
        BridgeError::Timeout
    } else {
        BridgeError::Transport(e.to_string())
    }
}

#[async_trait]
impl BridgeService for HttpBridgeService {
    async fn request_bridge(&self, request: &BridgeRequest) -> Result<BridgeReceipt, BridgeError> {
        debug!(endpoint = %self.endpoint, "Posting bridge request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(if status.is_client_error() {
                BridgeError::Rejected(message)
            } else {
                BridgeError::Transport(format!("{status}: {message}"))
            });
        }

        response
            .json::<BridgeReceipt>()
            .await
            .map_err(|e| BridgeError::InvalidReceipt(e.to_string()))
    }
}
