//! Transport abstraction for the external endpoint
//!
//! The `Transport` trait hides how a payload is exchanged for a raw reply,
//! so the delivery client and orchestrator can be tested without a real
//! endpoint. Production uses [`HttpTransport`] (reqwest with separate
//! connect and read timeouts); tests use [`MockTransport`] with scripted
//! replies.

use crate::config::BridgeConfig;
use crate::types::BridgeError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Transport-level failures; all of them are retryable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// The endpoint answered outside its markup protocol
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// One synchronous request/response exchange with the external endpoint
#[async_trait]
pub trait Transport: Send + Sync + Clone {
    /// Send a payload and return the raw reply body
    async fn exchange(&self, payload: &str) -> Result<String, TransportError>;
}

/// Production transport: HTTP POST to the configured endpoint
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Build the HTTP client with the configured timeouts
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::TransportSetup`] if the underlying client
    /// cannot be constructed.
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()
            .map_err(|e| BridgeError::TransportSetup {
                message: e.to_string(),
            })?;
        Ok(HttpTransport {
            client,
            url: config.endpoint.url(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn exchange(&self, payload: &str) -> Result<String, TransportError> {
        tracing::debug!(url = %self.url, bytes = payload.len(), "sending voucher payload");

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "text/xml")
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::Connect(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else {
                TransportError::Connect(e.to_string())
            }
        })
    }
}

/// Scripted transport for tests
///
/// Replies are consumed in FIFO order; every request payload is recorded
/// for inspection. Clones share the same script and call log.
#[derive(Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Result<String, TransportError>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next scripted reply
    pub fn push_reply(&self, reply: Result<String, TransportError>) {
        self.script.lock().unwrap().push_back(reply);
    }

    /// Queue a successful reply with the given body
    pub fn push_ok(&self, body: &str) {
        self.push_reply(Ok(body.to_string()));
    }

    /// Payloads sent so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn exchange(&self, payload: &str) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(payload.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connect("no scripted reply".to_string())))
    }
}
