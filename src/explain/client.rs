//! HTTP client for the local explanation backend
//!
//! One POST per call, no retries. The body is read as text before JSON
//! decoding so that a non-JSON answer can be reported with its raw content.

use super::models::{error_kinds, BackendFailure, BackendPayload, BackendReply};
use crate::config::BackendConfig;
use crate::error::Result;
use crate::metrics::METRICS;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, warn};

/// Anything that can answer an explain payload
#[async_trait]
pub trait ExplainBackend: Send + Sync {
    /// Never fails: every problem comes back as [`BackendReply::Failure`]
    async fn call(&self, payload: &BackendPayload) -> BackendReply;
}

/// reqwest-based backend client
pub struct HttpBackend {
    url: String,
    client: Client,
}

impl HttpBackend {
    /// Create a new backend client
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ExplainBackend for HttpBackend {
    async fn call(&self, payload: &BackendPayload) -> BackendReply {
        let start = Instant::now();
        debug!(
            "Calling backend: mode={}, action={:?}, text_len={}",
            payload.mode.as_str(),
            payload.action.map(|a| a.as_str()),
            payload.text.len()
        );

        let response = match self.client.post(&self.url).json(payload).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Backend request failed: {}", e);
                METRICS.record_backend_call("network_error", start.elapsed());
                return BackendReply::Failure(BackendFailure::new(
                    error_kinds::NETWORK_ERROR,
                    Some(e.to_string()),
                ));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Backend body could not be read: {}", e);
                METRICS.record_backend_call("network_error", start.elapsed());
                return BackendReply::Failure(BackendFailure::new(
                    error_kinds::NETWORK_ERROR,
                    Some(e.to_string()),
                ));
            }
        };

        match serde_json::from_str(&body) {
            Ok(value) => {
                let reply = BackendReply::from_json(value);
                let outcome = if reply.failure().is_some() { "backend_error" } else { "ok" };
                METRICS.record_backend_call(outcome, start.elapsed());
                reply
            }
            Err(_) => {
                warn!("Backend returned non-JSON body (status {})", status.as_u16());
                METRICS.record_backend_call("non_json", start.elapsed());
                BackendReply::Failure(BackendFailure {
                    error: error_kinds::NON_JSON_RESPONSE.to_string(),
                    trace: Some(body),
                    status: Some(status.as_u16()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HttpBackend::new(&BackendConfig::default());
        assert!(client.is_ok());
        assert_eq!(client.unwrap().url(), "http://localhost:5000/api/explain");
    }

    #[test]
    fn test_client_with_timeout() {
        let config = BackendConfig {
            url: "http://127.0.0.1:9/api/explain".to_string(),
            timeout_ms: Some(250),
        };
        assert!(HttpBackend::new(&config).is_ok());
    }
}
