//! API key validation
//!
//! A key is valid only when the authority explicitly accepts it. Transport
//! failures, timeouts, rate limits and every other non-2xx answer count as
//! invalid.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use snapcode_crypto::ApiKey;
use tracing::{debug, warn};

/// Result of one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Accepted,
    Rejected(StatusCode),
    /// The probe never got an answer
    Unreachable,
}

impl Validation {
    pub fn is_accepted(self) -> bool {
        matches!(self, Validation::Accepted)
    }
}

#[async_trait]
pub trait KeyValidator: Send + Sync {
    /// Ask the authority about `key`. Must not have side effects.
    async fn probe(&self, key: &ApiKey) -> Validation;

    async fn is_valid(&self, key: &ApiKey) -> bool {
        self.probe(key).await.is_accepted()
    }
}

/// Probes the Gemini model listing endpoint
pub struct GeminiKeyValidator {
    client: reqwest::Client,
    models_url: String,
}

impl GeminiKeyValidator {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_base))
    }

    pub fn with_client(client: reqwest::Client, api_base: &str) -> Self {
        Self {
            client,
            models_url: format!("{}/v1beta/models", api_base.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl KeyValidator for GeminiKeyValidator {
    async fn probe(&self, key: &ApiKey) -> Validation {
        let resp = self
            .client
            .get(&self.models_url)
            .header("x-goog-api-key", key.expose())
            .send()
            .await;

        match resp {
            Ok(resp) if resp.status().is_success() => {
                debug!(status = %resp.status(), "key probe accepted");
                Validation::Accepted
            }
            Ok(resp) => {
                debug!(status = %resp.status(), "key probe rejected");
                Validation::Rejected(resp.status())
            }
            Err(e) => {
                warn!(error = %e, "key probe unreachable");
                Validation::Unreachable
            }
        }
    }
}
