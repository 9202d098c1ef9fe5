//! HTML generation orchestrator
//!
//! resolve key -> build prompt -> call authority (cancellable) -> clean up
//! output -> classify failures. Stateless per call: callers that start a new
//! request must cancel the previous token themselves.

use std::sync::Arc;

use serde::Serialize;
use snapcode_crypto::ApiKey;
use tracing::{debug, info, warn};

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::gemini::{BackendError, GenerationBackend, GenerationCall};
use crate::prompt::build_prompt;
use crate::request::GenerationRequest;
use crate::resolver::KeyResolver;
use crate::response::{extract_sources, strip_code_fence, Source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureCategory {
    /// No usable key from any source; nothing was sent
    MissingCredential,
    /// The authority rejected the key
    InvalidCredential,
    GenerationFailed,
}

impl FailureCategory {
    /// True when the user should be sent to key configuration
    pub fn needs_credential(self) -> bool {
        matches!(self, FailureCategory::MissingCredential | FailureCategory::InvalidCredential)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationFailure {
    pub category: FailureCategory,
    pub message: String,
}

impl GenerationFailure {
    /// Text to show the user
    pub fn user_message(&self) -> String {
        match self.category {
            FailureCategory::MissingCredential => {
                "No valid API key is configured. Add one to start generating.".to_string()
            }
            FailureCategory::InvalidCredential => {
                "The API key was rejected. Replace it with a valid key and try again.".to_string()
            }
            FailureCategory::GenerationFailed => format!("Generation failed: {}", self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedPage {
    pub html: String,
    pub sources: Option<Vec<Source>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GenerationOutcome {
    Success(GeneratedPage),
    Failure(GenerationFailure),
}

impl GenerationOutcome {
    fn failure(category: FailureCategory, message: impl Into<String>) -> Self {
        GenerationOutcome::Failure(GenerationFailure {
            category,
            message: message.into(),
        })
    }
}

pub struct HtmlGenerator {
    backend: Arc<dyn GenerationBackend>,
    resolver: Arc<KeyResolver>,
}

impl HtmlGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, resolver: Arc<KeyResolver>) -> Self {
        Self { backend, resolver }
    }

    /// Run one request.
    ///
    /// `Ok(None)` means the token was cancelled: the network call, if any,
    /// was dropped mid-flight and no outcome exists. `Err` is reserved for
    /// local storage failures while resolving the stored key.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        key_override: Option<&ApiKey>,
    ) -> Result<Option<GenerationOutcome>> {
        if cancel.is_cancelled() {
            return Ok(None);
        }

        let key = match key_override {
            Some(key) => Some(key.clone()),
            None => self.resolver.active_key().await?,
        };
        let Some(key) = key else {
            info!("generation skipped: no usable API key");
            return Ok(Some(GenerationOutcome::failure(
                FailureCategory::MissingCredential,
                "No valid API key is configured",
            )));
        };

        if cancel.is_cancelled() {
            return Ok(None);
        }

        let prompt = build_prompt(request);
        let call = GenerationCall {
            key: &key,
            image: request.image(),
            prompt: &prompt,
        };

        debug!(category = %request.category(), "generation started");
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("generation cancelled");
                return Ok(None);
            }
            result = self.backend.generate(call) => result,
        };

        // A result that raced a late cancel is discarded
        if cancel.is_cancelled() {
            info!("generation cancelled; discarding result");
            return Ok(None);
        }

        let outcome = match result {
            Ok(raw) => {
                let html = strip_code_fence(&raw.text);
                let sources = extract_sources(&raw.grounding);
                info!(
                    html_len = html.len(),
                    sources = sources.as_ref().map_or(0, Vec::len),
                    "generation finished"
                );
                GenerationOutcome::Success(GeneratedPage { html, sources })
            }
            Err(BackendError::InvalidCredential { message }) => {
                warn!("authority rejected the API key");
                GenerationOutcome::failure(FailureCategory::InvalidCredential, message)
            }
            Err(e) => {
                warn!(error = %e, "generation failed");
                GenerationOutcome::failure(FailureCategory::GenerationFailed, e.to_string())
            }
        };
        Ok(Some(outcome))
    }
}
