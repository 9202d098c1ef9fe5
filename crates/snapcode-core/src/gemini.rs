//! Gemini REST backend
//!
//! One `generateContent` call per request: inline image part followed by the
//! text prompt. Credential rejections are reported apart from every other
//! failure so callers can ask for a new key instead of retrying.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use snapcode_crypto::ApiKey;
use tracing::{debug, warn};

use crate::request::ImagePayload;
use crate::response::GroundingChunk;

/// Everything one authority call needs
pub struct GenerationCall<'a> {
    pub key: &'a ApiKey,
    pub image: &'a ImagePayload,
    pub prompt: &'a str,
}

/// Unprocessed authority answer
#[derive(Debug, Clone, Default)]
pub struct RawGeneration {
    pub text: String,
    pub grounding: Vec<GroundingChunk>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("{message}")]
    InvalidCredential { message: String },

    #[error("{message}")]
    Authority { status: Option<u16>, message: String },

    #[error("Request failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, call: GenerationCall<'_>) -> Result<RawGeneration, BackendError>;
}

pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_base: &str, model: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_base, model))
    }

    pub fn with_client(client: reqwest::Client, api_base: &str, model: &str) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                api_base.trim_end_matches('/'),
                model
            ),
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, call: GenerationCall<'_>) -> Result<RawGeneration, BackendError> {
        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": call.image.mime_type, "data": call.image.to_base64() } },
                    { "text": call.prompt },
                ]
            }]
        });

        debug!(
            image_bytes = call.image.bytes.len(),
            prompt_chars = call.prompt.len(),
            "sending generateContent"
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", call.key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !status.is_success() {
            let err = classify_error(status, &text);
            warn!(status = %status, invalid_key = matches!(err, BackendError::InvalidCredential { .. }), "generateContent failed");
            return Err(err);
        }

        parse_success(&text)
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: Option<String>,
}

fn parse_success(body: &str) -> Result<RawGeneration, BackendError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body).map_err(|e| BackendError::Authority {
        status: None,
        message: format!("Unreadable response: {}", e),
    })?;

    let Some(candidate) = parsed.candidates.into_iter().next() else {
        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(BackendError::Authority {
                status: None,
                message: format!("Request was blocked: {}", reason),
            });
        }
        return Ok(RawGeneration::default());
    };

    let text = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default();
    let grounding = candidate
        .grounding_metadata
        .map(|m| m.grounding_chunks)
        .unwrap_or_default();

    Ok(RawGeneration { text, grounding })
}

/// Map a non-2xx answer onto credential rejection vs. everything else.
pub(crate) fn classify_error(status: StatusCode, body: &str) -> BackendError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);

    let message = match &parsed {
        Some(err) if !err.message.is_empty() => err.message.clone(),
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
    };

    let key_rejected = parsed
        .as_ref()
        .map(|err| err.details.iter().any(|d| d.reason.as_deref() == Some("API_KEY_INVALID")))
        .unwrap_or(false);

    if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || key_rejected
        || message.contains("API key not valid")
    {
        BackendError::InvalidCredential { message }
    } else {
        BackendError::Authority {
            status: Some(status.as_u16()),
            message,
        }
    }
}
