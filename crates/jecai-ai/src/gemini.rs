//! HTTP client for the Gemini `generateContent` endpoint.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::prompts::Part;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model returned no text (finish reason: {})", .finish_reason.as_deref().unwrap_or("unknown"))]
    EmptyResponse { finish_reason: Option<String> },
}

/// Text produced by one `generateContent` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub finish_reason: Option<String>,
    pub total_tokens: Option<u32>,
}

// ── Wire types ──

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

fn build_request(parts: &[Part]) -> GenerateRequest<'_> {
    let parts = parts
        .iter()
        .map(|p| match p {
            Part::Text(text) => WirePart::Text { text },
            Part::Inline { mime_type, data } => WirePart::Inline {
                inline_data: InlineData {
                    mime_type,
                    data: STANDARD.encode(data),
                },
            },
        })
        .collect();
    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts,
        }],
    }
}

fn parse_response(body: &str) -> Result<Generation, AiError> {
    let resp: GenerateResponse = serde_json::from_str(body)?;
    let total_tokens = resp.usage_metadata.and_then(|u| u.total_token_count);
    let Some(candidate) = resp.candidates.into_iter().next() else {
        return Err(AiError::EmptyResponse {
            finish_reason: None,
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AiError::EmptyResponse {
            finish_reason: candidate.finish_reason,
        });
    }

    Ok(Generation {
        text,
        finish_reason: candidate.finish_reason,
        total_tokens,
    })
}

/// Gemini API client.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the client at another host (no trailing slash needed).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    pub async fn generate(&self, parts: &[Part]) -> Result<Generation, AiError> {
        self.generate_with_timeout(parts, self.timeout).await
    }

    pub async fn generate_with_timeout(
        &self,
        parts: &[Part],
        timeout: Duration,
    ) -> Result<Generation, AiError> {
        let url = self.endpoint();
        info!(model = %self.model, parts = parts.len(), "requesting generation");

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(timeout)
            .json(&build_request(parts))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(AiError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let generation = parse_response(&body)?;
        debug!(
            chars = generation.text.len(),
            tokens = ?generation.total_tokens,
            finish = ?generation.finish_reason,
            "generation complete"
        );
        Ok(generation)
    }
}
