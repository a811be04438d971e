//! Google Gemini `generateContent` adapter.
//!
//! The key travels in the `x-goog-api-key` header rather than the query
//! string so it cannot end up in logged URLs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use lectio_core::ProviderError;

use crate::backend::{non_empty_reply, ChatTurn, CompletionBackend, CompletionRequest, Role};
use crate::generative::LlmProvider;
use crate::http::{decode_envelope, send_for_text};
use crate::settings::ResolvedSettings;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

pub type GeminiProvider = LlmProvider<GeminiGenerate>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn content<'a>(role: Option<&'static str>, text: &'a str) -> Content<'a> {
    Content {
        role,
        parts: [Part { text }],
    }
}

fn build_contents(turns: &[ChatTurn]) -> Vec<Content<'_>> {
    turns
        .iter()
        .map(|t| {
            let role = match t.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            content(Some(role), &t.content)
        })
        .collect()
}

/// `generateContent` wire format.
#[derive(Clone, Debug)]
pub struct GeminiGenerate {
    default_api_base: String,
}

impl Default for GeminiGenerate {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl GeminiGenerate {
    pub fn new(default_api_base: impl Into<String>) -> Self {
        Self {
            default_api_base: default_api_base.into(),
        }
    }

    fn generate_url(api_base: &str, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", api_base, model)
    }
}

#[async_trait]
impl CompletionBackend for GeminiGenerate {
    fn default_api_base(&self) -> &str {
        &self.default_api_base
    }

    async fn complete(
        &self,
        client: &reqwest::Client,
        settings: &ResolvedSettings,
        request: &CompletionRequest<'_>,
    ) -> Result<String, ProviderError> {
        let body = GenerateRequest {
            system_instruction: content(None, request.system),
            contents: build_contents(request.turns),
            generation_config: GenerationConfig {
                temperature: settings.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let http = client
            .post(Self::generate_url(&settings.api_base, &settings.model))
            .header("x-goog-api-key", &settings.api_key)
            .json(&body);

        let text = send_for_text(http, request.timeout, request.provider).await?;
        let response: GenerateResponse = decode_envelope(&text)?;

        if response.candidates.is_empty() {
            if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(ProviderError::BadRequest(format!("prompt blocked: {reason}")));
            }
        }

        let candidate = response.candidates.into_iter().next();
        debug!(
            provider = request.provider,
            finish_reason = candidate
                .as_ref()
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("?"),
            "completion received"
        );

        let reply = candidate
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>());
        non_empty_reply(reply, request.provider)
    }
}
