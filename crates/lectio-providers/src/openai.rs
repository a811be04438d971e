//! OpenAI-compatible `/chat/completions` adapter.
//!
//! Also serves any gateway that speaks the same dialect (OpenRouter, local
//! proxies) by pointing `api_base` at it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use lectio_core::error::classify_vendor_message;
use lectio_core::ProviderError;

use crate::backend::{non_empty_reply, ChatTurn, CompletionBackend, CompletionRequest, Role};
use crate::generative::LlmProvider;
use crate::http::{decode_envelope, send_for_text};
use crate::settings::ResolvedSettings;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Generative provider backed by an OpenAI-compatible endpoint.
pub type OpenAiProvider = LlmProvider<OpenAiChat>;

// ─────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    /// Some gateways report upstream failures inside a 200 body.
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

fn build_messages<'a>(system: &'a str, turns: &'a [ChatTurn]) -> Vec<ChatMessage<'a>> {
    std::iter::once(ChatMessage {
        role: "system",
        content: system,
    })
    .chain(turns.iter().map(|t| ChatMessage {
        role: role_name(t.role),
        content: &t.content,
    }))
    .collect()
}

// ─────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────

/// Chat-completions wire format.
#[derive(Clone, Debug)]
pub struct OpenAiChat {
    default_api_base: String,
}

impl Default for OpenAiChat {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl OpenAiChat {
    pub fn new(default_api_base: impl Into<String>) -> Self {
        Self {
            default_api_base: default_api_base.into(),
        }
    }

    fn completions_url(api_base: &str) -> String {
        format!("{}/chat/completions", api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionBackend for OpenAiChat {
    fn default_api_base(&self) -> &str {
        &self.default_api_base
    }

    async fn complete(
        &self,
        client: &reqwest::Client,
        settings: &ResolvedSettings,
        request: &CompletionRequest<'_>,
    ) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &settings.model,
            messages: build_messages(request.system, request.turns),
            temperature: settings.temperature,
            max_tokens: request.max_tokens,
        };

        let http = client
            .post(Self::completions_url(&settings.api_base))
            .bearer_auth(&settings.api_key)
            .json(&body);

        let text = send_for_text(http, request.timeout, request.provider).await?;
        let response: ChatResponse = decode_envelope(&text)?;

        if let Some(err) = response.error {
            return Err(classify_vendor_message(&err.message)
                .unwrap_or(ProviderError::MalformedResponse(err.message)));
        }

        let choice = response.choices.into_iter().next();
        debug!(
            provider = request.provider,
            finish_reason = choice
                .as_ref()
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("?"),
            "completion received"
        );
        non_empty_reply(choice.and_then(|c| c.message.content), request.provider)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base: &str) -> ResolvedSettings {
        ResolvedSettings {
            model: "gpt-4o-mini".into(),
            api_key: "sk-test".into(),
            temperature: 0.3,
            api_base: base.into(),
        }
    }

    fn request<'a>(turns: &'a [ChatTurn]) -> CompletionRequest<'a> {
        CompletionRequest {
            system: "You are a Bible study assistant.",
            turns,
            max_tokens: 256,
            timeout: Duration::from_secs(5),
            provider: "openai",
        }
    }

    #[test]
    fn test_completions_url() {
        assert_eq!(
            OpenAiChat::completions_url("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_messages_start_with_system() {
        let turns = [ChatTurn::user("q"), ChatTurn::assistant("a"), ChatTurn::user("q2")];
        let msgs = build_messages("sys", &turns);
        let roles: Vec<_> = msgs.iter().map(|m| m.role).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
    }

    #[tokio::test]
    async fn test_complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "max_tokens": 256,
                "messages": [{"role": "system"}, {"role": "user", "content": "John 3:16"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"content": "{\"takeaway\": \"God gives.\"}"},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let turns = [ChatTurn::user("John 3:16")];
        let text = OpenAiChat::default()
            .complete(&reqwest::Client::new(), &settings(&server.uri()), &request(&turns))
            .await
            .unwrap();
        assert_eq!(text, "{\"takeaway\": \"God gives.\"}");
    }

    #[tokio::test]
    async fn test_complete_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": null}, "finish_reason": "length"}]
            })))
            .mount(&server)
            .await;

        let turns = [ChatTurn::user("x")];
        let err = OpenAiChat::default()
            .complete(&reqwest::Client::new(), &settings(&server.uri()), &request(&turns))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_gateway_error_in_ok_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": {"message": "Upstream provider is overloaded", "code": 502}
            })))
            .mount(&server)
            .await;

        let turns = [ChatTurn::user("x")];
        let err = OpenAiChat::default()
            .complete(&reqwest::Client::new(), &settings(&server.uri()), &request(&turns))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ServerOverloaded(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached for gpt-4o-mini"}
            })))
            .mount(&server)
            .await;

        let turns = [ChatTurn::user("x")];
        let err = OpenAiChat::default()
            .complete(&reqwest::Client::new(), &settings(&server.uri()), &request(&turns))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::RateLimited("Rate limit reached for gpt-4o-mini".into())
        );
    }
}
