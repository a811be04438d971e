//! Anthropic Messages API adapter (`POST /v1/messages`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use lectio_core::ProviderError;

use crate::backend::{non_empty_reply, ChatTurn, CompletionBackend, CompletionRequest, Role};
use crate::generative::LlmProvider;
use crate::http::{decode_envelope, send_for_text};
use crate::settings::ResolvedSettings;

pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";

pub type AnthropicProvider = LlmProvider<AnthropicMessages>;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

fn build_messages(turns: &[ChatTurn]) -> Vec<Message<'_>> {
    turns
        .iter()
        .map(|t| Message {
            role: match t.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &t.content,
        })
        .collect()
}

/// Messages API wire format.
#[derive(Clone, Debug)]
pub struct AnthropicMessages {
    default_api_base: String,
}

impl Default for AnthropicMessages {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl AnthropicMessages {
    pub fn new(default_api_base: impl Into<String>) -> Self {
        Self {
            default_api_base: default_api_base.into(),
        }
    }
}

#[async_trait]
impl CompletionBackend for AnthropicMessages {
    fn default_api_base(&self) -> &str {
        &self.default_api_base
    }

    async fn complete(
        &self,
        client: &reqwest::Client,
        settings: &ResolvedSettings,
        request: &CompletionRequest<'_>,
    ) -> Result<String, ProviderError> {
        let body = MessagesRequest {
            model: &settings.model,
            system: request.system,
            messages: build_messages(request.turns),
            max_tokens: request.max_tokens,
            temperature: settings.temperature,
        };

        let http = client
            .post(format!("{}/v1/messages", settings.api_base))
            .header("x-api-key", &settings.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let text = send_for_text(http, request.timeout, request.provider).await?;
        let response: MessagesResponse = decode_envelope(&text)?;

        debug!(
            provider = request.provider,
            stop_reason = response.stop_reason.as_deref().unwrap_or("?"),
            blocks = response.content.len(),
            "completion received"
        );

        let reply: String = response
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text)
            .collect();
        non_empty_reply(Some(reply), request.provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base: &str) -> ResolvedSettings {
        ResolvedSettings {
            model: "claude-3-5-haiku-latest".into(),
            api_key: "ak-test".into(),
            temperature: 0.2,
            api_base: base.into(),
        }
    }

    async fn complete_against(server: &MockServer) -> Result<String, ProviderError> {
        let turns = [ChatTurn::user("Romans 8:28")];
        let request = CompletionRequest {
            system: "sys",
            turns: &turns,
            max_tokens: 512,
            timeout: Duration::from_secs(5),
            provider: "anthropic",
        };
        AnthropicMessages::default()
            .complete(&reqwest::Client::new(), &settings(&server.uri()), &request)
            .await
    }

    #[tokio::test]
    async fn test_complete_joins_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ak-test"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(serde_json::json!({
                "system": "sys",
                "max_tokens": 512,
                "messages": [{"role": "user", "content": "Romans 8:28"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [
                    {"type": "text", "text": "{\"takeaway\": "},
                    {"type": "text", "text": "\"All things work together.\"}"}
                ],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let text = complete_against(&server).await.unwrap();
        assert_eq!(text, "{\"takeaway\": \"All things work together.\"}");
    }

    #[tokio::test]
    async fn test_overloaded_529_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server)
            .await;

        let err = complete_against(&server).await.unwrap_err();
        assert_eq!(err, ProviderError::ServerOverloaded("Overloaded".into()));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_no_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [],
                "stop_reason": "max_tokens"
            })))
            .mount(&server)
            .await;

        let err = complete_against(&server).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }
}
