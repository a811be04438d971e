//! Wire adapters for text-completion services.
//!
//! A [`CompletionBackend`] knows one vendor's request/response format and
//! nothing else. Prompt construction lives with the caller, parsing lives in
//! [`crate::normalize`], and [`crate::generative::LlmProvider`] glues them.

use std::time::Duration;

use async_trait::async_trait;

use lectio_core::ProviderError;

use crate::settings::ResolvedSettings;

/// Author of one conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One message of the conversation sent after the system instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Everything a backend needs to issue a single completion.
#[derive(Clone, Copy, Debug)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub turns: &'a [ChatTurn],
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Provider id, for logs.
    pub provider: &'a str,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Base URL used when the config does not set `api_base`.
    fn default_api_base(&self) -> &str;

    /// Send one completion and return the reply text.
    ///
    /// A reply without any text is a `MalformedResponse`.
    async fn complete(
        &self,
        client: &reqwest::Client,
        settings: &ResolvedSettings,
        request: &CompletionRequest<'_>,
    ) -> Result<String, ProviderError>;
}

/// Reject blank reply text.
pub(crate) fn non_empty_reply(text: Option<String>, provider: &str) -> Result<String, ProviderError> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(ProviderError::MalformedResponse(format!(
            "{provider} returned an empty completion"
        ))),
    }
}
