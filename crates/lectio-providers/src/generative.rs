//! Generic generative provider: one [`CompletionBackend`] plus the shared
//! settings slot and response normalizer.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use lectio_core::config::ProviderConfig;
use lectio_core::{OperationResult, Prompt, ProviderError, ScoreResult, VerseReference, VerseText};

use crate::backend::{ChatTurn, CompletionBackend, CompletionRequest};
use crate::normalize;
use crate::settings::SettingsSlot;
use crate::traits::{GenerativeProvider, Provider, ProviderDescriptor};

/// Output token cap per completion.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// A [`GenerativeProvider`] speaking the wire format of `B`.
pub struct LlmProvider<B> {
    descriptor: ProviderDescriptor,
    backend: B,
    client: reqwest::Client,
    settings: SettingsSlot,
    timeout: Duration,
    max_tokens: u32,
}

impl<B> std::fmt::Debug for LlmProvider<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmProvider")
            .field("id", &self.descriptor.id)
            .field("settings", &self.settings.current())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<B: CompletionBackend> LlmProvider<B> {
    pub fn new(descriptor: ProviderDescriptor, backend: B, timeout: Duration) -> Self {
        Self {
            descriptor,
            backend,
            client: reqwest::Client::new(),
            settings: SettingsSlot::new(),
            timeout,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    async fn complete(&self, operation: &str, system: &str, turns: &[ChatTurn]) -> OperationResult<String> {
        let settings = self.settings.require(&self.descriptor)?;

        debug!(
            provider = %self.descriptor.id,
            operation,
            model = %settings.model,
            turns = turns.len(),
            "requesting completion"
        );

        let request = CompletionRequest {
            system,
            turns,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
            provider: &self.descriptor.id,
        };
        self.backend.complete(&self.client, &settings, &request).await
    }

    async fn ask(&self, operation: &str, prompt: &Prompt) -> OperationResult<String> {
        self.complete(operation, &prompt.system, &[ChatTurn::user(prompt.user.as_str())])
            .await
    }
}

impl<B: CompletionBackend> Provider for LlmProvider<B> {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn configure(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        self.settings
            .configure(config, &self.descriptor, self.backend.default_api_base())
    }

    fn is_available(&self) -> bool {
        self.settings.is_set()
    }
}

#[async_trait]
impl<B: CompletionBackend> GenerativeProvider for LlmProvider<B> {
    async fn fetch_scripture(
        &self,
        reference: &VerseReference,
        translation: &str,
        prompt: &Prompt,
    ) -> OperationResult<Vec<VerseText>> {
        let raw = self.ask("fetch_scripture", prompt).await?;
        let verses = normalize::parse_verses(&raw, reference)?;
        debug!(
            provider = %self.descriptor.id,
            reference = %reference,
            translation,
            verses = verses.len(),
            "scripture parsed"
        );
        Ok(verses)
    }

    async fn key_takeaway(&self, _verse_ref: &str, prompt: &Prompt) -> OperationResult<String> {
        let raw = self.ask("key_takeaway", prompt).await?;
        normalize::parse_takeaway(&raw)
    }

    async fn score(
        &self,
        verse_ref: &str,
        _user_comment: &str,
        prompt: &Prompt,
        feedback_prompt: &str,
    ) -> OperationResult<ScoreResult> {
        let raw = self.ask("score", prompt).await?;
        let mut result = normalize::parse_score(&raw)?;

        let turns = [
            ChatTurn::user(prompt.user.as_str()),
            ChatTurn::assistant(raw),
            ChatTurn::user(feedback_prompt),
        ];
        let feedback = self
            .complete("application_feedback", &prompt.system, &turns)
            .await
            .and_then(|reply| normalize::parse_feedback(&reply));

        match feedback {
            Ok(text) => result.application_feedback = text,
            Err(e) => warn!(
                provider = %self.descriptor.id,
                verse = verse_ref,
                error = %e,
                "application feedback unavailable"
            ),
        }
        Ok(result)
    }

    async fn validate_takeaway(&self, prompt: &Prompt) -> OperationResult<bool> {
        let raw = self.ask("validate_takeaway", prompt).await?;
        normalize::parse_validation(&raw)
    }

    async fn find_verses_by_description(
        &self,
        _description: &str,
        prompt: &Prompt,
    ) -> OperationResult<Vec<VerseReference>> {
        let raw = self.ask("find_verses_by_description", prompt).await?;
        normalize::parse_verse_references(&raw)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
