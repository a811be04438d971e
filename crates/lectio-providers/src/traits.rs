//! Provider capability traits: the seams the service and registry work against.
//!
//! Two capability sets exist:
//! - [`ScriptureProvider`]: pure text lookup against a scripture service
//! - [`GenerativeProvider`]: scripture, takeaways, scores, validation and
//!   verse search answered by a text-completion model
//!
//! Both extend [`Provider`], which carries identity and configuration.

use async_trait::async_trait;
use lectio_core::config::ProviderConfig;
use lectio_core::{OperationResult, Prompt, ProviderError, ScoreResult, VerseReference, VerseText};

/// Which capability set a provider implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    ScriptureLookup,
    Generative,
}

/// Immutable identity of a provider implementation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderDescriptor {
    /// Unique id, also the key in the configuration map (e.g. `"openai"`).
    pub id: String,
    /// Human-readable name for logs and error messages.
    pub display_name: String,
    pub kind: ServiceKind,
    /// Model used when the config leaves `model_name` empty.
    pub default_model: String,
    /// Lower is tried first.
    pub priority: i32,
}

impl ProviderDescriptor {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: ServiceKind,
        default_model: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind,
            default_model: default_model.into(),
            priority,
        }
    }
}

/// Identity and configuration shared by every provider.
pub trait Provider: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    /// Validate and install `config`, replacing any previous one atomically.
    ///
    /// On failure the provider becomes unavailable and the error carries the
    /// diagnostic.
    fn configure(&self, config: &ProviderConfig) -> Result<(), ProviderError>;

    /// Whether the last `configure()` succeeded. No I/O.
    fn is_available(&self) -> bool;

    fn id(&self) -> &str {
        &self.descriptor().id
    }

    fn display_name(&self) -> &str {
        &self.descriptor().display_name
    }

    fn priority(&self) -> i32 {
        self.descriptor().priority
    }
}

/// A dedicated scripture-text lookup service.
#[async_trait]
pub trait ScriptureProvider: Provider {
    /// Translation codes this backend can serve (e.g. `["ESV"]`).
    fn supported_translations(&self) -> &[&'static str];

    fn supports_translation(&self, translation: &str) -> bool {
        self.supported_translations()
            .iter()
            .any(|t| t.eq_ignore_ascii_case(translation))
    }

    async fn fetch_scripture(&self, reference: &VerseReference) -> OperationResult<Vec<VerseText>>;
}

/// A general-purpose text-completion backend.
///
/// Prompts are supplied by the caller so every backend is asked the same
/// question; implementations only own transport and parsing.
#[async_trait]
pub trait GenerativeProvider: Provider {
    async fn fetch_scripture(
        &self,
        reference: &VerseReference,
        translation: &str,
        prompt: &Prompt,
    ) -> OperationResult<Vec<VerseText>>;

    async fn key_takeaway(&self, verse_ref: &str, prompt: &Prompt) -> OperationResult<String>;

    /// Score a user's comment, then ask for application feedback with
    /// `feedback_prompt` as a second user turn.
    async fn score(
        &self,
        verse_ref: &str,
        user_comment: &str,
        prompt: &Prompt,
        feedback_prompt: &str,
    ) -> OperationResult<ScoreResult>;

    async fn validate_takeaway(&self, prompt: &Prompt) -> OperationResult<bool>;

    async fn find_verses_by_description(
        &self,
        description: &str,
        prompt: &Prompt,
    ) -> OperationResult<Vec<VerseReference>>;
}
