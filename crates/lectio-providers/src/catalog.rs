//! Built-in provider catalog: static specs for every supported backend.
//!
//! Each [`ProviderSpec`] names a wire format, a default model and a priority.
//! [`build_registry`] turns the table into a ready [`ProviderRegistry`] with
//! every provider registered but none configured yet.

use std::sync::Arc;
use std::time::Duration;

use lectio_core::config::Config;

use crate::anthropic::{self, AnthropicMessages};
use crate::esv::{self, EsvProvider};
use crate::gemini::{self, GeminiGenerate};
use crate::generative::LlmProvider;
use crate::openai::{self, OpenAiChat};
use crate::registry::{ProviderRegistry, RegisteredProvider};
use crate::traits::{ProviderDescriptor, ServiceKind};

/// Per-request timeout for the scripture lookup backend.
pub const SCRIPTURE_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request timeout for generative backends unless configured otherwise.
pub const GENERATIVE_TIMEOUT: Duration = Duration::from_secs(15);

/// Wire format a spec is served by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Esv,
    OpenAiChat,
    AnthropicMessages,
    GeminiGenerate,
}

/// Static specification of one built-in provider.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    /// Config key and registry id (e.g. `"openrouter"`).
    pub id: &'static str,
    pub display_name: &'static str,
    pub backend: Backend,
    pub default_model: &'static str,
    /// Lower is tried first.
    pub priority: i32,
    pub default_api_base: &'static str,
    /// Env var conventionally holding the key, shown by `lectio status`.
    pub env_hint: &'static str,
}

pub static BUILTIN_PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        id: "esv",
        display_name: "ESV API",
        backend: Backend::Esv,
        default_model: "v3",
        priority: 0,
        default_api_base: esv::DEFAULT_API_BASE,
        env_hint: "LECTIO_PROVIDERS__ESV__API_KEY",
    },
    ProviderSpec {
        id: "anthropic",
        display_name: "Anthropic",
        backend: Backend::AnthropicMessages,
        default_model: "claude-3-5-haiku-latest",
        priority: 10,
        default_api_base: anthropic::DEFAULT_API_BASE,
        env_hint: "LECTIO_PROVIDERS__ANTHROPIC__API_KEY",
    },
    ProviderSpec {
        id: "openai",
        display_name: "OpenAI",
        backend: Backend::OpenAiChat,
        default_model: "gpt-4o-mini",
        priority: 20,
        default_api_base: openai::DEFAULT_API_BASE,
        env_hint: "LECTIO_PROVIDERS__OPENAI__API_KEY",
    },
    ProviderSpec {
        id: "gemini",
        display_name: "Google Gemini",
        backend: Backend::GeminiGenerate,
        default_model: "gemini-1.5-flash",
        priority: 30,
        default_api_base: gemini::DEFAULT_API_BASE,
        env_hint: "LECTIO_PROVIDERS__GEMINI__API_KEY",
    },
    // Gateway speaking the OpenAI dialect.
    ProviderSpec {
        id: "openrouter",
        display_name: "OpenRouter",
        backend: Backend::OpenAiChat,
        default_model: "openai/gpt-4o-mini",
        priority: 40,
        default_api_base: "https://openrouter.ai/api/v1",
        env_hint: "LECTIO_PROVIDERS__OPENROUTER__API_KEY",
    },
];

impl ProviderSpec {
    pub fn kind(&self) -> ServiceKind {
        match self.backend {
            Backend::Esv => ServiceKind::ScriptureLookup,
            _ => ServiceKind::Generative,
        }
    }

    pub fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor::new(
            self.id,
            self.display_name,
            self.kind(),
            self.default_model,
            self.priority,
        )
    }

    /// Build an unconfigured provider. `generative_timeout` applies to
    /// completion backends only.
    pub fn instantiate(&self, generative_timeout: Duration) -> RegisteredProvider {
        let descriptor = self.descriptor();
        let base = self.default_api_base;
        match self.backend {
            Backend::Esv => {
                RegisteredProvider::Scripture(Arc::new(EsvProvider::new(descriptor, SCRIPTURE_TIMEOUT)))
            }
            Backend::OpenAiChat => RegisteredProvider::Generative(Arc::new(LlmProvider::new(
                descriptor,
                OpenAiChat::new(base),
                generative_timeout,
            ))),
            Backend::AnthropicMessages => RegisteredProvider::Generative(Arc::new(LlmProvider::new(
                descriptor,
                AnthropicMessages::new(base),
                generative_timeout,
            ))),
            Backend::GeminiGenerate => RegisteredProvider::Generative(Arc::new(LlmProvider::new(
                descriptor,
                GeminiGenerate::new(base),
                generative_timeout,
            ))),
        }
    }
}

/// Find a built-in spec by id.
pub fn find_by_id(id: &str) -> Option<&'static ProviderSpec> {
    BUILTIN_PROVIDERS.iter().find(|s| s.id == id)
}

/// Registry holding every built-in provider, none configured.
pub fn build_registry(config: &Config) -> ProviderRegistry {
    let timeout = match config.request_timeout_secs {
        0 => GENERATIVE_TIMEOUT,
        secs => Duration::from_secs(secs),
    };
    let registry = ProviderRegistry::new();
    for spec in BUILTIN_PROVIDERS {
        registry.register(spec.instantiate(timeout));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Provider;
    use lectio_core::config::ProviderConfig;
    use std::collections::HashSet;

    #[test]
    fn test_unique_ids() {
        let ids: HashSet<_> = BUILTIN_PROVIDERS.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), BUILTIN_PROVIDERS.len());
    }

    #[test]
    fn test_find_by_id() {
        let spec = find_by_id("openrouter").unwrap();
        assert_eq!(spec.backend, Backend::OpenAiChat);
        assert_eq!(spec.kind(), ServiceKind::Generative);
        assert_eq!(find_by_id("esv").unwrap().kind(), ServiceKind::ScriptureLookup);
        assert!(find_by_id("cohere").is_none());
    }

    #[test]
    fn test_build_registry_order() {
        let registry = build_registry(&Config::default());
        let ids: Vec<_> = registry
            .all_ordered()
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(ids, ["esv", "anthropic", "openai", "gemini", "openrouter"]);
        assert!(registry.generative_providers().is_empty());
    }

    #[test]
    fn test_build_registry_configure() {
        let registry = build_registry(&Config::default());
        let mut config = Config::default();
        config.providers.insert("esv".into(), ProviderConfig::with_key("tok"));
        config.providers.insert("gemini".into(), ProviderConfig::with_key("g"));

        let outcome = registry.configure_all(&config.providers);
        assert_eq!(outcome.configured, ["esv", "gemini"]);
        assert_eq!(registry.scripture_providers().len(), 1);
        assert_eq!(registry.generative_providers()[0].id(), "gemini");
    }
}
