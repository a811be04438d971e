//! Configuration schema.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.
//! We use `#[serde(rename_all = "camelCase")]` to handle the conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.lectio/config.json` + env vars.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Per-provider settings keyed by provider id (`"esv"`, `"openai"`, …).
    pub providers: HashMap<String, ProviderConfig>,
    pub retry: RetryConfig,
    /// Translation requested when the caller does not name one.
    pub default_translation: String,
    /// Per-request HTTP timeout for generative backends.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            retry: RetryConfig::default(),
            default_translation: "ESV".to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl Config {
    /// Settings for one provider, if present.
    pub fn provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.get(id)
    }

    /// Mutable settings for one provider, inserting defaults if absent.
    pub fn provider_mut(&mut self, id: &str) -> &mut ProviderConfig {
        self.providers.entry(id.to_string()).or_default()
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Settings applied to a single provider through `configure()`.
///
/// `Debug` never prints the credential.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// Model identifier; empty means "use the provider's default model".
    pub model_name: String,
    /// API key or token for authentication.
    pub api_key: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f64,
    pub enabled: bool,
    /// Custom API base URL (overrides the provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model_name: String::new(),
            api_key: String::new(),
            temperature: 0.7,
            enabled: true,
            api_base: None,
        }
    }
}

impl ProviderConfig {
    /// Convenience constructor for an enabled provider with a key.
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Whether this provider has a non-blank API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("model_name", &self.model_name)
            .field(
                "api_key",
                &if self.api_key.is_empty() { "<empty>" } else { "<redacted>" },
            )
            .field("temperature", &self.temperature)
            .field("enabled", &self.enabled)
            .field("api_base", &self.api_base)
            .finish()
    }
}

// ─────────────────────────────────────────────
// Retry
// ─────────────────────────────────────────────

/// Retry/backoff settings applied to each provider call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_key() {
        let cfg = ProviderConfig::with_key("sk-secret-123");
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("sk-secret-123"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn test_blank_key_not_configured() {
        assert!(!ProviderConfig::with_key("   ").is_configured());
        assert!(ProviderConfig::with_key("k").is_configured());
    }

    #[test]
    fn test_provider_mut_inserts_default() {
        let mut config = Config::default();
        config.provider_mut("openai").api_key = "k".into();
        assert!(config.provider("openai").unwrap().enabled);
        assert_eq!(config.provider("openai").unwrap().temperature, 0.7);
    }
}
