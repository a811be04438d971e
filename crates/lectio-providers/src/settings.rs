//! Validated provider settings and the slot that holds them.
//!
//! Every provider keeps its active settings in a [`SettingsSlot`]. Installing
//! new settings swaps one `Arc` under a lock, so a concurrent reader sees
//! either the old or the new settings, never a mix.

use std::sync::{Arc, PoisonError, RwLock};

use lectio_core::config::ProviderConfig;
use lectio_core::ProviderError;

use crate::traits::ProviderDescriptor;

/// Settings that passed validation and are ready to use for requests.
#[derive(Clone, PartialEq)]
pub struct ResolvedSettings {
    pub model: String,
    pub api_key: String,
    pub temperature: f64,
    /// Base URL without a trailing slash.
    pub api_base: String,
}

impl std::fmt::Debug for ResolvedSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSettings")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl ResolvedSettings {
    /// Validate a caller-supplied config against a provider's identity.
    ///
    /// Rules:
    /// - a disabled provider is rejected
    /// - the API key must be non-blank
    /// - temperature must lie within `0.0..=1.0`
    /// - an empty model name falls back to the descriptor's default model
    /// - an absent `api_base` falls back to `default_base`
    pub fn validate(
        config: &ProviderConfig,
        descriptor: &ProviderDescriptor,
        default_base: &str,
    ) -> Result<Self, ProviderError> {
        if !config.enabled {
            return Err(ProviderError::InvalidConfig(format!(
                "{} is disabled",
                descriptor.display_name
            )));
        }
        if !config.is_configured() {
            return Err(ProviderError::InvalidConfig(format!(
                "{} requires an API key",
                descriptor.display_name
            )));
        }
        if !(0.0..=1.0).contains(&config.temperature) {
            return Err(ProviderError::InvalidConfig(format!(
                "temperature {} is outside 0.0–1.0",
                config.temperature
            )));
        }

        let model = match config.model_name.trim() {
            "" => descriptor.default_model.clone(),
            name => name.to_string(),
        };
        let api_base = config
            .api_base
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(default_base)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            model,
            api_key: config.api_key.trim().to_string(),
            temperature: config.temperature,
            api_base,
        })
    }
}

/// Holds at most one active [`ResolvedSettings`].
#[derive(Default)]
pub struct SettingsSlot {
    inner: RwLock<Option<Arc<ResolvedSettings>>>,
}

impl SettingsSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and install; on failure the slot is cleared.
    pub fn configure(
        &self,
        config: &ProviderConfig,
        descriptor: &ProviderDescriptor,
        default_base: &str,
    ) -> Result<(), ProviderError> {
        let resolved = ResolvedSettings::validate(config, descriptor, default_base);
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match resolved {
            Ok(settings) => {
                *slot = Some(Arc::new(settings));
                Ok(())
            }
            Err(e) => {
                *slot = None;
                Err(e)
            }
        }
    }

    /// Snapshot of the active settings, if any.
    pub fn current(&self) -> Option<Arc<ResolvedSettings>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Active settings, or `NotConfigured` naming the provider.
    pub fn require(&self, descriptor: &ProviderDescriptor) -> Result<Arc<ResolvedSettings>, ProviderError> {
        self.current().ok_or_else(|| {
            ProviderError::NotConfigured(format!("{} is not configured", descriptor.display_name))
        })
    }

    pub fn is_set(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
