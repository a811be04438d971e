//! Provider registry: ranks, filters, and configures registered providers.
//!
//! The provider list sits behind one `RwLock` held only long enough to clone
//! `Arc`s. Configuration happens on each provider's own lock, so configuring
//! one provider never blocks readers or other providers.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use lectio_core::config::ProviderConfig;
use lectio_core::ProviderError;

use crate::traits::{GenerativeProvider, ProviderDescriptor, ScriptureProvider, ServiceKind};

// ─────────────────────────────────────────────
// RegisteredProvider
// ─────────────────────────────────────────────

/// A provider as held by the registry, tagged with its capability set.
#[derive(Clone)]
pub enum RegisteredProvider {
    Scripture(Arc<dyn ScriptureProvider>),
    Generative(Arc<dyn GenerativeProvider>),
}

impl std::fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("id", &self.descriptor().id)
            .field("kind", &self.kind())
            .field("available", &self.is_available())
            .finish()
    }
}

impl RegisteredProvider {
    pub fn descriptor(&self) -> &ProviderDescriptor {
        match self {
            Self::Scripture(p) => p.descriptor(),
            Self::Generative(p) => p.descriptor(),
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor().id
    }

    pub fn kind(&self) -> ServiceKind {
        match self {
            Self::Scripture(_) => ServiceKind::ScriptureLookup,
            Self::Generative(_) => ServiceKind::Generative,
        }
    }

    pub fn is_available(&self) -> bool {
        match self {
            Self::Scripture(p) => p.is_available(),
            Self::Generative(p) => p.is_available(),
        }
    }

    pub fn configure(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        match self {
            Self::Scripture(p) => p.configure(config),
            Self::Generative(p) => p.configure(config),
        }
    }
}

impl From<Arc<dyn ScriptureProvider>> for RegisteredProvider {
    fn from(p: Arc<dyn ScriptureProvider>) -> Self {
        Self::Scripture(p)
    }
}

impl From<Arc<dyn GenerativeProvider>> for RegisteredProvider {
    fn from(p: Arc<dyn GenerativeProvider>) -> Self {
        Self::Generative(p)
    }
}

// ─────────────────────────────────────────────
// ConfigurationOutcome
// ─────────────────────────────────────────────

/// Result of [`ProviderRegistry::configure_all`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigurationOutcome {
    /// Ids that accepted their configuration, in id order.
    pub configured: Vec<String>,
    /// `(id, message)` for each rejected or unknown id, in id order.
    pub errors: Vec<(String, String)>,
    pub any_succeeded: bool,
}

// ─────────────────────────────────────────────
// ProviderRegistry
// ─────────────────────────────────────────────

/// Registry of providers keyed by id.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<RegisteredProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider. An existing provider with the same id is replaced in
    /// place, keeping its tie-break position.
    pub fn register(&self, provider: impl Into<RegisteredProvider>) {
        let provider = provider.into();
        let mut list = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        match list.iter_mut().find(|p| p.id() == provider.id()) {
            Some(slot) => {
                debug!(provider = provider.id(), "replacing registered provider");
                *slot = provider;
            }
            None => {
                debug!(provider = provider.id(), kind = ?provider.kind(), "registering provider");
                list.push(provider);
            }
        }
    }

    /// Remove a provider by id. Returns whether one was removed.
    pub fn unregister(&self, id: &str) -> bool {
        let mut list = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        let before = list.len();
        list.retain(|p| p.id() != id);
        list.len() != before
    }

    pub fn get(&self, id: &str) -> Option<RegisteredProvider> {
        self.snapshot().into_iter().find(|p| p.id() == id)
    }

    pub fn len(&self) -> usize {
        self.providers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<RegisteredProvider> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every provider in ascending priority, ties in registration order.
    pub fn all_ordered(&self) -> Vec<RegisteredProvider> {
        let mut list = self.snapshot();
        list.sort_by_key(|p| p.descriptor().priority);
        list
    }

    /// Providers of `kind` in ascending priority, ties in registration order.
    pub fn ordered_providers(&self, kind: ServiceKind) -> Vec<RegisteredProvider> {
        self.all_ordered()
            .into_iter()
            .filter(|p| p.kind() == kind)
            .collect()
    }

    /// [`Self::ordered_providers`] restricted to available providers.
    pub fn ordered_available_providers(&self, kind: ServiceKind) -> Vec<RegisteredProvider> {
        self.ordered_providers(kind)
            .into_iter()
            .filter(RegisteredProvider::is_available)
            .collect()
    }

    /// Available scripture lookup providers, best first.
    pub fn scripture_providers(&self) -> Vec<Arc<dyn ScriptureProvider>> {
        self.ordered_available_providers(ServiceKind::ScriptureLookup)
            .into_iter()
            .filter_map(|p| match p {
                RegisteredProvider::Scripture(s) => Some(s),
                RegisteredProvider::Generative(_) => None,
            })
            .collect()
    }

    /// Available generative providers, best first.
    pub fn generative_providers(&self) -> Vec<Arc<dyn GenerativeProvider>> {
        self.ordered_available_providers(ServiceKind::Generative)
            .into_iter()
            .filter_map(|p| match p {
                RegisteredProvider::Generative(g) => Some(g),
                RegisteredProvider::Scripture(_) => None,
            })
            .collect()
    }

    /// Configure every listed provider. Each id gets an attempt regardless
    /// of earlier failures; providers not listed are left untouched.
    pub fn configure_all(&self, configs: &HashMap<String, ProviderConfig>) -> ConfigurationOutcome {
        let providers = self.snapshot();
        let mut ids: Vec<&String> = configs.keys().collect();
        ids.sort();

        let mut outcome = ConfigurationOutcome::default();
        for id in ids {
            let Some(provider) = providers.iter().find(|p| p.id() == id.as_str()) else {
                warn!(provider = %id, "configuration for unknown provider");
                outcome
                    .errors
                    .push((id.clone(), format!("unknown provider '{id}'")));
                continue;
            };

            match provider.configure(&configs[id]) {
                Ok(()) => {
                    debug!(provider = %id, "provider configured");
                    outcome.configured.push(id.clone());
                }
                Err(e) => {
                    info!(provider = %id, error = %e, "provider rejected configuration");
                    outcome.errors.push((id.clone(), e.to_string()));
                }
            }
        }

        outcome.any_succeeded = !outcome.configured.is_empty();
        info!(
            configured = outcome.configured.len(),
            failed = outcome.errors.len(),
            "providers configured"
        );
        outcome
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
