//! Scripture service: the façade applications call.
//!
//! Each operation walks the relevant providers in priority order, runs every
//! call through the retry engine, returns the first success, and otherwise
//! reports an aggregate `AllProvidersFailed` error. Providers are tried one
//! at a time; dropping an operation's future cancels the call in flight.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use lectio_core::config::{Config, ProviderConfig};
use lectio_core::{
    OperationResult, ProviderError, ProviderFailure, ScoreResult, VerseReference, VerseText,
};
use lectio_providers::{
    build_registry, with_retry, ConfigurationOutcome, GenerativeProvider, Provider,
    ProviderRegistry, RetryPolicy, ScriptureProvider,
};

use crate::prompts;

// ─────────────────────────────────────────────
// State
// ─────────────────────────────────────────────

/// Lifecycle of a [`ScriptureService`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceState {
    /// `configure()` has never run.
    Unconfigured,
    /// The first `configure()` is in progress.
    Configuring,
    /// At least one provider accepted its configuration.
    Ready,
    /// The last `configure()` left no provider usable.
    Degraded,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unconfigured => "unconfigured",
            Self::Configuring => "configuring",
            Self::Ready => "ready",
            Self::Degraded => "degraded",
        };
        f.write_str(s)
    }
}

/// The last configuration outcome and when it was recorded.
#[derive(Clone, Debug)]
pub struct ConfigurationSnapshot {
    pub outcome: ConfigurationOutcome,
    pub taken_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────
// ScriptureService
// ─────────────────────────────────────────────

pub struct ScriptureService {
    registry: Arc<ProviderRegistry>,
    retry: RetryPolicy,
    state: RwLock<ServiceState>,
    last_configuration: RwLock<Option<ConfigurationSnapshot>>,
}

impl std::fmt::Debug for ScriptureService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptureService")
            .field("state", &self.state())
            .field("providers", &self.registry.len())
            .field("retry", &self.retry)
            .finish()
    }
}

impl ScriptureService {
    pub fn new(registry: Arc<ProviderRegistry>, retry: RetryPolicy) -> Self {
        Self {
            registry,
            retry,
            state: RwLock::new(ServiceState::Unconfigured),
            last_configuration: RwLock::new(None),
        }
    }

    /// Service over the built-in providers, configured from `config`.
    pub fn from_config(config: &Config) -> Self {
        let service = Self::new(
            Arc::new(build_registry(config)),
            RetryPolicy::from(&config.retry),
        );
        service.configure(&config.providers);
        service
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Configure every listed provider and move to `Ready` or `Degraded`.
    ///
    /// Reconfiguring keeps the previous state, so operations started while
    /// the new settings are applied are still served; each provider swaps its
    /// own settings atomically.
    pub fn configure(&self, configs: &HashMap<String, ProviderConfig>) -> ConfigurationOutcome {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if *state == ServiceState::Unconfigured {
                *state = ServiceState::Configuring;
            }
        }

        let outcome = self.registry.configure_all(configs);
        let next = if outcome.any_succeeded {
            ServiceState::Ready
        } else {
            ServiceState::Degraded
        };

        info!(
            state = %next,
            configured = ?outcome.configured,
            rejected = outcome.errors.len(),
            "scripture service configured"
        );

        *self
            .last_configuration
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(ConfigurationSnapshot {
            outcome: outcome.clone(),
            taken_at: Utc::now(),
        });
        self.set_state(next);
        outcome
    }

    pub fn state(&self) -> ServiceState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ServiceState::Ready
    }

    pub fn last_configuration(&self) -> Option<ConfigurationSnapshot> {
        self.last_configuration
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: ServiceState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn ensure_ready(&self, operation: &str) -> OperationResult<()> {
        match self.state() {
            ServiceState::Ready => Ok(()),
            state => {
                debug!(operation, state = %state, "rejecting call");
                Err(not_configured(operation))
            }
        }
    }

    // ────────────── Operations ──────────────

    /// Verse text for `reference`, preferring a dedicated scripture service
    /// that serves `translation`, then generative providers.
    pub async fn fetch_scripture(
        &self,
        reference: &VerseReference,
        translation: &str,
    ) -> OperationResult<Vec<VerseText>> {
        const OPERATION: &str = "fetch_scripture";
        self.ensure_ready(OPERATION)?;

        let lookups: Vec<_> = self
            .registry
            .scripture_providers()
            .into_iter()
            .filter(|p| p.supports_translation(translation))
            .collect();
        let models = self.registry.generative_providers();
        if lookups.is_empty() && models.is_empty() {
            return Err(not_configured(OPERATION));
        }

        let mut failures = Vec::new();
        if let Some(verses) = self
            .try_in_order(OPERATION, &lookups, &mut failures, |p: Arc<dyn ScriptureProvider>| async move {
                p.fetch_scripture(reference).await
            })
            .await
        {
            return Ok(verses);
        }

        let prompt = prompts::scripture(reference, translation);
        let prompt = &prompt;
        if let Some(verses) = self
            .try_in_order(OPERATION, &models, &mut failures, |p: Arc<dyn GenerativeProvider>| async move {
                p.fetch_scripture(reference, translation, prompt).await
            })
            .await
        {
            return Ok(verses);
        }

        Err(all_failed(OPERATION, failures))
    }

    /// Short takeaway for the passage at `reference`.
    pub async fn key_takeaway(&self, reference: &VerseReference) -> OperationResult<String> {
        let verse_ref = reference.to_string();
        let prompt = prompts::key_takeaway(&verse_ref);
        let (verse_ref, prompt) = (verse_ref.as_str(), &prompt);
        self.generate("key_takeaway", |p| async move { p.key_takeaway(verse_ref, prompt).await })
            .await
    }

    /// Score `user_comment` against `reference`, with application feedback.
    pub async fn ai_score(
        &self,
        reference: &VerseReference,
        user_comment: &str,
    ) -> OperationResult<ScoreResult> {
        let verse_ref = reference.to_string();
        let prompt = prompts::score(&verse_ref, user_comment);
        let (verse_ref, prompt) = (verse_ref.as_str(), &prompt);
        let feedback = prompts::application_feedback();
        self.generate("ai_score", |p| async move {
            p.score(verse_ref, user_comment, prompt, feedback).await
        })
        .await
    }

    /// Whether `takeaway` faithfully summarizes `reference`.
    pub async fn validate_takeaway(
        &self,
        reference: &VerseReference,
        takeaway: &str,
    ) -> OperationResult<bool> {
        let prompt = prompts::validate_takeaway(&reference.to_string(), takeaway);
        let prompt = &prompt;
        self.generate("validate_takeaway", |p| async move { p.validate_takeaway(prompt).await })
            .await
    }

    /// References matching a free-text description.
    pub async fn find_verses_by_description(
        &self,
        description: &str,
    ) -> OperationResult<Vec<VerseReference>> {
        let prompt = prompts::find_verses(description);
        let prompt = &prompt;
        self.generate("find_verses_by_description", |p| async move {
            p.find_verses_by_description(description, prompt).await
        })
        .await
    }

    // ────────────── Fallback chain ──────────────

    /// Run a generative-only operation across available generative providers.
    async fn generate<T, F, Fut>(&self, operation: &'static str, call: F) -> OperationResult<T>
    where
        F: FnMut(Arc<dyn GenerativeProvider>) -> Fut,
        Fut: Future<Output = OperationResult<T>>,
    {
        self.ensure_ready(operation)?;

        let models = self.registry.generative_providers();
        if models.is_empty() {
            return Err(not_configured(operation));
        }

        let mut failures = Vec::new();
        match self.try_in_order(operation, &models, &mut failures, call).await {
            Some(value) => Ok(value),
            None => Err(all_failed(operation, failures)),
        }
    }

    /// Try each provider in turn with retries. Returns the first success and
    /// appends one [`ProviderFailure`] per provider that failed.
    async fn try_in_order<P, T, F, Fut>(
        &self,
        operation: &'static str,
        providers: &[Arc<P>],
        failures: &mut Vec<ProviderFailure>,
        mut call: F,
    ) -> Option<T>
    where
        P: Provider + ?Sized,
        F: FnMut(Arc<P>) -> Fut,
        Fut: Future<Output = OperationResult<T>>,
    {
        for provider in providers {
            let label = format!("{}/{}", provider.id(), operation);
            let result = with_retry(&self.retry, &label, || call(Arc::clone(provider))).await;

            match result {
                Ok(value) => {
                    info!(provider = provider.id(), operation, outcome = "success", "provider call");
                    return Some(value);
                }
                Err(e) => {
                    warn!(
                        provider = provider.id(),
                        operation,
                        outcome = "failure",
                        kind = e.kind(),
                        error = %e,
                        "provider call"
                    );
                    if e.is_quota_related() {
                        warn!(
                            provider = provider.id(),
                            "provider reports quota or rate limiting; check the account's usage limits"
                        );
                    }
                    failures.push(ProviderFailure {
                        provider: provider.display_name().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        None
    }
}

fn not_configured(operation: &str) -> ProviderError {
    ProviderError::NotConfigured(format!("no provider is available for {operation}"))
}

fn all_failed(operation: &str, failures: Vec<ProviderFailure>) -> ProviderError {
    ProviderError::AllProvidersFailed {
        operation: operation.to_string(),
        attempted: failures.len(),
        failures,
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lectio_core::Prompt;
    use lectio_providers::settings::SettingsSlot;
    use lectio_providers::{ProviderDescriptor, ServiceKind};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{mpsc, Mutex};
    use std::time::Duration;

    // ── Fakes ──

    /// Scripted responses, consumed one per call; the last one repeats.
    struct Script<T> {
        replies: Mutex<Vec<OperationResult<T>>>,
        calls: AtomicU32,
    }

    impl<T: Clone> Script<T> {
        fn new(replies: Vec<OperationResult<T>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicU32::new(0),
            }
        }

        fn next(&self) -> OperationResult<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.remove(0)
            } else {
                replies[0].clone()
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    struct FakeLookup {
        descriptor: ProviderDescriptor,
        settings: SettingsSlot,
        verses: Script<Vec<VerseText>>,
    }

    impl FakeLookup {
        fn new(id: &str, priority: i32, verses: Vec<OperationResult<Vec<VerseText>>>) -> Arc<Self> {
            Arc::new(Self {
                descriptor: ProviderDescriptor::new(id, format!("{id} lookup"), ServiceKind::ScriptureLookup, "v1", priority),
                settings: SettingsSlot::new(),
                verses: Script::new(verses),
            })
        }
    }

    impl Provider for FakeLookup {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }
        fn configure(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
            self.settings.configure(config, &self.descriptor, "http://fake")
        }
        fn is_available(&self) -> bool {
            self.settings.is_set()
        }
    }

    #[async_trait]
    impl ScriptureProvider for FakeLookup {
        fn supported_translations(&self) -> &[&'static str] {
            &["ESV"]
        }
        async fn fetch_scripture(&self, _r: &VerseReference) -> OperationResult<Vec<VerseText>> {
            self.verses.next()
        }
    }

    struct FakeModel {
        descriptor: ProviderDescriptor,
        settings: SettingsSlot,
        text: Script<String>,
        verses: Script<Vec<VerseText>>,
    }

    impl FakeModel {
        fn new(id: &str, priority: i32, text: Vec<OperationResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                descriptor: ProviderDescriptor::new(id, id.to_uppercase(), ServiceKind::Generative, "m", priority),
                settings: SettingsSlot::new(),
                text: Script::new(text),
                verses: Script::new(vec![Ok(vec![VerseText::new(16, "For God so loved the world")])]),
            })
        }
    }

    impl Provider for FakeModel {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }
        fn configure(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
            self.settings.configure(config, &self.descriptor, "http://fake")
        }
        fn is_available(&self) -> bool {
            self.settings.is_set()
        }
    }

    #[async_trait]
    impl GenerativeProvider for FakeModel {
        async fn fetch_scripture(
            &self,
            _r: &VerseReference,
            _t: &str,
            _p: &Prompt,
        ) -> OperationResult<Vec<VerseText>> {
            self.verses.next()
        }
        async fn key_takeaway(&self, _v: &str, _p: &Prompt) -> OperationResult<String> {
            self.text.next()
        }
        async fn score(&self, _v: &str, _c: &str, _p: &Prompt, _f: &str) -> OperationResult<ScoreResult> {
            self.text.next().map(|t| ScoreResult::new(70, t))
        }
        async fn validate_takeaway(&self, _p: &Prompt) -> OperationResult<bool> {
            self.text.next().map(|t| t == "valid")
        }
        async fn find_verses_by_description(
            &self,
            _d: &str,
            _p: &Prompt,
        ) -> OperationResult<Vec<VerseReference>> {
            self.text.next().and_then(|t| t.parse().map(|r| vec![r]))
        }
    }

    /// Lookup whose next `configure()` signals `entered`, then blocks until
    /// `release` fires.
    struct GatedLookup {
        descriptor: ProviderDescriptor,
        settings: SettingsSlot,
        gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
    }

    impl GatedLookup {
        fn new(id: &str, priority: i32) -> Arc<Self> {
            Arc::new(Self {
                descriptor: ProviderDescriptor::new(id, id, ServiceKind::ScriptureLookup, "v1", priority),
                settings: SettingsSlot::new(),
                gate: Mutex::new(None),
            })
        }

        /// Returns (entered, release).
        fn arm(&self) -> (mpsc::Receiver<()>, mpsc::Sender<()>) {
            let (entered_tx, entered_rx) = mpsc::channel();
            let (release_tx, release_rx) = mpsc::channel();
            *self.gate.lock().unwrap() = Some((entered_tx, release_rx));
            (entered_rx, release_tx)
        }
    }

    impl Provider for GatedLookup {
        fn descriptor(&self) -> &ProviderDescriptor {
            &self.descriptor
        }
        fn configure(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
            let gate = self.gate.lock().unwrap().take();
            if let Some((entered, release)) = gate {
                entered.send(()).unwrap();
                release.recv().unwrap();
            }
            self.settings.configure(config, &self.descriptor, "http://fake")
        }
        fn is_available(&self) -> bool {
            self.settings.is_set()
        }
    }

    #[async_trait]
    impl ScriptureProvider for GatedLookup {
        fn supported_translations(&self) -> &[&'static str] {
            &["ESV"]
        }
        async fn fetch_scripture(&self, _r: &VerseReference) -> OperationResult<Vec<VerseText>> {
            Ok(Vec::new())
        }
    }

    fn gated_service(model: &Arc<FakeModel>, gated: &Arc<GatedLookup>) -> Arc<ScriptureService> {
        let registry = ProviderRegistry::new();
        registry.register(Arc::clone(model) as Arc<dyn GenerativeProvider>);
        registry.register(Arc::clone(gated) as Arc<dyn ScriptureProvider>);
        Arc::new(ScriptureService::new(Arc::new(registry), fast_retry()))
    }

    fn keys_for(ids: &[&str]) -> HashMap<String, ProviderConfig> {
        ids.iter()
            .map(|id| (id.to_string(), ProviderConfig::with_key("key")))
            .collect()
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn john_3_16() -> VerseReference {
        VerseReference::single("John", 3, 16).unwrap()
    }

    /// Register the given providers and configure every one with a key.
    fn service(lookups: &[Arc<FakeLookup>], models: &[Arc<FakeModel>]) -> ScriptureService {
        let registry = ProviderRegistry::new();
        let mut configs = HashMap::new();
        for l in lookups {
            registry.register(Arc::clone(l) as Arc<dyn ScriptureProvider>);
            configs.insert(l.descriptor.id.clone(), ProviderConfig::with_key("key"));
        }
        for m in models {
            registry.register(Arc::clone(m) as Arc<dyn GenerativeProvider>);
            configs.insert(m.descriptor.id.clone(), ProviderConfig::with_key("key"));
        }
        let service = ScriptureService::new(Arc::new(registry), fast_retry());
        service.configure(&configs);
        service
    }

    // ── State machine ──

    #[tokio::test]
    async fn test_first_configure_reports_configuring() {
        let model = FakeModel::new("a", 10, vec![Ok("x".into())]);
        let gated = GatedLookup::new("slow", 0);
        let service = gated_service(&model, &gated);
        let (entered, release) = gated.arm();

        let worker = {
            let service = Arc::clone(&service);
            std::thread::spawn(move || service.configure(&keys_for(&["a", "slow"])))
        };
        entered.recv().unwrap();
        assert_eq!(service.state(), ServiceState::Configuring);
        let err = service.key_takeaway(&john_3_16()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));

        release.send(()).unwrap();
        assert!(worker.join().unwrap().any_succeeded);
        assert_eq!(service.state(), ServiceState::Ready);
    }

    #[tokio::test]
    async fn test_reconfigure_keeps_serving_operations() {
        let model = FakeModel::new("a", 10, vec![Ok("grace is free".into())]);
        let gated = GatedLookup::new("slow", 0);
        let service = gated_service(&model, &gated);
        service.configure(&keys_for(&["a", "slow"]));
        assert!(service.is_ready());

        let (entered, release) = gated.arm();
        let worker = {
            let service = Arc::clone(&service);
            std::thread::spawn(move || service.configure(&keys_for(&["a", "slow"])))
        };
        entered.recv().unwrap();

        assert_eq!(service.state(), ServiceState::Ready);
        let takeaway = service.key_takeaway(&john_3_16()).await.unwrap();
        assert_eq!(takeaway, "grace is free");

        release.send(()).unwrap();
        assert!(worker.join().unwrap().any_succeeded);
        assert_eq!(service.state(), ServiceState::Ready);
        assert_eq!(model.text.calls(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_rejects_everything_without_calls() {
        let model = FakeModel::new("a", 10, vec![Ok("x".into())]);
        let registry = ProviderRegistry::new();
        registry.register(Arc::clone(&model) as Arc<dyn GenerativeProvider>);
        let service = ScriptureService::new(Arc::new(registry), fast_retry());
        assert_eq!(service.state(), ServiceState::Unconfigured);

        let r = john_3_16();
        let errors = [
            service.fetch_scripture(&r, "ESV").await.unwrap_err(),
            service.key_takeaway(&r).await.unwrap_err(),
            service.ai_score(&r, "c").await.unwrap_err(),
            service.validate_takeaway(&r, "t").await.unwrap_err(),
            service.find_verses_by_description("d").await.unwrap_err(),
        ];
        for e in errors {
            assert!(matches!(e, ProviderError::NotConfigured(_)));
            assert!(e.to_string().contains("not configured"));
        }
        assert_eq!(model.text.calls(), 0);
        assert_eq!(model.verses.calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_configured_providers_is_degraded() {
        let model = FakeModel::new("a", 10, vec![Ok("x".into())]);
        let registry = ProviderRegistry::new();
        registry.register(Arc::clone(&model) as Arc<dyn GenerativeProvider>);
        let service = ScriptureService::new(Arc::new(registry), fast_retry());

        let outcome = service.configure(&HashMap::from([(
            "a".to_string(),
            ProviderConfig::with_key(""),
        )]));
        assert!(!outcome.any_succeeded);
        assert_eq!(service.state(), ServiceState::Degraded);
        assert!(!service.is_ready());

        let err = service.key_takeaway(&john_3_16()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
        assert_eq!(model.text.calls(), 0);

        let snapshot = service.last_configuration().unwrap();
        assert_eq!(snapshot.outcome.errors.len(), 1);
        assert!(snapshot.taken_at <= Utc::now());
    }

    #[tokio::test]
    async fn test_ready_after_partial_configuration() {
        let a = FakeModel::new("a", 10, vec![Ok("x".into())]);
        let b = FakeModel::new("b", 20, vec![Ok("y".into())]);
        let registry = ProviderRegistry::new();
        registry.register(Arc::clone(&a) as Arc<dyn GenerativeProvider>);
        registry.register(Arc::clone(&b) as Arc<dyn GenerativeProvider>);
        let service = ScriptureService::new(Arc::new(registry), fast_retry());

        service.configure(&HashMap::from([
            ("a".to_string(), ProviderConfig::with_key("")),
            ("b".to_string(), ProviderConfig::with_key("k")),
        ]));
        assert!(service.is_ready());
        assert_eq!(service.key_takeaway(&john_3_16()).await.unwrap(), "y");
        assert_eq!(a.text.calls(), 0);
    }

    // ── Fallback ──

    #[tokio::test]
    async fn test_highest_priority_success_short_circuits() {
        let first = FakeModel::new("first", 10, vec![Ok("from first".into())]);
        let second = FakeModel::new("second", 20, vec![Ok("from second".into())]);
        let service = service(&[], &[Arc::clone(&second), Arc::clone(&first)]);

        let takeaway = service.key_takeaway(&john_3_16()).await.unwrap();
        assert_eq!(takeaway, "from first");
        assert_eq!(first.text.calls(), 1);
        assert_eq!(second.text.calls(), 0);
    }

    #[tokio::test]
    async fn test_rate_limited_twice_then_success_no_fallback() {
        let first = FakeModel::new(
            "first",
            10,
            vec![
                Err(ProviderError::RateLimited("429".into())),
                Err(ProviderError::RateLimited("429".into())),
                Ok("valid".into()),
            ],
        );
        let second = FakeModel::new("second", 20, vec![Ok("valid".into())]);
        let service = service(&[], &[Arc::clone(&first), Arc::clone(&second)]);

        assert!(service.validate_takeaway(&john_3_16(), "t").await.unwrap());
        assert_eq!(first.text.calls(), 3);
        assert_eq!(second.text.calls(), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_single_attempt_then_next_provider() {
        let first = FakeModel::new("first", 10, vec![Err(ProviderError::Unauthorized("bad key".into()))]);
        let second = FakeModel::new("second", 20, vec![Ok("good explanation".into())]);
        let service = service(&[], &[Arc::clone(&first), Arc::clone(&second)]);

        let score = service.ai_score(&john_3_16(), "my comment").await.unwrap();
        assert_eq!(score.context_explanation, "good explanation");
        assert_eq!(first.text.calls(), 1);
        assert_eq!(second.text.calls(), 1);
    }

    #[tokio::test]
    async fn test_scripture_lookup_failure_falls_through_to_generative() {
        let esv = FakeLookup::new("esv", 0, vec![Err(ProviderError::Api {
            status: 500,
            message: "internal".into(),
        })]);
        let model = FakeModel::new("openai", 20, vec![Ok(String::new())]);
        let service = service(&[Arc::clone(&esv)], &[Arc::clone(&model)]);

        let verses = service.fetch_scripture(&john_3_16(), "ESV").await.unwrap();
        assert_eq!(verses, vec![VerseText::new(16, "For God so loved the world")]);
        assert_eq!(esv.verses.calls(), 1);
        assert_eq!(model.verses.calls(), 1);
    }

    #[tokio::test]
    async fn test_scripture_lookup_skipped_for_unsupported_translation() {
        let esv = FakeLookup::new("esv", 0, vec![Ok(vec![VerseText::new(16, "esv text")])]);
        let model = FakeModel::new("openai", 20, vec![Ok(String::new())]);
        let service = service(&[Arc::clone(&esv)], &[Arc::clone(&model)]);

        let verses = service.fetch_scripture(&john_3_16(), "KJV").await.unwrap();
        assert_eq!(verses[0].text, "For God so loved the world");
        assert_eq!(esv.verses.calls(), 0);

        let verses = service.fetch_scripture(&john_3_16(), "esv").await.unwrap();
        assert_eq!(verses[0].text, "esv text");
        assert_eq!(model.verses.calls(), 1);
    }

    #[tokio::test]
    async fn test_all_providers_failed_aggregate() {
        let first = FakeModel::new("first", 10, vec![Err(ProviderError::BadRequest("nope".into()))]);
        let second = FakeModel::new(
            "second",
            20,
            vec![Err(ProviderError::RateLimited("quota exceeded".into()))],
        );
        let service = service(&[], &[Arc::clone(&first), Arc::clone(&second)]);

        let err = service.find_verses_by_description("shepherd").await.unwrap_err();
        let ProviderError::AllProvidersFailed { operation, attempted, failures } = &err else {
            panic!("expected aggregate error, got {err:?}");
        };
        assert_eq!(operation, "find_verses_by_description");
        assert_eq!(*attempted, 2);
        assert_eq!(failures[0].provider, "FIRST");
        assert!(err
            .to_string()
            .starts_with("All available providers (2) failed for find_verses_by_description: FIRST: bad request: nope"));
        assert!(err.is_quota_related());
        assert_eq!(first.text.calls(), 1);
        assert_eq!(second.text.calls(), 3);
    }

    #[tokio::test]
    async fn test_find_verses_success() {
        let model = FakeModel::new("a", 10, vec![Ok("Psalm 23:1-4".into())]);
        let service = service(&[], &[model]);
        let refs = service.find_verses_by_description("shepherd").await.unwrap();
        assert_eq!(refs, vec![VerseReference::new("Psalm", 23, 1, 4).unwrap()]);
    }

    #[tokio::test]
    async fn test_dropping_operation_cancels_pending_retries() {
        let model = FakeModel::new("slow", 10, vec![Err(ProviderError::Timeout(Duration::from_secs(15)))]);
        let registry = ProviderRegistry::new();
        registry.register(Arc::clone(&model) as Arc<dyn GenerativeProvider>);
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(30),
        };
        let service = ScriptureService::new(Arc::new(registry), policy);
        service.configure(&HashMap::from([("slow".to_string(), ProviderConfig::with_key("k"))]));

        let r = john_3_16();
        let outcome = tokio::time::timeout(Duration::from_millis(50), service.key_takeaway(&r)).await;
        assert!(outcome.is_err());
        assert_eq!(model.text.calls(), 1);
    }

    // ── End to end over the built-in catalog ──

    #[tokio::test]
    async fn test_from_config_esv_failure_falls_back_to_openai() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let esv = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/passage/text/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(1)
            .mount(&esv)
            .await;

        let openai = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "message": {"content": "```json\n[{\"verse_num\": 16, \"verse_string\": \"For God so loved the world\"}]\n```"},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&openai)
            .await;

        let mut config = Config::default();
        config.retry.initial_delay_ms = 1;
        config.retry.max_delay_ms = 2;
        config.providers.insert(
            "esv".into(),
            ProviderConfig {
                api_base: Some(esv.uri()),
                ..ProviderConfig::with_key("esv-token")
            },
        );
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_base: Some(openai.uri()),
                ..ProviderConfig::with_key("sk-test")
            },
        );

        let service = ScriptureService::from_config(&config);
        assert!(service.is_ready());

        let verses = service.fetch_scripture(&john_3_16(), "ESV").await.unwrap();
        assert_eq!(verses, vec![VerseText::new(16, "For God so loved the world")]);
    }
}
