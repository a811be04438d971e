//! Provider layer for Lectio.
//!
//! # Architecture
//!
//! - [`traits`]: `Provider`, `ScriptureProvider`, `GenerativeProvider`
//! - [`esv`]: ESV API scripture lookup
//! - [`backend`]: `CompletionBackend`, the per-vendor wire adapter seam
//! - [`openai`], [`anthropic`], [`gemini`]: completion backends
//! - [`generative::LlmProvider`]: generative provider over any backend
//! - [`registry`]: priority-ordered, concurrently readable provider set
//! - [`catalog`]: static specs for the built-in providers
//! - [`retry`]: bounded exponential backoff for one provider call
//! - [`normalize`]: turns loose model output into typed values
//! - [`http`]: request sending and status classification

pub mod anthropic;
pub mod backend;
pub mod catalog;
pub mod esv;
pub mod gemini;
pub mod generative;
pub mod http;
pub mod normalize;
pub mod openai;
pub mod registry;
pub mod retry;
pub mod settings;
pub mod traits;

pub use catalog::{build_registry, find_by_id, ProviderSpec, BUILTIN_PROVIDERS};
pub use generative::LlmProvider;
pub use registry::{ConfigurationOutcome, ProviderRegistry, RegisteredProvider};
pub use retry::{with_retry, RetryPolicy};
pub use traits::{GenerativeProvider, Provider, ProviderDescriptor, ScriptureProvider, ServiceKind};
