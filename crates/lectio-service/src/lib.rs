//! Lectio service layer.
//!
//! [`ScriptureService`] is the single entry point applications use: it picks
//! providers from a [`lectio_providers::ProviderRegistry`], retries transient
//! failures, falls back to the next provider, and reports an aggregate error
//! when every candidate failed. [`prompts`] holds the instructions every
//! generative backend receives.

pub mod prompts;
pub mod service;

pub use service::{ConfigurationSnapshot, ScriptureService, ServiceState};
