//! Lectio core: shared types, error taxonomy, configuration, and utilities.
//!
//! Every other crate in the workspace builds on these definitions:
//! - [`types`]: verse references, verse text, scores, prompts
//! - [`error`]: [`ProviderError`] and the [`OperationResult`] alias
//! - [`config`]: on-disk configuration and per-provider settings
//! - [`utils`]: path resolution and string helpers

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use error::{OperationResult, ProviderError, ProviderFailure};
pub use types::{Prompt, ScoreResult, VerseReference, VerseText};
