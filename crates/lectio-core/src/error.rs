//! Error taxonomy shared by providers and the service façade.
//!
//! The retry engine asks [`ProviderError::is_retryable`] instead of matching
//! on message text. Substring checks survive only in
//! [`classify_vendor_message`], for free-text quota/overload messages that
//! carry no usable status code.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Result type returned by every provider and service operation.
pub type OperationResult<T> = Result<T, ProviderError>;

/// A single provider's failure, kept for the aggregate error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderFailure {
    /// Human-readable provider name (e.g. `"ESV API"`).
    pub provider: String,
    pub message: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.message)
    }
}

/// Everything that can go wrong while invoking a provider.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProviderError {
    // ── Retryable ─────────────────────────────────────────────────────────
    /// Connection refused, reset, DNS failure, or other transport error.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete within the provider's timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP 429 or a vendor quota message.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// HTTP 503 or a vendor "overloaded"/"unavailable" message.
    #[error("server overloaded: {0}")]
    ServerOverloaded(String),

    // ── Terminal ──────────────────────────────────────────────────────────
    /// No provider (or not this provider) has a usable configuration.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// `configure()` rejected the supplied settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP 401/403: the credential was rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// HTTP 400 or an invalid request shape.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Any other non-success HTTP status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The reply could not be turned into a valid result.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Every candidate provider failed for one operation.
    #[error("All available providers ({attempted}) failed for {operation}: {}", join_failures(.failures))]
    AllProvidersFailed {
        operation: String,
        attempted: usize,
        failures: Vec<ProviderFailure>,
    },
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProviderError {
    /// Whether retrying the same provider may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited(_) | Self::ServerOverloaded(_)
        )
    }

    /// Whether the failure mentions quota or rate limiting.
    ///
    /// Used only for diagnostics; it never changes control flow.
    pub fn is_quota_related(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::AllProvidersFailed { failures, .. } => failures
                .iter()
                .any(|f| contains_quota_vocabulary(&f.message)),
            other => contains_quota_vocabulary(&other.to_string()),
        }
    }

    /// Short machine-friendly label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::RateLimited(_) => "rate_limited",
            Self::ServerOverloaded(_) => "server_overloaded",
            Self::NotConfigured(_) => "not_configured",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Unauthorized(_) => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::Api { .. } => "api",
            Self::MalformedResponse(_) => "malformed_response",
            Self::AllProvidersFailed { .. } => "all_providers_failed",
        }
    }
}

const QUOTA_WORDS: &[&str] = &[
    "quota",
    "rate limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "resource_exhausted",
    "resource exhausted",
];

const OVERLOAD_WORDS: &[&str] = &["overloaded", "unavailable", "try again later"];

fn contains_quota_vocabulary(text: &str) -> bool {
    let lower = text.to_lowercase();
    QUOTA_WORDS.iter().any(|w| lower.contains(w))
}

/// Classify a vendor's free-text error message that arrived without a
/// decisive status code.
///
/// Returns `None` when the text carries no transient signal.
pub fn classify_vendor_message(text: &str) -> Option<ProviderError> {
    let lower = text.to_lowercase();
    if QUOTA_WORDS.iter().any(|w| lower.contains(w)) {
        Some(ProviderError::RateLimited(text.to_string()))
    } else if OVERLOAD_WORDS.iter().any(|w| lower.contains(w)) {
        Some(ProviderError::ServerOverloaded(text.to_string()))
    } else {
        None
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
