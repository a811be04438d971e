//! Shared HTTP plumbing: sending requests and turning failures into
//! [`ProviderError`] kinds.
//!
//! Classification prefers the HTTP status code. Response bodies are only
//! inspected for vendor quota/overload wording when the status alone is not
//! decisive, or when an error page arrives in place of the expected JSON.

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use lectio_core::error::classify_vendor_message;
use lectio_core::utils::truncate_string;
use lectio_core::ProviderError;

/// Maximum characters of a response body carried into an error message.
const MAX_ERROR_BODY: usize = 300;

/// Send a request with a timeout and return the body of a 2xx response.
///
/// Non-2xx statuses and transport failures are classified. The request URL
/// is stripped from transport errors, since some backends carry credentials
/// in it.
pub async fn send_for_text(
    request: RequestBuilder,
    timeout: Duration,
    provider: &str,
) -> Result<String, ProviderError> {
    let response = request
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_transport(e, timeout))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| classify_transport(e, timeout))?;

    if !status.is_success() {
        error!(
            provider,
            status = %status,
            body = %truncate_string(&body, MAX_ERROR_BODY),
            "API error"
        );
        return Err(classify_status(status, &body));
    }

    debug!(provider, bytes = body.len(), "response received");
    Ok(body)
}

/// Decode a JSON response envelope.
///
/// When the body is not the expected JSON (a proxy error page, say) and it
/// mentions a transient condition, the failure is reported as retryable.
pub fn decode_envelope<T: DeserializeOwned>(body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| {
        classify_vendor_message(&truncate_string(body, MAX_ERROR_BODY)).unwrap_or_else(|| {
            ProviderError::MalformedResponse(format!("unexpected response envelope: {e}"))
        })
    })
}

/// Map a non-success status and its body to an error kind.
pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let message = truncate_string(&extract_error_message(body), MAX_ERROR_BODY);
    match status.as_u16() {
        400 => ProviderError::BadRequest(message),
        401 | 403 => ProviderError::Unauthorized(message),
        429 => ProviderError::RateLimited(message),
        503 => ProviderError::ServerOverloaded(message),
        // 529 is Anthropic's "overloaded"; other statuses only via vendor text.
        529 => ProviderError::ServerOverloaded(message),
        code => classify_vendor_message(&message).unwrap_or(ProviderError::Api {
            status: code,
            message,
        }),
    }
}

/// Map a transport-level `reqwest` error to an error kind.
pub fn classify_transport(e: reqwest::Error, timeout: Duration) -> ProviderError {
    if e.is_timeout() {
        return ProviderError::Timeout(timeout);
    }
    let e = e.without_url();
    if e.is_decode() {
        ProviderError::MalformedResponse(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Pull a readable message out of a JSON error body.
///
/// Understands `{"error": {"message": ...}}`, `{"error": "..."}`,
/// `{"detail": "..."}` and `{"message": ...}`; anything else is returned as-is.
pub fn extract_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };

    let candidates = [
        value.pointer("/error/message"),
        value.get("error").filter(|v| v.is_string()),
        value.get("detail"),
        value.get("message"),
    ];
    let message = candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(String::from))
        .unwrap_or_else(|| body.trim().to_string());
    message
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
