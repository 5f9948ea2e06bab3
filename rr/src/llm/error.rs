//! LLM error types

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Wait used when a 429 carries no retry hint
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Response blocked: {0}")]
    Blocked(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// `{"error": {...}}` body Gemini sends with non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    /// Canonical code name, e.g. RESOURCE_EXHAUSTED
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    /// Present on google.rpc.RetryInfo, e.g. "38s"
    retry_delay: Option<String>,
}

fn parse_envelope(body: &str) -> Option<ErrorBody> {
    serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error)
}

/// Parse a protobuf duration string such as "38s" or "1.5s"
fn parse_retry_delay(delay: &str) -> Option<Duration> {
    let secs: f64 = delay.trim().strip_suffix('s')?.parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs_f64(secs))
}

impl LlmError {
    /// Error for a non-2xx, non-429 response
    ///
    /// Uses the message from Gemini's error envelope when the body has one,
    /// the raw body otherwise.
    pub fn from_api_response(status: u16, body: &str) -> Self {
        let message = match parse_envelope(body) {
            Some(err) if !err.status.is_empty() => format!("{}: {}", err.status, err.message),
            Some(err) => err.message,
            None => body.trim().to_string(),
        };
        LlmError::ApiError { status, message }
    }

    /// Error for a 429 response
    ///
    /// A `Retry-After` header wins; otherwise the RetryInfo detail in the
    /// body; otherwise a minute.
    pub fn rate_limited(retry_after_header: Option<u64>, body: &str) -> Self {
        let retry_after = retry_after_header.map(Duration::from_secs).or_else(|| {
            parse_envelope(body)?
                .details
                .iter()
                .find_map(|d| d.retry_delay.as_deref().and_then(parse_retry_delay))
        });
        LlmError::RateLimited {
            retry_after: retry_after.unwrap_or(DEFAULT_RETRY_AFTER),
        }
    }

    /// Check if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    /// Get the retry duration if this is a rate limit error
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}
