//! Retry policy and error classification for network operations.

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Maximum number of attempts for network operations.
pub const MAX_RETRIES: usize = 3;

/// Delay between retry attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping. Used by tests.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::ZERO,
        }
    }
}

/// Errors that should not be retried.
#[derive(Debug)]
pub enum NonRetryableError {
    /// Rate limit exceeded (HTTP 429)
    RateLimitExceeded(String),
    /// Authentication failed (HTTP 401)
    AuthenticationFailed(String),
    /// Resource not found (HTTP 404)
    NotFound(String),
    /// Forbidden access (HTTP 403)
    Forbidden(String),
    /// Other client errors that won't succeed on retry
    ClientError(String),
}

impl std::fmt::Display for NonRetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonRetryableError::RateLimitExceeded(msg) => {
                write!(f, "Rate limit exceeded: {}. Try again later.", msg)
            }
            NonRetryableError::AuthenticationFailed(msg) => {
                write!(f, "Authentication failed: {}. Check your HF_TOKEN.", msg)
            }
            NonRetryableError::NotFound(msg) => write!(f, "Not found: {}", msg),
            NonRetryableError::Forbidden(msg) => {
                write!(f, "Access forbidden: {}. You may need authentication.", msg)
            }
            NonRetryableError::ClientError(msg) => write!(f, "Request error: {}", msg),
        }
    }
}

impl std::error::Error for NonRetryableError {}

/// Error payload returned by Open-Meteo on bad requests.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    reason: String,
}

/// Extracts the `reason` field from an API error body, if the body carries one.
pub fn api_error_reason(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .map(|b| b.reason)
}

/// Classifies a response status as retryable or non-retryable.
/// Returns Ok(()) for retryable (5xx) statuses, Err with a user-friendly message if not.
/// `detail` is appended to the message of generic client errors.
pub fn classify_status(status: StatusCode, detail: Option<&str>) -> Result<(), NonRetryableError> {
    match status {
        StatusCode::UNAUTHORIZED => Err(NonRetryableError::AuthenticationFailed(
            "Invalid or missing authentication token".to_string(),
        )),
        StatusCode::FORBIDDEN => Err(NonRetryableError::Forbidden(
            "Access to this resource is forbidden".to_string(),
        )),
        StatusCode::TOO_MANY_REQUESTS => Err(NonRetryableError::RateLimitExceeded(
            "Too many requests".to_string(),
        )),
        StatusCode::NOT_FOUND => Err(NonRetryableError::NotFound(
            "The requested resource was not found".to_string(),
        )),
        s if s.is_client_error() => Err(NonRetryableError::ClientError(match detail {
            Some(reason) => format!("HTTP {}: {}", s.as_u16(), reason),
            None => format!("HTTP {} error", s.as_u16()),
        })),
        _ => Ok(()),
    }
}

/// Checks if an anyhow::Error is worth another attempt.
pub fn is_retryable_error(e: &anyhow::Error) -> bool {
    e.downcast_ref::<NonRetryableError>().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_retryable_error_display() {
        let err = NonRetryableError::RateLimitExceeded("test".to_string());
        assert!(err.to_string().contains("Rate limit"));

        let err = NonRetryableError::AuthenticationFailed("test".to_string());
        assert!(err.to_string().contains("HF_TOKEN"));

        let err = NonRetryableError::NotFound("test".to_string());
        assert!(err.to_string().contains("Not found"));

        let err = NonRetryableError::Forbidden("test".to_string());
        assert!(err.to_string().contains("forbidden"));
    }

    #[test]
    fn test_classify_status_bad_request_with_reason() {
        let err = classify_status(StatusCode::BAD_REQUEST, Some("Latitude must be in range"))
            .unwrap_err();
        assert!(matches!(err, NonRetryableError::ClientError(_)));
        assert!(err.to_string().contains("HTTP 400: Latitude must be in range"));
    }

    #[test]
    fn test_classify_status_server_error_is_retryable() {
        assert!(classify_status(StatusCode::INTERNAL_SERVER_ERROR, None).is_ok());
        assert!(classify_status(StatusCode::BAD_GATEWAY, None).is_ok());
    }

    #[test]
    fn test_classify_status_not_found() {
        let err = classify_status(StatusCode::NOT_FOUND, None).unwrap_err();
        assert!(matches!(err, NonRetryableError::NotFound(_)));
    }

    #[test]
    fn test_classify_status_auth_and_rate_limit_are_final() {
        let err = classify_status(StatusCode::UNAUTHORIZED, None).unwrap_err();
        assert!(matches!(err, NonRetryableError::AuthenticationFailed(_)));

        let err = classify_status(StatusCode::FORBIDDEN, None).unwrap_err();
        assert!(matches!(err, NonRetryableError::Forbidden(_)));

        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, Some("ignored")).unwrap_err();
        assert!(matches!(err, NonRetryableError::RateLimitExceeded(_)));

        let err = classify_status(StatusCode::CONFLICT, None).unwrap_err();
        assert!(matches!(err, NonRetryableError::ClientError(_)));
        assert!(err.to_string().contains("HTTP 409"));
    }

    #[test]
    fn test_api_error_reason() {
        let body = r#"{"error":true,"reason":"Cannot initialize WeatherVariable from invalid String value foo"}"#;
        assert_eq!(
            api_error_reason(body).as_deref(),
            Some("Cannot initialize WeatherVariable from invalid String value foo")
        );
        assert_eq!(api_error_reason("not json"), None);
    }

    #[test]
    fn test_is_retryable_error() {
        let err = anyhow::Error::from(NonRetryableError::NotFound("test".to_string()));
        assert!(!is_retryable_error(&err));

        let err = anyhow::anyhow!("connection reset by peer");
        assert!(is_retryable_error(&err));
    }

    #[test]
    fn test_retry_policy_immediate_has_at_least_one_attempt() {
        let policy = RetryPolicy::immediate(0);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.delay, Duration::ZERO);
        assert_eq!(RetryPolicy::default().max_attempts, MAX_RETRIES);
    }
}
