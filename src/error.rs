//! Error types for Notion Courier
//!
//! Defines a comprehensive error enum covering all failure modes across the system.
//! Uses thiserror for ergonomic error handling.

use thiserror::Error;

/// Result type alias for courier operations
pub type Result<T> = std::result::Result<T, CourierError>;

/// Comprehensive error type for courier operations
#[derive(Error, Debug)]
pub enum CourierError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP errors
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing errors (page properties, block payloads)
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Sync ledger database errors
    #[error("Ledger error: {0}")]
    Ledger(#[from] rusqlite::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Notion API errors
    #[error("Notion error: {0}")]
    Notion(String),

    /// GitHub API errors
    #[error("GitHub error: {0}")]
    GitHub(String),

    /// GraphQL-level errors returned inside a 200 response
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Other errors
    #[error("{0}")]
    Other(String),

    /// Rate limited (with optional retry-after duration in seconds)
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl crate::integrations::retry::RetryableError for CourierError {
    fn retry_decision(&self) -> crate::integrations::retry::RetryDecision {
        use crate::integrations::retry::RetryDecision;
        use std::time::Duration;

        match self {
            // Retryable errors
            CourierError::Network(_) => RetryDecision::Retry,
            CourierError::Http(e) => {
                // Check if it's a connection or timeout error
                if e.is_connect() || e.is_timeout() {
                    RetryDecision::Retry
                } else if e.is_status() {
                    // Check status code
                    if let Some(status) = e.status() {
                        match status.as_u16() {
                            429 => RetryDecision::RetryAfter(Duration::from_secs(60)),
                            500..=599 => RetryDecision::Retry,
                            _ => RetryDecision::NoRetry,
                        }
                    } else {
                        RetryDecision::NoRetry
                    }
                } else {
                    RetryDecision::Retry // Default to retry for other HTTP errors
                }
            }
            CourierError::RateLimited(secs) => {
                RetryDecision::RetryAfter(Duration::from_secs(*secs))
            }
            CourierError::Notion(msg) | CourierError::GitHub(msg) => {
                // Check for rate limit messages
                if msg.contains("Rate limited") || msg.contains("rate limit") {
                    // Try to extract retry-after from message
                    if let Some(secs) = extract_retry_after(msg) {
                        RetryDecision::RetryAfter(Duration::from_secs(secs))
                    } else {
                        RetryDecision::RetryAfter(Duration::from_secs(60))
                    }
                } else if msg.contains("timeout") || msg.contains("connection") {
                    RetryDecision::Retry
                } else {
                    RetryDecision::NoRetry
                }
            }
            // Non-retryable errors
            CourierError::Config(_) => RetryDecision::NoRetry,
            CourierError::Parse(_) => RetryDecision::NoRetry,
            CourierError::Io(_) => RetryDecision::NoRetry,
            CourierError::Json(_) => RetryDecision::NoRetry,
            CourierError::Yaml(_) => RetryDecision::NoRetry,
            CourierError::Ledger(_) => RetryDecision::NoRetry,
            CourierError::GraphQl(_) => RetryDecision::NoRetry,
            CourierError::Other(_) => RetryDecision::NoRetry,
        }
    }
}

/// Extract retry-after seconds from an error message
fn extract_retry_after(msg: &str) -> Option<u64> {
    // Look for patterns like "retry after 60 seconds" or "retry after 60"
    let msg_lower = msg.to_lowercase();
    if let Some(pos) = msg_lower.find("retry after") {
        let after_text = &msg[pos + 11..];
        // Find the first number
        let num_str: String = after_text
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit())
            .collect();
        num_str.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::retry::{RetryDecision, RetryableError};

    #[test]
    fn test_rate_limited_decision() {
        let err = CourierError::RateLimited(30);
        assert!(matches!(
            err.retry_decision(),
            RetryDecision::RetryAfter(d) if d.as_secs() == 30
        ));
    }

    #[test]
    fn test_config_not_retried() {
        let err = CourierError::Config("NOTION_TOKEN missing".to_string());
        assert!(matches!(err.retry_decision(), RetryDecision::NoRetry));
    }

    #[test]
    fn test_extract_retry_after() {
        assert_eq!(
            extract_retry_after("GitHub rate limit, retry after 120 seconds"),
            Some(120)
        );
        assert_eq!(extract_retry_after("no hint here"), None);
    }

    #[test]
    fn test_api_message_classification() {
        let err = CourierError::Notion("request timeout talking to api.notion.com".to_string());
        assert!(matches!(err.retry_decision(), RetryDecision::Retry));

        let err = CourierError::GitHub("Validation failed".to_string());
        assert!(matches!(err.retry_decision(), RetryDecision::NoRetry));
    }
}
