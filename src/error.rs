// src/error.rs

//! Unified error handling for the crawler application.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Crawling error
    #[error("Crawl error for {context}: {message}")]
    Crawl { context: String, message: String },

    /// Browser session failed or disconnected
    #[error("Browser error: {0}")]
    Browser(String),

    /// An operation exceeded its time budget
    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    /// No strategy could turn a listing entry into a detail URL
    #[error("Could not resolve detail URL for '{0}'")]
    Resolution(String),

    /// Attachment retrieval failed
    #[error("Download error: {0}")]
    Download(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a crawl error with context.
    pub fn crawl(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Crawl {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a browser error.
    pub fn browser(message: impl fmt::Display) -> Self {
        Self::Browser(message.to_string())
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            secs,
        }
    }

    /// Create a download error.
    pub fn download(message: impl fmt::Display) -> Self {
        Self::Download(message.to_string())
    }

    /// Whether retrying the same operation can plausibly succeed.
    ///
    /// Timeouts, transport failures and browser disconnects are transient.
    /// Parsing and resolution outcomes never change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Browser(_) => true,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Short stable tag used as `error_type` in failure records.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Http(_) => "http",
            Self::Json(_) => "json",
            Self::Toml(_) => "toml",
            Self::Url(_) => "url",
            Self::Selector { .. } => "selector",
            Self::Config(_) => "config",
            Self::Validation(_) => "validation",
            Self::Crawl { .. } => "crawl",
            Self::Browser(_) => "browser",
            Self::Timeout { .. } => "timeout",
            Self::Resolution(_) => "resolution",
            Self::Download(_) => "download",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_retryable() {
        assert!(AppError::timeout("navigate", 30).is_retryable());
        assert!(AppError::browser("connection closed").is_retryable());
    }

    #[test]
    fn test_structural_errors_are_not_retryable() {
        assert!(!AppError::Resolution("title".into()).is_retryable());
        assert!(!AppError::selector("[[", "bad").is_retryable());
        assert!(!AppError::download("html error page").is_retryable());
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(AppError::timeout("x", 1).kind(), "timeout");
        assert_eq!(AppError::Resolution("t".into()).kind(), "resolution");
        assert_eq!(AppError::crawl("ctx", "msg").kind(), "crawl");
    }

    #[test]
    fn test_timeout_message() {
        let err = AppError::timeout("navigation to https://a.go.kr", 30);
        assert_eq!(
            err.to_string(),
            "navigation to https://a.go.kr timed out after 30s"
        );
    }
}
