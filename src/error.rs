// src/error.rs

//! Unified error handling for the crawler application.

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

    /// A single page fetch timed out
    #[error("Timeout fetching page {page} of {source_desc}")]
    Timeout { source_desc: String, page: u32 },

    /// The page does not exist
    #[error("Page {page} of {source_desc} not found")]
    NotFound { source_desc: String, page: u32 },

    /// The content requires an authenticated session; never retried
    #[error("Access denied for page {page} of {source_desc}")]
    AccessDenied { source_desc: String, page: u32 },

    /// Page fetch retries exhausted
    #[error("Source unavailable: page {page} of {source_desc}: {message}")]
    SourceUnavailable {
        source_desc: String,
        page: u32,
        message: String,
    },

    /// Pages were supplied out of ordinal order
    #[error("Out-of-order page: got ordinal {got}, already consumed {last}")]
    OutOfOrderPage { got: u32, last: u32 },

    /// Too many consecutive pages yielded no new records
    #[error("Stalled crawl: {pages} consecutive pages with no new records")]
    StalledCrawl { pages: u32 },

    /// Per-request page ceiling hit before the request completed
    #[error("Page ceiling reached after {pages} pages")]
    PageCeiling { pages: u32 },

    /// Taxonomy resolver used before a successful load
    #[error("Taxonomy index not loaded")]
    IndexNotLoaded,

    /// Taxonomy index rejected at load time
    #[error("Malformed taxonomy index: {0}")]
    MalformedIndex(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether a page fetch that failed this way is worth retrying.
    ///
    /// Access and existence failures reproduce on retry; timeouts and
    /// transport-level failures may not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => !e.is_builder() && !e.is_decode(),
            Self::AccessDenied { .. } | Self::NotFound { .. } => false,
            _ => false,
        }
    }
}
