//! Library Harvest: a catalog crawler for online book libraries
//!
//! This crate walks a paginated book catalog, extracts per-book metadata,
//! downloads book texts and cover images, and collects the results into a
//! record set that a static-site renderer can consume.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Library Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Unexpected page structure: {0}")]
    PageStructure(String),

    #[error("Redirect detected for {url}, resource is absent")]
    RedirectDetected { url: String },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Connection failure for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("Cancelled while processing {target}")]
    Cancelled { target: String },

    #[error("Gave up on {target} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        target: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Failed to download asset {url}: {source}")]
    AssetFetch {
        url: String,
        #[source]
        source: Box<HarvestError>,
    },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HarvestError {
    /// Classifies a reqwest error raised while requesting `url`
    ///
    /// Connection-level failures (refused, unreachable, timeouts, resets while
    /// reading the body) become [`HarvestError::Connection`]; everything else
    /// is kept as [`HarvestError::Http`].
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
            HarvestError::Connection {
                url: url.to_string(),
                message: err.to_string(),
            }
        } else {
            HarvestError::Http {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// Returns true if the failure is transient and the operation may be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::AssetFetch { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns true if this error reports an external cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Library Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{BookPipeline, BookRecord, CategoryCrawler, Coordinator, RetryPolicy};
pub use output::{EventSink, MemorySink, TracingSink};
pub use state::FetchState;
