//! Sumi-Harvest: a polite single-site harvester
//!
//! This crate fetches pages from one site while obeying its robots.txt,
//! discovers the pages through the site's sitemap hierarchy, and downloads
//! linked assets, retrying transient network failures with exponential backoff.

pub mod config;
pub mod crawler;
pub mod fetch;
pub mod output;
pub mod robots;
pub mod topic;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL disallowed by robots.txt: {url}")]
    PolicyViolation { url: String },

    #[error("Sitemap not found in robots.txt for {host}")]
    SitemapMissing { host: String },

    #[error("Connection reset while requesting {url}: {source}")]
    TransportReset { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Ambiguous page structure at {url}: {message}")]
    AmbiguousPageStructure { url: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Failed to decompress {url}: {source}")]
    Decompress { url: String, source: std::io::Error },

    #[error("Malformed sitemap XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Concurrency limiter closed: {0}")]
    Limiter(#[from] tokio::sync::AcquireError),
}

impl HarvestError {
    /// Returns true if another attempt at the same request could succeed
    ///
    /// Robots.txt denials and page-structure violations are deterministic,
    /// so retrying them only delays the inevitable failure.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::PolicyViolation { .. }
                | Self::AmbiguousPageStructure { .. }
                | Self::SitemapMissing { .. }
                | Self::InvalidUrl(_)
                | Self::UrlParse(_)
                | Self::Config(_)
        )
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

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{harvest, HarvestSummary, Orchestrator};
pub use fetch::{Dispatcher, FetchOutcome, RetryPolicy, Tolerance};
pub use robots::{PolicyCache, PolicyEntry, RuleSet};
