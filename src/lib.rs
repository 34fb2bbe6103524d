//! Paged-Harvest: a gated, paginated table harvester
//!
//! This crate drives a results view through its pages, waiting out human-verification
//! gates, extracting table records from every page, suppressing duplicates, and
//! advancing through pagination controls or page-parameter rewriting.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod provider;
pub mod state;
pub mod view;

use thiserror::Error;

/// Main error type for Paged-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("View provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
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

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// Errors raised by a [`provider::ViewProvider`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The requested element or structure is not present in the current view
    #[error("Element not found: {0}")]
    NotFound(String),

    /// The session or connection behind the provider is gone
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Navigation to {location} failed: {message}")]
    Navigation { location: String, message: String },

    /// The provider cannot perform the requested interaction
    #[error("Unsupported interaction: {0}")]
    Unsupported(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

impl ProviderError {
    /// Returns true if the error means the session itself was lost
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Result type alias for Paged-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for view provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{harvest, CrawlSession};
pub use extract::{Record, RecordExtractor};
pub use output::{CrawlResult, CrawlStats};
pub use provider::{ControlHandle, ControlSpec, View, ViewProvider};
pub use state::{AbortReason, CrawlState, CrawlStatus};
pub use view::{ViewClassifier, ViewKind};
