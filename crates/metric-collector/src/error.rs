//! Error taxonomy shared by every collector
//!
//! Configuration-time errors surface when a collector is built; fetch-time
//! errors surface from a single `get_metrics` call. Nothing here is retried.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectorError {
    #[error("Invalid collector config key '{key}': {message}")]
    InvalidConfig { key: String, message: String },

    #[error("Unsupported aggregator: {name}")]
    UnsupportedAggregator { name: String },

    #[error("Metric source {url} unavailable{}: {message}", status_suffix(.status))]
    SourceUnavailable {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },

    #[error("Non-numeric value at {path}: found {found}")]
    TypeMismatch { path: String, found: String },

    #[error("Aggregator '{aggregator}' requires at least one sample")]
    EmptyInput { aggregator: String },

    #[error("Unknown metric source type: {source_type}")]
    UnknownSourceType { source_type: String },

    #[error("Aggregator '{aggregator}' overflowed")]
    Overflow { aggregator: String },

    #[error("Invalid quantity: {input}")]
    InvalidQuantity { input: String },

    #[error("Failed to build HTTP client: {message}")]
    ClientBuild { message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" (status {})", code))
        .unwrap_or_default()
}

impl CollectorError {
    pub(crate) fn invalid_config(key: &str, message: impl Into<String>) -> Self {
        CollectorError::InvalidConfig {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Errors reported while building a collector
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CollectorError::InvalidConfig { .. }
                | CollectorError::UnsupportedAggregator { .. }
                | CollectorError::UnknownSourceType { .. }
                | CollectorError::ClientBuild { .. }
        )
    }

    /// Errors reported by a single fetch
    pub fn is_fetch_error(&self) -> bool {
        !self.is_config_error()
    }
}

pub type Result<T> = std::result::Result<T, CollectorError>;
