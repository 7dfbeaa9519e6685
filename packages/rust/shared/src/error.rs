//! Error types for SiteSignal.
//!
//! Library crates use [`SiteSignalError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all SiteSignal operations.
#[derive(Debug, thiserror::Error)]
pub enum SiteSignalError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error from a single transport attempt.
    #[error("network error: {0}")]
    Network(String),

    /// A fetch that exhausted its retries.
    #[error("fetch failed for {url} after {attempts} attempt(s): {reason}")]
    Fetch {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// HTML parsing or URL parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Rendering engine error (launch, tab, navigation).
    #[error("render error: {0}")]
    Render(String),

    /// Summarizer unavailable or returned an unusable payload.
    #[error("summarizer error: {0}")]
    Summarizer(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Content rejected by a validator, or malformed input.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Report rendering error.
    #[error("report error: {0}")]
    Report(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SiteSignalError>;

impl SiteSignalError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
