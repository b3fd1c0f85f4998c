//! Error types for Cheongyak.
//!
//! Library crates use [`CheongyakError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Cheongyak operations.
#[derive(Debug, thiserror::Error)]
pub enum CheongyakError {
    /// Network/HTTP failure talking to an upstream API or detail page.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// JSON/XML/HTML whose overall shape does not match what we expect.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    /// Cell layout or numeric conversion failure on a specific record.
    #[error("parse failure: {message}")]
    ParseFailure { message: String },

    /// A detail page whose table layout could not be interpreted.
    #[error("detail page {url} ({table_count} tables): {message}")]
    DetailParse {
        url: String,
        table_count: usize,
        message: String,
    },

    /// Aggregation over zero usable samples.
    #[error("insufficient data: {message}")]
    InsufficientData { message: String },

    /// Region name or code not recognized.
    #[error("not found: {0}")]
    NotFound(String),

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CheongyakError>;

impl CheongyakError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a malformed-response error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: msg.into(),
        }
    }

    /// Create a record-level parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseFailure {
            message: msg.into(),
        }
    }

    /// Create a detail-page layout error.
    pub fn detail(url: impl Into<String>, table_count: usize, msg: impl Into<String>) -> Self {
        Self::DetailParse {
            url: url.into(),
            table_count,
            message: msg.into(),
        }
    }

    /// Create an insufficient-data error from any displayable message.
    pub fn insufficient(msg: impl Into<String>) -> Self {
        Self::InsufficientData {
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

    /// Whether this failure is scoped to a single item (listing, sample)
    /// rather than the whole request.
    pub fn is_item_scoped(&self) -> bool {
        matches!(
            self,
            Self::ParseFailure { .. } | Self::DetailParse { .. } | Self::InsufficientData { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = CheongyakError::config("missing service key");
        assert_eq!(err.to_string(), "config error: missing service key");

        let err = CheongyakError::detail("https://example.com/x", 3, "price table missing");
        let text = err.to_string();
        assert!(text.contains("https://example.com/x"));
        assert!(text.contains("3 tables"));
    }

    #[test]
    fn item_scope_classification() {
        assert!(CheongyakError::parse("bad cell").is_item_scoped());
        assert!(CheongyakError::detail("u", 2, "m").is_item_scoped());
        assert!(!CheongyakError::UpstreamUnavailable("down".into()).is_item_scoped());
        assert!(!CheongyakError::NotFound("서울".into()).is_item_scoped());
    }
}
