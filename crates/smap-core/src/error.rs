//! Error types for smap-core operations.
//!
//! Most failures inside the engine never surface as an [`Error`]: a broken
//! source contributes zero entries, an unreachable router degrades to `None`.
//! The variants here cover what does cross a public boundary.
//!
//! ## Error Categories
//!
//! - **I/O / Storage**: writing sitemap files, reading config and fixtures
//! - **Parse / Serialization**: TOML/JSON input, XML inspection
//! - **Configuration**: invalid settings, including a missing base URL
//! - **Source**: a content source reporting an internal failure
//!
//! ```rust
//! use smap_core::Error;
//!
//! let err = Error::MissingBaseUrl;
//! assert_eq!(err.category(), "config");
//! assert!(!err.is_recoverable());
//! ```

use thiserror::Error;

/// The main error type for smap-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input could not be parsed (dates, XML, fixture files).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Writing generated output to disk failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No base URL is configured, so no absolute `<loc>` can be built.
    ///
    /// This is the only hard stop in sitemap generation.
    #[error("Configuration error: no base URL configured for the site")]
    MissingBaseUrl,

    /// URL is malformed or not absolute.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A content source failed while collecting.
    #[error("Source '{source_name}' failed: {reason}")]
    Source {
        /// Name of the failing source.
        source_name: String,
        /// Reason reported by the source.
        reason: String,
    },

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl Error {
    /// Build a [`Error::Source`] from a source name and any displayable reason.
    pub fn source_failed(source_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Source {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if the error might be recoverable through retry logic.
    ///
    /// The engine itself never retries; this is a hint for the scheduler
    /// that triggers regeneration.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            )
        )
    }

    /// Get the error category as a string identifier for logging.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Parse(_) => "parse",
            Self::Storage(_) => "storage",
            Self::Config(_) | Self::MissingBaseUrl => "config",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Serialization(_) => "serialization",
            Self::Source { .. } => "source",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io;

    #[test]
    fn test_error_display_formatting() {
        let err = Error::Parse("bad date".to_string());
        assert_eq!(err.to_string(), "Parse error: bad date");

        let err = Error::source_failed("posts", "database offline");
        assert_eq!(err.to_string(), "Source 'posts' failed: database offline");

        let err = Error::MissingBaseUrl;
        assert!(err.to_string().contains("no base URL"));

        let err = Error::Other("plain".to_string());
        assert_eq!(err.to_string(), "plain");
    }

    #[test]
    fn test_error_from_io_error() {
        let error: Error = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        match error {
            Error::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::NotFound),
            other => panic!("Expected IO error variant, got {other:?}"),
        }
    }

    #[test]
    fn test_error_from_url_parse_error() {
        let error: Error = url::Url::parse("not a url").unwrap_err().into();
        assert_eq!(error.category(), "invalid_url");
    }

    #[test]
    fn test_error_categories() {
        let cases = vec![
            (Error::Io(io::Error::other("test")), "io"),
            (Error::Parse("test".to_string()), "parse"),
            (Error::Storage("test".to_string()), "storage"),
            (Error::Config("test".to_string()), "config"),
            (Error::MissingBaseUrl, "config"),
            (Error::InvalidUrl("test".to_string()), "invalid_url"),
            (Error::Serialization("test".to_string()), "serialization"),
            (Error::source_failed("a", "b"), "source"),
            (Error::Other("test".to_string()), "other"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.category(), expected);
        }
    }

    #[test]
    fn test_error_recoverability() {
        assert!(Error::Io(io::Error::new(io::ErrorKind::TimedOut, "x")).is_recoverable());
        assert!(Error::Io(io::Error::new(io::ErrorKind::Interrupted, "x")).is_recoverable());

        assert!(!Error::MissingBaseUrl.is_recoverable());
        assert!(!Error::Io(io::Error::new(io::ErrorKind::PermissionDenied, "x")).is_recoverable());
        assert!(!Error::source_failed("posts", "boom").is_recoverable());
    }

    proptest! {
        #[test]
        fn test_parse_error_with_arbitrary_messages(msg in r".{0,200}") {
            let error = Error::Parse(msg.clone());
            let rendered = error.to_string();
            prop_assert!(rendered.starts_with("Parse error: "));
            prop_assert!(rendered.contains(&msg));
        }
    }
}
