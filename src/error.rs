//! Centralized error handling for Facing
//!
//! This module provides a unified error type that covers all error scenarios
//! in the application: file I/O, configuration, content fetching and markup
//! handling.

use log::warn;
use std::fmt;
use std::io;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Custom Result Type Alias
// ─────────────────────────────────────────────────────────────────────────────

/// A specialized `Result` type for the application.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a section could not be fetched from its content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    /// The source has no section with that reference
    NotFound,
    /// Connection or transport failure
    Network,
    /// The source did not answer in time
    Timeout,
    /// The source answered with an unexpected HTTP status
    Http(u16),
}

impl FetchFailure {
    /// Whether retrying the same fetch can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchFailure::NotFound)
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::NotFound => write!(f, "not found"),
            FetchFailure::Network => write!(f, "network error"),
            FetchFailure::Timeout => write!(f, "timed out"),
            FetchFailure::Http(status) => write!(f, "HTTP status {}", status),
        }
    }
}

/// The centralized error type for the application.
#[derive(Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // File I/O Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic I/O error wrapper
    Io(io::Error),

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to load configuration file
    ConfigLoad {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to save configuration file
    ConfigSave {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to parse configuration (invalid JSON/format)
    ConfigParse {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration directory not found or inaccessible
    ConfigDirNotFound,

    // ─────────────────────────────────────────────────────────────────────────
    // Content Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// A section could not be fetched from the content source
    ContentFetch {
        reference: String,
        kind: FetchFailure,
        message: String,
    },

    /// The fetched markup lacks a fragment the viewer expects
    MissingFragment { fragment: &'static str },

    /// The configured content source cannot be used
    InvalidSource(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Application Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic application error with a message
    Application(String),
}

impl Error {
    /// Build a fetch error for `reference`.
    pub fn fetch(reference: &str, kind: FetchFailure, message: impl Into<String>) -> Self {
        Error::ContentFetch {
            reference: reference.to_string(),
            kind,
            message: message.into(),
        }
    }

    /// Whether the failed operation is worth offering a retry for.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ContentFetch { kind, .. } => kind.is_retryable(),
            Error::Io(_) => true,
            _ => false,
        }
    }
}

// Implement From traits for convenient error conversion
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigParse {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidSource(format!("invalid URL: {}", err))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Display trait implementation for user-friendly error messages
// ─────────────────────────────────────────────────────────────────────────────
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),

            // Configuration Errors
            Error::ConfigLoad { path, source } => {
                write!(
                    f,
                    "Failed to load configuration from '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::ConfigSave { path, source } => {
                write!(
                    f,
                    "Failed to save configuration to '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::ConfigParse { message, .. } => {
                write!(f, "Invalid configuration format: {}", message)
            }
            Error::ConfigDirNotFound => {
                write!(f, "Configuration directory not found")
            }

            // Content Errors
            Error::ContentFetch {
                reference,
                kind,
                message,
            } => {
                if message.is_empty() {
                    write!(f, "Could not load section '{}': {}", reference, kind)
                } else {
                    write!(
                        f,
                        "Could not load section '{}': {} ({})",
                        reference, kind, message
                    )
                }
            }
            Error::MissingFragment { fragment } => {
                write!(f, "Response has no '#{}' fragment", fragment)
            }
            Error::InvalidSource(msg) => write!(f, "Invalid content source: {}", msg),

            // Application Errors
            Error::Application(msg) => write!(f, "{}", msg),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// std::error::Error trait implementation for error chaining
// ─────────────────────────────────────────────────────────────────────────────
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::ConfigLoad { source, .. } => Some(source.as_ref()),
            Error::ConfigSave { source, .. } => Some(source.as_ref()),
            Error::ConfigParse { source, .. } => source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::ConfigDirNotFound
            | Error::ContentFetch { .. }
            | Error::MissingFragment { .. }
            | Error::InvalidSource(_)
            | Error::Application(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Graceful Degradation Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for Result to support graceful degradation.
pub trait ResultExt<T> {
    /// If the result is an error, log it at warning level and return the provided default.
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                warn!("{}: {}. Using default.", context, err);
                default
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_creation() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test error");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_result: std::result::Result<String, _> = serde_json::from_str("invalid json");
        let err = Error::from(json_result.unwrap_err());
        assert!(matches!(err, Error::ConfigParse { .. }));
    }

    #[test]
    fn test_url_error_conversion() {
        let err = Error::from(url::Url::parse("not a url").unwrap_err());
        assert!(matches!(err, Error::InvalidSource(_)));
    }

    #[test]
    fn test_display_fetch_error() {
        let err = Error::fetch("ch1", FetchFailure::NotFound, "");
        assert_eq!(err.to_string(), "Could not load section 'ch1': not found");

        let err = Error::fetch("ch2", FetchFailure::Http(500), "server error");
        let msg = err.to_string();
        assert!(msg.contains("ch2"));
        assert!(msg.contains("HTTP status 500"));
        assert!(msg.contains("server error"));
    }

    #[test]
    fn test_display_missing_fragment() {
        let err = Error::MissingFragment {
            fragment: "text-content",
        };
        assert_eq!(err.to_string(), "Response has no '#text-content' fragment");
    }

    #[test]
    fn test_retryable() {
        assert!(!Error::fetch("a", FetchFailure::NotFound, "").is_retryable());
        assert!(Error::fetch("a", FetchFailure::Timeout, "").is_retryable());
        assert!(Error::fetch("a", FetchFailure::Network, "").is_retryable());
        assert!(!Error::Application("x".to_string()).is_retryable());
    }

    #[test]
    fn test_display_config_dir_not_found() {
        let err = Error::ConfigDirNotFound;
        let msg = format!("{}", err);
        assert_eq!(msg, "Configuration directory not found");
    }

    #[test]
    fn test_error_source_io() {
        use std::error::Error as StdError;
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err = Error::Io(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_source_none_for_simple_variants() {
        use std::error::Error as StdError;
        let err = Error::Application("test".to_string());
        assert!(err.source().is_none());

        let err = Error::fetch("ch1", FetchFailure::Network, "");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_unwrap_or_warn_default_ok() {
        let result: Result<i32> = Ok(42);
        let value = result.unwrap_or_warn_default(0, "test context");
        assert_eq!(value, 42);
    }

    #[test]
    fn test_unwrap_or_warn_default_err() {
        let result: Result<i32> = Err(Error::Application("test".to_string()));
        let value = result.unwrap_or_warn_default(0, "test context");
        assert_eq!(value, 0);
    }
}
