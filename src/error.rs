//! Error types for a synchronization run.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while synchronizing locale files.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Missing or invalid run configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The base locale file does not exist.
    #[error("base language file not found: {}", .0.display())]
    MissingBaseFile(PathBuf),

    /// A locale or snapshot file is not a valid JSON object.
    #[error("failed to parse {}: {message}", path.display())]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Version-control history could not be queried.
    #[error("change log unavailable: {0}")]
    ChangeLogUnavailable(String),

    /// The translation backend failed.
    #[error("{provider} translation service error: {message}")]
    TranslationService {
        /// Backend name.
        provider: String,
        /// Error message.
        message: String,
        /// Whether the request can be retried.
        retryable: bool,
    },

    /// The validation call itself failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Filesystem error.
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Creates a retryable translation service error.
    pub fn service_retryable(provider: &str, message: impl Into<String>) -> Self {
        Self::TranslationService {
            provider: provider.to_string(),
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable translation service error.
    pub fn service_fatal(provider: &str, message: impl Into<String>) -> Self {
        Self::TranslationService {
            provider: provider.to_string(),
            message: message.into(),
            retryable: false,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::TranslationService { retryable: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(SyncError::service_retryable("OpenAI", "HTTP 429").is_retryable());
        assert!(!SyncError::service_fatal("OpenAI", "HTTP 401").is_retryable());
        assert!(!SyncError::Configuration("x".into()).is_retryable());
    }

    #[test]
    fn error_display() {
        let err = SyncError::service_fatal("Gemini", "HTTP 500: overloaded");
        assert_eq!(
            err.to_string(),
            "Gemini translation service error: HTTP 500: overloaded"
        );

        let err = SyncError::Parse {
            path: PathBuf::from("fr.json"),
            message: "expected value".into(),
        };
        assert!(err.to_string().contains("fr.json"));
    }
}
