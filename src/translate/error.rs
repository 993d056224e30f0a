//! Error types for the translation adapter
//!
//! Two kinds of failure exist. [`AdapterError`] is returned synchronously from
//! `translate` when the request cannot be dispatched at all. [`TranslationFailure`]
//! is the non-fatal outcome of a request that was dispatched but came back
//! aborted or empty; it travels through the normal completion callback.

use thiserror::Error;

/// Errors that stop a translation before anything is sent
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The wrapped request library cannot be used
    #[error("Request library '{0}' is not available")]
    LibraryUnavailable(String),
    /// Neither an override nor a host default names a backend
    #[error("No backend configured: set a backend override or a host default backend")]
    NoBackend,
    /// Invalid configuration (bad template, unreadable config file, ...)
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// HTTP client could not be created or a transport call failed
    #[error("Network error: {0}")]
    NetworkError(String),
    /// The library dropped the request without a terminal response
    #[error("Request finished without a terminal response")]
    Incomplete,
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        AdapterError::NetworkError(err.to_string())
    }
}

/// Result type for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;

/// A dispatched request that ended without translated text
///
/// `message` is the user-facing text (prefix, status, error and the failure
/// notice). `status` and `error` are kept separately for callers that want to
/// branch on them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TranslationFailure {
    pub message: String,
    pub status: Option<String>,
    pub error: Option<String>,
}

/// What the completion callback receives: translated text or a failure
pub type TranslationResult = Result<String, TranslationFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_backend_message() {
        let msg = AdapterError::NoBackend.to_string();
        assert!(msg.contains("No backend configured"));
    }

    #[test]
    fn test_library_unavailable_names_library() {
        let err = AdapterError::LibraryUnavailable("chat-completions".to_string());
        assert_eq!(
            err.to_string(),
            "Request library 'chat-completions' is not available"
        );
    }

    #[test]
    fn test_failure_displays_message() {
        let failure = TranslationFailure {
            message: "[immersive-translate] 500 Translation failed.".to_string(),
            status: Some("500".to_string()),
            error: None,
        };
        assert_eq!(
            failure.to_string(),
            "[immersive-translate] 500 Translation failed."
        );
    }
}
