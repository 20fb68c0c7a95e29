//! Error types for the webui backend.
//!
//! # Error Types
//!
//! - [`ConfigError`] - Configuration errors at startup
//! - [`ServerError`] - Request and server failures, each mapped to an HTTP
//!   status by [`ServerError::status_code`]
//!
//! # Example
//!
//! ```rust
//! use axum::http::StatusCode;
//! use webui_backend::error::ServerError;
//!
//! let err = ServerError::not_found("reports/daily");
//! assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
//! ```

use std::error::Error;
use std::fmt;

use axum::http::StatusCode;

pub use crate::config::ConfigError;

/// Top-level error type for the webui backend.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error during server initialization.
    Config(ConfigError),

    /// No component lives at the requested path.
    NotFound(String),

    /// The component does not answer the requested action.
    Rejected {
        /// Component path.
        path: String,
        /// The refused action.
        action: String,
    },

    /// Unexpected internal server error.
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::NotFound(path) => write!(f, "no component at '{path}'"),
            Self::Rejected { path, action } => {
                write!(f, "component '{path}' does not handle action '{action}'")
            }
            Self::Internal(msg) => write!(f, "internal server error: {msg}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl ServerError {
    /// Creates a new not-found error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Creates a new rejected-action error.
    pub fn rejected(path: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Rejected {
            path: path.into(),
            action: action.into(),
        }
    }

    /// Creates a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status answered for this error.
    ///
    /// Unknown components and refused actions are both `404`, so the engine
    /// treats them as a failed request either way.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) | Self::Rejected { .. } => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::Rejected { .. } => "rejected",
            Self::Internal(_) => "internal",
        }
    }

    /// Returns `true` if this error indicates a client-side problem.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// A specialized Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_displays_path() {
        let err = ServerError::not_found("reports/daily");
        assert_eq!(err.to_string(), "no component at 'reports/daily'");
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn rejected_displays_action() {
        let err = ServerError::rejected("files", "explode");
        assert_eq!(
            err.to_string(),
            "component 'files' does not handle action 'explode'"
        );
    }

    #[test]
    fn request_errors_are_client_errors() {
        assert!(ServerError::not_found("x").is_client_error());
        assert!(ServerError::rejected("x", "y").is_client_error());
        assert!(!ServerError::internal("boom").is_client_error());
        assert_eq!(
            ServerError::internal("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn config_error_is_the_source() {
        let err: ServerError = ConfigError::InvalidFormat {
            var: "WEBUI_FILE_MASK".to_string(),
            message: "unclosed group".to_string(),
        }
        .into();
        assert!(err.source().is_some());
        assert!(ServerError::not_found("x").source().is_none());
    }
}
