//! Configuration module for the webui engine.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `WEBUI_BACKEND_URL` | Yes | - | Backend base URL (e.g., `http://localhost:8080`) |
//! | `WEBUI_DOCUMENT` | No | `webapp.xml` | Path of the declarative configuration document |
//! | `WEBUI_RETRY_DELAY_MS` | No | 1000 | Delay before re-polling a pending notification |
//! | `WEBUI_REQUEST_TIMEOUT_SECS` | No | 30 | HTTP request timeout |
//!
//! # Example
//!
//! ```no_run
//! use webui_engine::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Backend URL: {}", config.backend_url);
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default configuration document path.
const DEFAULT_DOCUMENT: &str = "webapp.xml";

/// Default retry delay for pending notifications, in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Default HTTP request timeout, in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration for the webui engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend that answers `webui/<name>` requests.
    pub backend_url: String,

    /// Path of the declarative configuration document.
    pub document: PathBuf,

    /// Delay between polls while the backend reports a pending notification.
    pub retry_delay: Duration,

    /// HTTP request timeout.
    pub request_timeout: Duration,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `WEBUI_BACKEND_URL` is not set
    /// - `WEBUI_RETRY_DELAY_MS` or `WEBUI_REQUEST_TIMEOUT_SECS` is set but is
    ///   not a positive integer
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_url = env::var("WEBUI_BACKEND_URL")
            .map_err(|_| ConfigError::MissingEnvVar("WEBUI_BACKEND_URL".to_string()))?;

        let document = env::var("WEBUI_DOCUMENT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DOCUMENT));

        let retry_delay = Duration::from_millis(parse_positive(
            "WEBUI_RETRY_DELAY_MS",
            DEFAULT_RETRY_DELAY_MS,
        )?);

        let request_timeout = Duration::from_secs(parse_positive(
            "WEBUI_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);

        Ok(Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            document,
            retry_delay,
            request_timeout,
        })
    }
}

/// Reads an optional positive integer, falling back to `default` when unset.
fn parse_positive(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(val) => {
            let parsed = val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected positive integer, got '{val}'"),
            })?;
            if parsed == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "value must be greater than 0".to_string(),
                });
            }
            Ok(parsed)
        }
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    /// Helper to run tests with isolated environment variables.
    /// Clears all WEBUI_* vars before the test and restores them after.
    fn with_clean_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let saved_vars: Vec<(String, String)> = env::vars()
            .filter(|(k, _)| k.starts_with("WEBUI_"))
            .collect();

        for (key, _) in &saved_vars {
            env::remove_var(key);
        }

        let result = f();

        for (key, _) in env::vars().filter(|(k, _)| k.starts_with("WEBUI_")) {
            env::remove_var(key);
        }
        for (key, value) in saved_vars {
            env::set_var(key, value);
        }

        result
    }

    #[test]
    #[serial]
    fn test_missing_backend_url() {
        with_clean_env(|| {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnvVar(ref s) if s == "WEBUI_BACKEND_URL"));
        });
    }

    #[test]
    #[serial]
    fn test_minimal_config() {
        with_clean_env(|| {
            env::set_var("WEBUI_BACKEND_URL", "http://localhost:8080/");

            let config = Config::from_env().expect("should parse minimal config");

            assert_eq!(config.backend_url, "http://localhost:8080");
            assert_eq!(config.document, PathBuf::from(DEFAULT_DOCUMENT));
            assert_eq!(config.retry_delay, Duration::from_millis(1000));
            assert_eq!(config.request_timeout, Duration::from_secs(30));
        });
    }

    #[test]
    #[serial]
    fn test_full_config() {
        with_clean_env(|| {
            env::set_var("WEBUI_BACKEND_URL", "http://backend:9000");
            env::set_var("WEBUI_DOCUMENT", "/etc/webui/app.xml");
            env::set_var("WEBUI_RETRY_DELAY_MS", "250");
            env::set_var("WEBUI_REQUEST_TIMEOUT_SECS", "5");

            let config = Config::from_env().expect("should parse full config");

            assert_eq!(config.backend_url, "http://backend:9000");
            assert_eq!(config.document, PathBuf::from("/etc/webui/app.xml"));
            assert_eq!(config.retry_delay, Duration::from_millis(250));
            assert_eq!(config.request_timeout, Duration::from_secs(5));
        });
    }

    #[test]
    #[serial]
    fn test_invalid_retry_delay() {
        with_clean_env(|| {
            env::set_var("WEBUI_BACKEND_URL", "http://localhost:8080");
            env::set_var("WEBUI_RETRY_DELAY_MS", "soon");

            let err = Config::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, .. } if key == "WEBUI_RETRY_DELAY_MS"
            ));
        });
    }

    #[test]
    #[serial]
    fn test_zero_timeout_rejected() {
        with_clean_env(|| {
            env::set_var("WEBUI_BACKEND_URL", "http://localhost:8080");
            env::set_var("WEBUI_REQUEST_TIMEOUT_SECS", "0");

            let err = Config::from_env().unwrap_err();
            assert!(matches!(
                err,
                ConfigError::InvalidValue { ref key, ref message }
                    if key == "WEBUI_REQUEST_TIMEOUT_SECS" && message.contains("greater than 0")
            ));
        });
    }
}
