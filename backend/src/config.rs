//! Server configuration module.
//!
//! Parses configuration from environment variables for the webui backend.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PORT` | No | 8080 | HTTP server port |
//! | `WEBUI_ROOT_DIR` | No | current directory | Root of the demo file dialog |
//! | `WEBUI_FILE_MASK` | No | `.+` | Regex file names must match to be listed |

use std::env;
use std::path::PathBuf;

use regex::Regex;
use thiserror::Error;

/// Default HTTP server port.
const DEFAULT_PORT: u16 = 8080;

/// Default file mask: every file.
pub const DEFAULT_FILE_MASK: &str = ".+";

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,

    /// Directory the file dialog is confined to.
    pub root_dir: PathBuf,

    /// Regex listed file names must match in full.
    pub file_mask: String,
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Port number is not a valid u16
    /// - `WEBUI_ROOT_DIR` is set but is not a directory
    /// - `WEBUI_FILE_MASK` is not a valid regex
    ///
    /// # Example
    ///
    /// ```no_run
    /// use webui_backend::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on port {}", config.port);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_port()?;
        let root_dir = parse_root_dir()?;
        let file_mask = parse_file_mask()?;

        Ok(Self {
            port,
            root_dir,
            file_mask,
        })
    }
}

/// Parse the PORT environment variable.
///
/// Returns the default port if not set.
fn parse_port() -> Result<u16, ConfigError> {
    match env::var("PORT") {
        Ok(port_str) => Ok(port_str.parse()?),
        Err(env::VarError::NotPresent) => Ok(DEFAULT_PORT),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: "PORT".to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

/// Parse WEBUI_ROOT_DIR, defaulting to the current directory.
fn parse_root_dir() -> Result<PathBuf, ConfigError> {
    let root = match env::var("WEBUI_ROOT_DIR") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => env::current_dir().map_err(|e| ConfigError::InvalidFormat {
            var: "WEBUI_ROOT_DIR".to_string(),
            message: format!("current directory is unavailable: {e}"),
        })?,
    };

    if !root.is_dir() {
        return Err(ConfigError::InvalidFormat {
            var: "WEBUI_ROOT_DIR".to_string(),
            message: format!("'{}' is not a directory", root.display()),
        });
    }
    Ok(root)
}

/// Parse WEBUI_FILE_MASK and check that it compiles.
fn parse_file_mask() -> Result<String, ConfigError> {
    let mask = match env::var("WEBUI_FILE_MASK") {
        Ok(mask) if !mask.is_empty() => mask,
        _ => return Ok(DEFAULT_FILE_MASK.to_string()),
    };

    Regex::new(&mask).map_err(|e| ConfigError::InvalidFormat {
        var: "WEBUI_FILE_MASK".to_string(),
        message: e.to_string(),
    })?;
    Ok(mask)
}
