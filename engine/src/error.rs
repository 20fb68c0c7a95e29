//! Error types for the webui engine.
//!
//! Each concern has its own error enum so callers can decide how far a
//! failure reaches: a [`ConstructError`] abandons one construction call, a
//! [`SyncError`] abandons one synchronization cycle, and only
//! [`DocumentError`] and [`ConfigError`] are meant to stop the process at
//! startup. [`EngineError`] wraps them all for the binary.

use thiserror::Error;

pub use crate::config::ConfigError;

/// Errors raised while turning descriptors into live components.
///
/// None of these are fatal to the process; the affected construction call is
/// abandoned (or, for [`ConstructError::UnknownComponentType`], only the one
/// component is skipped).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructError {
    /// No constructor is registered for the type key.
    #[error("unknown type of UI component: {type_key}")]
    UnknownComponentType { type_key: String },

    /// The active style sheet has no entry in the style table.
    ///
    /// Every sibling in the same construction call is affected, so the whole
    /// call is aborted.
    #[error("ui style \"{name}\" was not found")]
    MissingStyleSheet { name: String },

    /// The output mount point or the layout name could not be resolved from
    /// the setup parameters.
    #[error("layout target is unresolved (output: {output:?}, layout: {layout:?})")]
    UnresolvedLayoutTarget {
        output: Option<String>,
        layout: Option<String>,
    },
}

/// Errors raised by a single synchronization cycle.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The backend could not be reached or answered with a failure status.
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// The response body is not a JSON object.
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    /// No tokio runtime is available to drive the cycle.
    #[error("no async runtime available to run the sync cycle")]
    NoRuntime,

    /// The component was never bound to its shared handle, so the cycle has
    /// nobody to draw into.
    #[error("component {0} is not bound to a live instance")]
    Unbound(String),
}

/// Errors raised while reading the declarative configuration document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document is not well-formed XML.
    #[error("malformed document at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// The document file could not be read.
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error for the engine crate.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Configuration document error.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Component construction error.
    #[error("construction error: {0}")]
    Construct(#[from] ConstructError),

    /// Synchronization error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// HTTP client setup error.
    #[error("HTTP error: {0}")]
    Http(String),
}

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
