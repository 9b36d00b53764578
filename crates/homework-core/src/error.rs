//! Core error types for homework-core.
//!
//! Each layer (item validation, local storage, remote mirror, configuration,
//! sync) has its own `thiserror` enum. [`CoreError`] wraps them for callers
//! that do not care which layer failed.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for homework-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Local storage errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Remote mirror errors
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Sync pass errors
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Local key-value store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading a key failed
    #[error("Failed to read '{key}': {message}")]
    ReadFailed { key: String, message: String },

    /// Writing a key failed
    #[error("Failed to write '{key}': {message}")]
    WriteFailed { key: String, message: String },

    /// Stored value could not be decoded
    #[error("Corrupt value under '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Remote mirror errors.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Transport failure (connection, timeout, TLS)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Remote rejected request ({status}): {body}")]
    Status { status: u16, body: String },

    /// A returned row could not be decoded into an item
    #[error("Malformed remote row: {0}")]
    Decode(String),

    /// Remote endpoint is not configured
    #[error("Remote URL is not configured (set remote.url)")]
    NotConfigured,

    /// Invalid endpoint URL
    #[error("Invalid remote URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Failure injected or reported by a non-HTTP backend
    #[error("{0}")]
    Backend(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Title is empty after trimming
    #[error("Title must not be empty")]
    EmptyTitle,

    /// No item with the given id
    #[error("No item with id '{0}'")]
    UnknownItem(String),
}

/// Outcome failures of one reconciliation pass.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No remote mirror is configured for this session
    #[error("Remote sync is not configured")]
    Disabled,

    /// Sync attempted without a signed-in principal
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Another pass for the same principal is still running
    #[error("A sync pass is already in progress for '{0}'")]
    SyncInProgress(String),

    /// Reading from the remote mirror failed; nothing was changed
    #[error("Failed to fetch remote items: {0}")]
    RemoteFetch(#[source] RemoteError),

    /// Upserting the write-set failed; the merged set was kept locally
    #[error("Failed to push items to remote: {0}")]
    RemoteWrite(#[source] RemoteError),

    /// Local cache read/write failed
    #[error("Local store failure: {0}")]
    Store(#[from] StoreError),

    /// The signed-in principal changed while the pass was suspended
    #[error("Signed-in account changed during sync; results discarded")]
    PrincipalChanged,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
