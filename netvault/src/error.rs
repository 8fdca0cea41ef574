//! Error types for netvault.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::store::RecordId;

/// Main error type for netvault operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Backup record store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Diff request errors
    #[error("Diff error: {0}")]
    Diff(#[from] DiffError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The device has neither a primary nor an out-of-band address.
    #[error("No IP address configured for device '{device}'")]
    NoAddressConfigured { device: String },

    /// The device is not known to the directory.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// A capture attempt failed; `reason` is what gets recorded.
    #[error("Backup of '{device}' failed: {reason}")]
    CaptureFailed { device: String, reason: String },
}

impl Error {
    /// Human-readable reason stored in a `Failed:<reason>` record.
    pub fn reason(&self) -> String {
        match self {
            Error::Transport(TransportError::Timeout(_)) => "Connection timed out".to_string(),
            Error::Transport(e) => format!("Connection failed: {e}"),
            Error::Channel(e) => e.to_string(),
            Error::CaptureFailed { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }

    /// Whether this error came from the device never returning its prompt.
    pub fn is_prompt_timeout(&self) -> bool {
        matches!(self, Error::Channel(ChannelError::PromptTimeout { .. }))
    }
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key is not in known_hosts and strict checking is on
    #[error("Unknown host key for {host}:{port}")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection attempt timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (prompt detection on the interactive shell).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The device never returned the expected prompt
    #[error("Prompt not seen after '{command}' within {timeout:?}")]
    PromptTimeout { command: String, timeout: Duration },

    /// Channel closed by the device before the prompt arrived
    #[error("Channel closed")]
    Closed,

    /// I/O error on the shell stream
    #[error("Channel I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Backup record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Record not found
    #[error("Backup record not found: {0}")]
    RecordNotFound(RecordId),
}

/// Diff request errors.
#[derive(Error, Debug)]
pub enum DiffError {
    /// Diffing is only defined for exactly two records
    #[error("Select exactly 2 configs to compare (got {0})")]
    SelectionCount(usize),
}

/// Configuration and inventory errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is unset
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// Inventory file could not be read
    #[error("Failed to read inventory: {0}")]
    Io(#[from] io::Error),

    /// Inventory file is malformed
    #[error("Invalid inventory: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using netvault's Error.
pub type Result<T> = std::result::Result<T, Error>;
