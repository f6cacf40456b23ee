//! Error types for ovpn-radius operations.
//!
//! Every variant maps to a stable process exit code so operators can tell
//! failure classes apart from the OpenVPN log alone. Codes are part of the
//! operational contract; never renumber an existing variant.

use std::path::PathBuf;
use std::time::Duration;

/// All errors that can terminate a hook invocation.
#[derive(Debug, thiserror::Error)]
pub enum RadiusError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to read configuration {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file malformed: {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("Failed to open log file {path}: {source}")]
    LogInit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{0}' is not set")]
    MissingEnvironment(&'static str),

    // ─────────────────────────────────────────────────────────────────────
    // Credential Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to read credentials file {path}: {source}")]
    CredentialsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Username or password is empty")]
    CredentialsInvalid,

    // ─────────────────────────────────────────────────────────────────────
    // AAA Transport Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("RADIUS transport failed: {0}")]
    Transport(String),

    #[error("Malformed RADIUS response: {0}")]
    MalformedResponse(String),

    #[error("Access rejected for user '{0}'")]
    Rejected(String),

    #[error("No Accounting-Response received for {status} request")]
    Unacknowledged { status: &'static str },

    // ─────────────────────────────────────────────────────────────────────
    // Record Store Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Session already exists: {0}")]
    DuplicateSession(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Update matched no session: {0}")]
    UpdateFailed(String),

    #[error("Delete matched no session: {0}")]
    DeleteFailed(String),

    #[error("Session key must not be empty")]
    InvalidKey,

    #[error("Session {key} is {state}; cannot {action}")]
    InvalidTransition {
        key: String,
        state: &'static str,
        action: &'static str,
    },

    #[error("Timed out after {waited:?} acquiring store lock {path}")]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("Store lock error: {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl RadiusError {
    pub(crate) fn storage(context: impl Into<String>, source: rusqlite::Error) -> Self {
        RadiusError::Storage {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RadiusError::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code reported to OpenVPN for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RadiusError::ConfigRead { .. } => 10,
            RadiusError::ConfigParse { .. } => 11,
            RadiusError::ConfigInvalid(_) => 12,
            RadiusError::LogInit { .. } => 13,
            RadiusError::MissingEnvironment(_) => 14,
            RadiusError::CredentialsRead { .. } => 31,
            RadiusError::CredentialsInvalid => 33,
            RadiusError::Transport(_) => 34,
            RadiusError::MalformedResponse(_) => 35,
            RadiusError::Rejected(_) => 36,
            RadiusError::DuplicateSession(_) => 37,
            RadiusError::NotFound(_) => 60,
            RadiusError::UpdateFailed(_) => 61,
            RadiusError::Unacknowledged { .. } => 64,
            RadiusError::DeleteFailed(_) => 65,
            RadiusError::InvalidKey => 66,
            RadiusError::InvalidTransition { .. } => 67,
            RadiusError::LockTimeout { .. } => 70,
            RadiusError::Lock { .. } => 71,
            RadiusError::Storage { .. } => 72,
            RadiusError::Io { .. } => 73,
        }
    }
}

/// Convenience type alias for Results using RadiusError.
pub type Result<T> = std::result::Result<T, RadiusError>;
