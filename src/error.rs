//! Error types for the cordon sandbox launcher.

use crate::session::SessionPhase;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for sessions that could not be set up (bad input, copy failure).
pub const EXIT_SETUP_FAILURE: i32 = 1;

/// Exit code when the sandbox runtime itself could not be launched.
pub const EXIT_RUNTIME_FAILURE: i32 = 125;

/// Exit code when the session was interrupted before the command ran.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Walking and hashing errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Failed to walk {root:?}: {message}")]
    Walk { root: PathBuf, message: String },

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Pre-flight input errors. Raised before any filesystem side effect.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Editable path {0:?} does not exist")]
    MissingPath(PathBuf),

    #[error("Editable path {0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Editable path {path:?} could not be resolved: {source}")]
    Unresolvable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Sandbox image must not be empty")]
    EmptyImage,

    #[error("Principal must not be empty")]
    EmptyPrincipal,
}

/// Overlay setup errors
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Failed to create overlay directory for {root:?}: {source}")]
    Create {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {root:?} while copying: {message}")]
    Walk { root: PathBuf, message: String },

    #[error("Failed to copy {path:?} into overlay of {root:?}: {source}")]
    Copy {
        root: PathBuf,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors launching or waiting on the external sandbox runtime
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Failed to launch sandbox runtime '{runtime}': {source}")]
    Spawn {
        runtime: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait on sandbox runtime '{runtime}': {source}")]
    Wait {
        runtime: String,
        #[source]
        source: std::io::Error,
    },
}

/// Overlay removal failure. Logged, never propagated into the session result.
#[derive(Debug, Error)]
#[error("Failed to remove overlay {overlay:?}: {source}")]
pub struct CleanupError {
    pub overlay: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Configuration and logging setup errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Everything that can end a session before the command's exit code is known
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error("Snapshot failed: {0}")]
    Snapshot(#[from] StorageError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("Session interrupted during {phase}")]
    Interrupted { phase: SessionPhase },
}

impl SessionError {
    /// Process exit code reported for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionError::Validation(_) | SessionError::Overlay(_) | SessionError::Snapshot(_) => {
                EXIT_SETUP_FAILURE
            }
            SessionError::Execution(_) => EXIT_RUNTIME_FAILURE,
            SessionError::Interrupted { .. } => EXIT_INTERRUPTED,
        }
    }
}
