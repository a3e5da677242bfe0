//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{SessionError, StorageError, EXIT_SETUP_FAILURE};
use thiserror::Error;

/// Failures a routed command can end with
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Snapshot failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to render output: {0}")]
    Render(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Session(e) => e.exit_code(),
            CliError::Storage(_) | CliError::Render(_) | CliError::InvalidArgument(_) => {
                EXIT_SETUP_FAILURE
            }
        }
    }
}

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &CliError) -> String {
    format!("cordon: {}", e)
}
