//! Error types for the backup run.

use std::path::PathBuf;
use thiserror::Error;

/// Backup errors.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("API error: {0}")]
    Api(#[from] garmin_connect_client::GarminError),

    #[error("login failed: {0}")]
    LoginFailed(#[source] garmin_connect_client::GarminError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid date `{0}` (expected YYYY or YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("prompt failed: {0}")]
    Prompt(String),
}

impl BackupError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackupError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for backup operations.
pub type BackupResult<T> = Result<T, BackupError>;
