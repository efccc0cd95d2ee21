use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while listing, installing or launching game versions
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Version {0} was not found")]
    VersionNotFound(String),

    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Version {0} has no main class")]
    MissingMainClass(String),

    #[error("Version {0} inherits from itself")]
    InheritanceLoop(String),

    #[error("Download task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, LauncherError>;
