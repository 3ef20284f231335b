//! Error types for uranio-sync
//!
//! Uses `thiserror` for library errors. Every fatal configuration error
//! carries a short operator-facing code via [`SyncError::code`], printed
//! as `[CODE] message` before the process exits non-zero.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for uranio-sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Main error type for uranio-sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    /// Given path does not exist or is not a directory
    #[error("given path does not exist: {path}")]
    InvalidPath { path: PathBuf },

    /// Consumer repo has no .uranio directory
    #[error("repo [{path}] is not initialized - run `uranio init` in the root of the repo")]
    RepoNotInitialized { path: PathBuf },

    /// Consumer repo has a .uranio directory but a missing or unreadable state file
    #[error("repo [{path}] is broken - run `uranio reinit` in the root of the repo")]
    RepoBroken { path: PathBuf },

    /// Monorepo root is missing its package.json
    #[error("path [{path}] is missing package.json")]
    MissingManifest { path: PathBuf },

    /// Monorepo package.json has no `uranio` marker field
    #[error("package.json in [{path}] has no `uranio` field - not a Uranio monorepo")]
    NotUranio { path: PathBuf },

    /// Malformed JSON in a probed configuration file
    #[error("invalid JSON in {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Watched source path does not contain the package directory marker.
    ///
    /// The supervisor only watches paths under the marker, so hitting this
    /// means the dependency-walker's assumptions are violated.
    #[error("package marker '{marker}' not found in path {path}")]
    MarkerNotFound { marker: String, path: PathBuf },

    /// Watcher could not attach to a required directory
    #[error("cannot watch {path}: {source}")]
    WatchSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Bracketed code shown to the operator on fatal errors.
    pub fn code(&self) -> &'static str {
        match self {
            SyncError::InvalidPath { .. } => "INVALID_PATH",
            SyncError::RepoNotInitialized { .. } | SyncError::RepoBroken { .. } => "INVALID_REPO",
            SyncError::MissingManifest { .. } => "INVALID_PATH",
            SyncError::NotUranio { .. } => "NOT_URANIO",
            SyncError::JsonParse { .. } => "JSON_PARSE_FAILED",
            SyncError::MarkerNotFound { .. } => "MARKER_NOT_FOUND",
            SyncError::WatchSetup { .. } => "SETUP_FAILED",
            SyncError::Io(_) => "IO_ERROR",
        }
    }
}
