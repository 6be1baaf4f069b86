//! Error types for the asset database

use std::path::PathBuf;

use thiserror::Error;

use crate::loader::LoadError;
use crate::uid::Uid;

/// Asset database errors
#[derive(Debug, Error)]
pub enum AssetError {
    /// No asset registered under the given path
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// No asset registered under the given UID
    #[error("Asset not found: {0}")]
    UidNotFound(Uid),

    /// Destination path is already occupied
    #[error("Another asset exists at target path: {0}")]
    Conflict(String),

    /// Destination path is not acceptable for the operation
    #[error("Invalid target path: {0}")]
    InvalidTarget(String),

    /// Filesystem failure
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sidecar could not be read or written
    #[error("Invalid meta file {path:?}: {source}")]
    Meta {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Built tree snapshot could not be read or written
    #[error("Invalid tree snapshot {path:?}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Asset object failed to load
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Configuration file could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// File watcher failure
    #[error("File watcher error: {0}")]
    Watch(String),
}

impl AssetError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Expected rejection of a store operation, reported as `false`
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::UidNotFound(_) | Self::Conflict(_) | Self::InvalidTarget(_)
        )
    }
}

/// Result type for asset database operations
pub type AssetResult<T> = std::result::Result<T, AssetError>;
