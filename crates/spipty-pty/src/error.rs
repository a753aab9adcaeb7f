//! Error types for pty operations

use std::path::PathBuf;
use thiserror::Error;

/// PTY bridge errors
#[derive(Debug, Error)]
pub enum PtyError {
    /// Failed to allocate the pty pair
    #[error("Failed to allocate pty: {0}")]
    OpenFailed(#[source] std::io::Error),

    /// Failed to switch the master side to non-blocking mode
    #[error("Failed to make pty master non-blocking: {0}")]
    NonBlocking(#[source] std::io::Error),

    /// Failed to look up the slave device name
    #[error("Failed to resolve pty slave name: {0}")]
    SlaveName(#[source] std::io::Error),

    /// An existing entry at the link path could not be removed
    #[error("Failed to remove {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the symlink to the slave
    #[error("Failed to link {path} -> {target}: {source}")]
    LinkFailed {
        path: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to open up the slave device permissions
    #[error("Failed to set permissions on {path}: {source}")]
    PermissionsFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the master side failed
    #[error("Failed to write to pty: {0}")]
    WriteFailed(#[source] std::io::Error),
}

/// Result type for pty operations
pub type Result<T> = std::result::Result<T, PtyError>;
