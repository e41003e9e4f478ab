use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Failure of a `go` command or of a Go proxy request
///
/// Cloneable so a failed lookup can be shared by every caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ToolchainError {
    #[error("operation canceled")]
    Canceled,

    #[error("you didn't install golang: {0}")]
    GoNotFound(String),

    #[error("can't execute '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("can't find installed binaries in {}: {source}", path.display())]
    ReadGoBin {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("'{command}' failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Network error: {0}")]
    Network(Arc<reqwest::Error>),

    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ToolchainError {
    /// Cancellation-class errors are never memoized.
    pub fn is_canceled(&self) -> bool {
        matches!(self, ToolchainError::Canceled)
    }
}

impl From<reqwest::Error> for ToolchainError {
    fn from(e: reqwest::Error) -> Self {
        ToolchainError::Network(Arc::new(e))
    }
}

/// Failure while cleaning up a binary left behind by a module rename
#[derive(Debug, Error)]
pub enum BinaryError {
    #[error("invalid binary name: {0}")]
    UnsafeName(String),

    #[error("can't stat old binary {}: {source}", path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't remove old binary {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
