use thiserror::Error;

use crate::goutil::{BinaryError, ToolchainError};

/// Per-package failure carried inside an `UpdateResult`
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("{name}: import path is empty (not installed by 'go install' or permission incorrect)")]
    EmptyImportPath { name: String },

    #[error("{name} is not installed by 'go install' (or permission incorrect)")]
    UnknownModulePath { name: String },

    #[error("{name}: {source}")]
    Lookup {
        name: String,
        #[source]
        source: ToolchainError,
    },

    #[error("{name}: {source}")]
    Install {
        name: String,
        #[source]
        source: ToolchainError,
    },

    #[error("{name}: {source}")]
    RemoveOldBinary {
        name: String,
        #[source]
        source: BinaryError,
    },

    #[error("{name}: {reason}")]
    InvalidVersion { name: String, reason: String },

    #[error("{name}: operation canceled")]
    Canceled { name: String },

    #[error("{name}: update task panicked")]
    Panicked { name: String },
}

impl UpdateError {
    pub fn is_canceled(&self) -> bool {
        match self {
            UpdateError::Canceled { .. } => true,
            UpdateError::Lookup { source, .. } | UpdateError::Install { source, .. } => {
                source.is_canceled()
            }
            _ => false,
        }
    }
}

/// Invalid combination of `--main` / `--master` / `--latest`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("same binary ({name}) is specified in both --{first} and --{second}")]
    Conflict {
        name: String,
        first: &'static str,
        second: &'static str,
    },
}
