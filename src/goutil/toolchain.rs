//! Collaborator traits for talking to the Go toolchain

#[cfg(test)]
use mockall::automock;

use crate::goutil::error::ToolchainError;

/// Resolves the latest upstream version of a module
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait VersionLookup: Send + Sync {
    /// Returns the latest version of `module_path` (e.g. "v0.16.0")
    ///
    /// May fail with the "module declares its path as" error text when the
    /// upstream module has been renamed.
    async fn latest_version(&self, module_path: &str) -> Result<String, ToolchainError>;
}

/// Installs a package into $GOBIN
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Installer: Send + Sync {
    /// `go install <import_path>@latest`
    async fn install_latest(&self, import_path: &str) -> Result<(), ToolchainError>;

    /// `go install <import_path>@main`, falling back to `@master`
    async fn install_main_or_master(&self, import_path: &str) -> Result<(), ToolchainError>;

    /// `go install <import_path>@<version>`
    async fn install_version(&self, import_path: &str, version: &str)
    -> Result<(), ToolchainError>;
}
