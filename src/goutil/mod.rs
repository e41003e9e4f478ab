//! Go toolchain layer
//!
//! Everything gup knows about the `go` command lives here: installing,
//! resolving latest versions, reading build info off binaries and the
//! naming rules of $GOBIN.
//!
//! # Modules
//!
//! - [`toolchain`]: `VersionLookup` / `Installer` traits consumed by the update pipeline
//! - [`go_command`]: Implementation on top of the `go` binary
//! - [`go_proxy`]: `VersionLookup` over the module proxy HTTP API
//! - [`discovery`]: Build-info parsing for binaries under $GOBIN
//! - [`module_path`]: Detection of and recovery from upstream module renames
//! - [`binary`]: Binary naming, path safety and rename cleanup
//! - [`version`]: Go module / toolchain version comparison
//! - [`error`]: Error types for this layer

pub mod binary;
pub mod discovery;
pub mod error;
pub mod go_command;
pub mod go_proxy;
pub mod module_path;
pub mod toolchain;
pub mod version;

pub use error::{BinaryError, ToolchainError};
pub use go_command::GoCommand;
pub use go_proxy::GoProxyLookup;
pub use toolchain::{Installer, VersionLookup};
