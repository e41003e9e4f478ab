//! gup updates binaries installed by `go install`.
//!
//! # Modules
//!
//! - [`goutil`]: Go toolchain collaborators (install, latest-version lookup, discovery)
//! - [`update`]: Concurrent update pipeline (version cache, worker pool, orchestrator)
//! - [`cli`]: Subcommand entry points
//! - [`config`]: Paths, constants and the persisted package list
//! - [`package`]: Package model shared by every layer

pub mod cli;
pub mod config;
pub mod goutil;
pub mod logging;
pub mod package;
pub mod print;
pub mod update;
