//! Concurrent update pipeline
//!
//! # Modules
//!
//! - [`parallel`]: Worker pool that runs one operation per package
//! - [`cache`]: Per-run single-flight cache of latest versions
//! - [`channel`]: Update channel resolution and config merging
//! - [`orchestrator`]: Per-package update state machine
//! - [`checker`]: Freshness check without installing
//! - [`importer`]: Installs packages recorded in gup.json
//! - [`error`]: Per-package and channel errors

pub mod cache;
pub mod channel;
pub mod checker;
pub mod error;
pub mod importer;
pub mod orchestrator;
pub mod parallel;

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::package::Package;

pub use cache::VersionCache;
pub use channel::{
    ChannelFlags, ChannelMap, ChannelResolution, merge_config_packages, prune_renamed,
    resolve_channels,
};
pub use checker::Checker;
pub use error::{ChannelError, UpdateError};
pub use importer::Importer;
pub use orchestrator::Updater;
pub use parallel::for_each_package;

/// Outcome of one operation on one package
#[derive(Debug)]
pub struct UpdateResult {
    /// Whether the operation changed anything (installed, or found outdated for `check`)
    pub updated: bool,
    pub package: Package,
    /// Progress text shown to the user on success
    pub summary: String,
    pub error: Option<UpdateError>,
    /// Binary name before a module rename changed it
    pub renamed_from: Option<String>,
}

impl UpdateResult {
    pub fn succeeded(package: Package, summary: String) -> Self {
        Self {
            updated: true,
            package,
            summary,
            error: None,
            renamed_from: None,
        }
    }

    /// Success without any change (e.g. already up to date)
    pub fn unchanged(package: Package, summary: String) -> Self {
        Self {
            updated: false,
            package,
            summary,
            error: None,
            renamed_from: None,
        }
    }

    pub fn failed(package: Package, error: UpdateError) -> Self {
        Self {
            updated: false,
            package,
            summary: String::new(),
            error: Some(error),
            renamed_from: None,
        }
    }

    pub fn canceled(package: Package) -> Self {
        let name = package.name.clone();
        Self::failed(package, UpdateError::Canceled { name })
    }

    pub fn with_renamed_from(self, old_name: String) -> Self {
        Self {
            renamed_from: Some(old_name),
            ..self
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Collected results of a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub results: Vec<UpdateResult>,
}

impl RunSummary {
    /// 0 when every package succeeded, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.results.iter().all(UpdateResult::is_success) {
            0
        } else {
            1
        }
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &Package> {
        self.results
            .iter()
            .filter(|r| r.is_success())
            .map(|r| &r.package)
    }

    pub fn failed(&self) -> impl Iterator<Item = &UpdateResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Old names of binaries that were replaced under a new name
    pub fn renamed(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.is_success())
            .filter_map(|r| r.renamed_from.as_deref())
    }
}

/// Drains `results`, calling `on_result(index, total, result)` as each one arrives.
pub async fn collect_results<F>(
    mut results: mpsc::Receiver<UpdateResult>,
    total: usize,
    mut on_result: F,
) -> RunSummary
where
    F: FnMut(usize, usize, &UpdateResult),
{
    let mut summary = RunSummary {
        results: Vec::with_capacity(total),
    };
    while let Some(result) = results.recv().await {
        on_result(summary.results.len(), total, &result);
        summary.results.push(result);
    }
    summary
}

/// Races `future` against `cancel`, returning `None` if canceled first.
pub(crate) async fn cancelable<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = T>,
) -> Option<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        value = future => Some(value),
    }
}
