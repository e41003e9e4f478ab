//! Freshness check without installing

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::goutil::module_path::{GoErrorTextDetector, MismatchDetector};
use crate::package::Package;
use crate::update::cache::VersionCache;
use crate::update::error::UpdateError;
use crate::update::orchestrator::resolve_latest;
use crate::update::parallel::for_each_package;
use crate::update::UpdateResult;

/// Reports which packages `update` would reinstall
///
/// A result is `updated` when the package is outdated.
pub struct Checker {
    cache: Arc<VersionCache>,
    detector: Arc<dyn MismatchDetector>,
    ignore_go_update: bool,
}

impl Checker {
    pub fn new(cache: Arc<VersionCache>) -> Self {
        Self {
            cache,
            detector: Arc::new(GoErrorTextDetector::new()),
            ignore_go_update: false,
        }
    }

    pub fn with_ignore_go_update(self, ignore_go_update: bool) -> Self {
        Self {
            ignore_go_update,
            ..self
        }
    }

    pub fn run(
        self: Arc<Self>,
        cancel: CancellationToken,
        packages: Vec<Package>,
        jobs: usize,
    ) -> mpsc::Receiver<UpdateResult> {
        for_each_package(cancel, packages, jobs, move |cancel, package| {
            let checker = self.clone();
            async move { checker.check_package(&cancel, package).await }
        })
    }

    pub async fn check_package(&self, cancel: &CancellationToken, package: Package) -> UpdateResult {
        if package.module_path.is_empty() {
            let name = package.name.clone();
            return UpdateResult::failed(package, UpdateError::UnknownModulePath { name });
        }

        match resolve_latest(&self.cache, self.detector.as_ref(), cancel, &package).await {
            Ok(freshness) => {
                let outdated = freshness.needs_update(self.ignore_go_update);
                let summary = freshness.package.version_check_result_str();
                if outdated {
                    UpdateResult::succeeded(freshness.package, summary)
                } else {
                    UpdateResult::unchanged(freshness.package, summary)
                }
            }
            Err(e) => UpdateResult::failed(package, e),
        }
    }
}

/// Command suggested to the user for the outdated packages
pub fn update_suggestion<'a>(outdated: impl IntoIterator<Item = &'a Package>) -> Option<String> {
    let names: Vec<&str> = outdated.into_iter().map(|p| p.name.as_str()).collect();
    if names.is_empty() {
        return None;
    }
    Some(format!(
        "If you want to update binaries, run the following command.\n           $ gup update {}",
        names.join(" ")
    ))
}
