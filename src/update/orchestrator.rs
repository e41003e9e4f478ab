//! Per-package update state machine
//!
//! ```text
//! Start -> EligibilityCheck -> SkipUpToDate
//!                           -> Install -> [ModulePathRetry] -> [RemoveOldBinary] -> Done
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::goutil::binary::{BinaryNaming, remove_old_binary_if_renamed};
use crate::goutil::module_path::{GoErrorTextDetector, MismatchDetector, resolve_module_path_change};
use crate::goutil::{Installer, ToolchainError};
use crate::package::{Package, UpdateChannel};
use crate::update::cache::VersionCache;
use crate::update::channel::{ChannelMap, package_update_channel};
use crate::update::error::UpdateError;
use crate::update::parallel::for_each_package;
use crate::update::UpdateResult;

/// Package with its latest version resolved
pub(crate) struct Freshness {
    pub package: Package,
    /// The lookup moved the package to a new module path
    pub module_path_changed: bool,
}

impl Freshness {
    pub fn needs_update(&self, ignore_go_update: bool) -> bool {
        self.module_path_changed
            || !self.package.is_package_up_to_date()
            || (!ignore_go_update && !self.package.is_go_up_to_date())
    }
}

fn lookup_error(name: &str, source: ToolchainError) -> UpdateError {
    if source.is_canceled() {
        UpdateError::Canceled {
            name: name.to_string(),
        }
    } else {
        UpdateError::Lookup {
            name: name.to_string(),
            source,
        }
    }
}

fn install_error(name: &str, source: ToolchainError) -> UpdateError {
    if source.is_canceled() {
        UpdateError::Canceled {
            name: name.to_string(),
        }
    } else {
        UpdateError::Install {
            name: name.to_string(),
            source,
        }
    }
}

/// Looks up the latest version of `package`, following one module rename.
///
/// `package.module_path` must not be empty.
pub(crate) async fn resolve_latest(
    cache: &VersionCache,
    detector: &dyn MismatchDetector,
    cancel: &CancellationToken,
    package: &Package,
) -> Result<Freshness, UpdateError> {
    let error = match cache.get(cancel, &package.module_path).await {
        Ok(latest) => {
            return Ok(Freshness {
                package: package.clone().with_latest_version(&latest),
                module_path_changed: false,
            });
        }
        Err(e) => e,
    };

    let Some(moved) = resolve_module_path_change(detector, package, &error) else {
        return Err(lookup_error(&package.name, error));
    };
    info!(
        "{}: module moved from {} to {}",
        package.name, package.module_path, moved.module_path
    );

    let latest = cache
        .get(cancel, &moved.module_path)
        .await
        .map_err(|e| lookup_error(&package.name, e))?;
    Ok(Freshness {
        package: moved.with_latest_version(&latest),
        module_path_changed: true,
    })
}

/// Reinstalls outdated packages
///
/// When a package ends up under a new module path, either because the
/// install was retried at the declared path or because the lookup already
/// followed the move, the binary is installed under the name derived from
/// the new import path and an old binary with a different name is removed
/// from $GOBIN.
pub struct Updater {
    cache: Arc<VersionCache>,
    installer: Arc<dyn Installer>,
    detector: Arc<dyn MismatchDetector>,
    naming: BinaryNaming,
    gobin: PathBuf,
    channels: ChannelMap,
    ignore_go_update: bool,
}

impl Updater {
    pub fn new(cache: Arc<VersionCache>, installer: Arc<dyn Installer>, gobin: PathBuf) -> Self {
        Self {
            cache,
            installer,
            detector: Arc::new(GoErrorTextDetector::new()),
            naming: BinaryNaming::host(),
            gobin,
            channels: ChannelMap::new(),
            ignore_go_update: false,
        }
    }

    pub fn with_channels(self, channels: ChannelMap) -> Self {
        Self { channels, ..self }
    }

    pub fn with_detector(self, detector: Arc<dyn MismatchDetector>) -> Self {
        Self { detector, ..self }
    }

    pub fn with_naming(self, naming: BinaryNaming) -> Self {
        Self { naming, ..self }
    }

    /// Skip packages that are current even if built by an older toolchain.
    pub fn with_ignore_go_update(self, ignore_go_update: bool) -> Self {
        Self {
            ignore_go_update,
            ..self
        }
    }

    /// Updates every package on up to `jobs` workers.
    pub fn run(
        self: Arc<Self>,
        cancel: CancellationToken,
        packages: Vec<Package>,
        jobs: usize,
    ) -> mpsc::Receiver<UpdateResult> {
        for_each_package(cancel, packages, jobs, move |cancel, package| {
            let updater = self.clone();
            async move { updater.update_package(&cancel, package).await }
        })
    }

    pub async fn update_package(&self, cancel: &CancellationToken, package: Package) -> UpdateResult {
        let (package, module_path_changed) = if package.module_path.is_empty() {
            debug!("{}: module path unknown, updating unconditionally", package.name);
            (package, false)
        } else {
            match resolve_latest(&self.cache, self.detector.as_ref(), cancel, &package).await {
                Ok(freshness) if !freshness.needs_update(self.ignore_go_update) => {
                    debug!("{}: already up to date", freshness.package.name);
                    let summary = freshness.package.current_to_latest_str();
                    return UpdateResult::unchanged(freshness.package.mark_updated(), summary);
                }
                Ok(freshness) => (freshness.package, freshness.module_path_changed),
                Err(e) => return UpdateResult::failed(package, e),
            }
        };

        if package.import_path.is_empty() {
            let name = package.name.clone();
            return UpdateResult::failed(package, UpdateError::EmptyImportPath { name });
        }

        let original_name = package.name.clone();
        let channel = package_update_channel(&package.name, package.update_channel, &self.channels);
        let package = package.with_channel(channel);

        let (package, renamed) = match self.install(&package.import_path, channel).await {
            Ok(()) => (package, module_path_changed),
            Err(e) => {
                let Some(moved) = resolve_module_path_change(self.detector.as_ref(), &package, &e)
                else {
                    return UpdateResult::failed(package, install_error(&original_name, e));
                };
                info!(
                    "{}: install path moved to {}, retrying",
                    original_name, moved.import_path
                );
                if let Err(e) = self.install(&moved.import_path, channel).await {
                    return UpdateResult::failed(moved, install_error(&original_name, e));
                }
                (moved, true)
            }
        };

        if !renamed {
            let summary = package.current_to_latest_str();
            return UpdateResult::succeeded(package.mark_updated(), summary);
        }

        let new_name = self.naming.binary_name_from_import_path(&package.import_path);
        let package = package.with_name(&new_name);
        if let Err(source) =
            remove_old_binary_if_renamed(&self.naming, &self.gobin, &original_name, &new_name).await
        {
            return UpdateResult::failed(
                package,
                UpdateError::RemoveOldBinary {
                    name: original_name,
                    source,
                },
            );
        }

        let summary = package.current_to_latest_str();
        let result = UpdateResult::succeeded(package.mark_updated(), summary);
        if self.naming.same_binary(&original_name, &new_name) {
            result
        } else {
            result.with_renamed_from(original_name)
        }
    }

    async fn install(&self, import_path: &str, channel: UpdateChannel) -> Result<(), ToolchainError> {
        debug!("Installing {} from {} channel", import_path, channel);
        match channel {
            UpdateChannel::Latest => self.installer.install_latest(import_path).await,
            UpdateChannel::Main => self.installer.install_main_or_master(import_path).await,
            UpdateChannel::Master => self.installer.install_version(import_path, "master").await,
        }
    }
}
