use std::path::Path;
use std::sync::Arc;

use clap::Args;
use tracing::info;

use crate::cli::notify::{DesktopNotifier, notify_if_needed};
use crate::cli::signal::SignalCancel;
use crate::cli::targets::{clamp_jobs, default_jobs, exclude_packages, extract_user_specified};
use crate::cli::{
    finish_dry_run, go_command, installed_packages, report_result, start_dry_run, version_lookup,
};
use crate::config::{self, ConfigPackage};
use crate::goutil::binary::BinaryNaming;
use crate::package::Package;
use crate::print;
use crate::update::channel::should_persist_channels;
use crate::update::{
    ChannelFlags, Updater, VersionCache, collect_results, merge_config_packages, prune_renamed,
    resolve_channels,
};

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Binaries to update (all when omitted)
    pub names: Vec<String>,

    /// Perform the trial update with no changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable desktop notifications
    #[arg(short = 'N', long)]
    pub notify: bool,

    /// Binaries to leave untouched
    #[arg(short = 'e', long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Update these binaries from @main (falling back to @master)
    #[arg(short = 'm', long, value_delimiter = ',')]
    pub main: Vec<String>,

    /// Update these binaries from @master
    #[arg(long, value_delimiter = ',')]
    pub master: Vec<String>,

    /// Update these binaries from @latest
    #[arg(long, value_delimiter = ',')]
    pub latest: Vec<String>,

    /// Number of packages processed in parallel
    #[arg(short = 'j', long, default_value_t = default_jobs(), allow_negative_numbers = true)]
    pub jobs: i64,

    /// Don't update binaries only because they were built by an older go
    #[arg(long)]
    pub ignore_go_update: bool,

    /// Resolve latest versions through $GOPROXY instead of 'go list'
    #[arg(long)]
    pub proxy: bool,
}

pub async fn run(args: UpdateArgs) -> i32 {
    let Some(go) = go_command() else {
        return 1;
    };
    let (gobin, packages) = match installed_packages(&go).await {
        Ok(installed) => installed,
        Err(e) => {
            print::err(e);
            return 1;
        }
    };

    let naming = BinaryNaming::host();
    let packages = extract_user_specified(packages, &args.names, &naming);
    let packages = exclude_packages(packages, &args.exclude);
    if packages.is_empty() {
        print::err("unable to update package: no package information");
        return 1;
    }

    let config_read_path = config::resolve_import_file_path(None);
    let config_write_path = if config_read_path.is_file() {
        config_read_path.clone()
    } else {
        config::config_path()
    };
    let persisted = config::read_config_file_if_exists(&config_read_path);

    let flags = ChannelFlags {
        main: &args.main,
        master: &args.master,
        latest: &args.latest,
    };
    let resolution = match resolve_channels(&packages, &persisted, flags) {
        Ok(resolution) => resolution,
        Err(e) => {
            print::err(e);
            return 1;
        }
    };
    for name in &resolution.unknown {
        print::warn(format!("not found '{name}' package in update target"));
    }

    let lookup = match version_lookup(&go, args.proxy) {
        Ok(lookup) => lookup,
        Err(e) => {
            print::err(e);
            return 1;
        }
    };

    let dry_run_dir = if args.dry_run {
        match start_dry_run() {
            Ok(dir) => Some(dir),
            Err(e) => {
                print::err(format!("can not change to dry run mode: {e}"));
                notify_if_needed(&DesktopNotifier, 1, args.notify).await;
                return 1;
            }
        }
    } else {
        None
    };
    let (installer, install_dir) = match &dry_run_dir {
        Some(dir) => (go.clone().with_gobin(dir.path()), dir.path().to_path_buf()),
        None => (go.clone(), gobin),
    };

    print::info("update binary under $GOPATH/bin or $GOBIN");
    let signals = SignalCancel::arm();
    let updater = Updater::new(
        Arc::new(VersionCache::new(lookup)),
        Arc::new(installer),
        install_dir,
    )
    .with_naming(naming)
    .with_channels(resolution.channels.clone())
    .with_ignore_go_update(args.ignore_go_update);

    let total = packages.len();
    let results = Arc::new(updater).run(signals.token(), packages, clamp_jobs(args.jobs));
    let summary = collect_results(results, total, report_result).await;

    signals.disarm().await;
    finish_dry_run(dry_run_dir);

    let exit_code = summary.exit_code();
    if !args.dry_run && should_persist_channels(flags) {
        let succeeded: Vec<Package> = summary.succeeded().cloned().collect();
        let kept = prune_renamed(persisted, summary.renamed());
        let merged = merge_config_packages(&kept, &succeeded, &resolution.channels);
        save_config(&config_write_path, &merged);
    }

    notify_if_needed(&DesktopNotifier, exit_code, args.notify).await;
    exit_code
}

fn save_config(path: &Path, packages: &[ConfigPackage]) {
    match config::write_config_file(path, packages) {
        Ok(()) => info!("Saved update channels to {:?}", path),
        Err(e) => print::warn(format!("failed to write {}: {e}", path.display())),
    }
}
