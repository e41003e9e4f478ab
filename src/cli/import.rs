use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;

use crate::cli::notify::{DesktopNotifier, notify_if_needed};
use crate::cli::signal::SignalCancel;
use crate::cli::targets::{clamp_jobs, default_jobs};
use crate::cli::{count_prefix, finish_dry_run, go_command, start_dry_run};
use crate::config::{self, ConfigPackage};
use crate::package::Package;
use crate::print;
use crate::update::{Importer, UpdateResult, collect_results};

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Perform the trial import with no changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable desktop notifications
    #[arg(short = 'N', long)]
    pub notify: bool,

    /// gup.json to import
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Number of packages processed in parallel
    #[arg(short = 'j', long, default_value_t = default_jobs(), allow_negative_numbers = true)]
    pub jobs: i64,
}

fn report_import(index: usize, total: usize, result: &UpdateResult) {
    let prefix = count_prefix(index, total);
    match &result.error {
        None => print::info(format!("{prefix} {}", result.summary)),
        Some(e) => print::err(format!("{prefix} {e}")),
    }
}

pub async fn run(args: ImportArgs) -> i32 {
    let Some(go) = go_command() else {
        return 1;
    };

    let path = config::resolve_import_file_path(args.file.as_deref());
    if !path.is_file() {
        print::err(format!("{} is not found", path.display()));
        return 1;
    }
    let recorded = match config::read_config_file(&path) {
        Ok(recorded) => recorded,
        Err(e) => {
            print::err(e);
            return 1;
        }
    };
    if recorded.is_empty() {
        print::err("unable to import package: no package information");
        return 1;
    }
    let packages: Vec<Package> = recorded.iter().map(ConfigPackage::to_package).collect();

    let dry_run_dir = if args.dry_run {
        match start_dry_run() {
            Ok(dir) => Some(dir),
            Err(e) => {
                print::err(format!("can not change to dry run mode: {e}"));
                return 1;
            }
        }
    } else {
        None
    };
    let installer = match &dry_run_dir {
        Some(dir) => go.with_gobin(dir.path()),
        None => go,
    };

    print::info(format!("start import based on {}", path.display()));
    let signals = SignalCancel::arm();
    let importer = Importer::new(Arc::new(installer));

    let total = packages.len();
    let results = Arc::new(importer).run(signals.token(), packages, clamp_jobs(args.jobs));
    let summary = collect_results(results, total, report_import).await;

    signals.disarm().await;
    finish_dry_run(dry_run_dir);

    let exit_code = summary.exit_code();
    notify_if_needed(&DesktopNotifier, exit_code, args.notify).await;
    exit_code
}
