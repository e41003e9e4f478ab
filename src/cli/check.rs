use std::sync::Arc;

use clap::Args;

use crate::cli::signal::SignalCancel;
use crate::cli::targets::{clamp_jobs, default_jobs, extract_user_specified};
use crate::cli::{go_command, installed_packages, report_result, version_lookup};
use crate::goutil::binary::BinaryNaming;
use crate::print;
use crate::update::checker::update_suggestion;
use crate::update::{Checker, VersionCache, collect_results};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Binaries to check (all when omitted)
    pub names: Vec<String>,

    /// Number of packages processed in parallel
    #[arg(short = 'j', long, default_value_t = default_jobs(), allow_negative_numbers = true)]
    pub jobs: i64,

    /// Don't report binaries only because they were built by an older go
    #[arg(long)]
    pub ignore_go_update: bool,

    /// Resolve latest versions through $GOPROXY instead of 'go list'
    #[arg(long)]
    pub proxy: bool,
}

pub async fn run(args: CheckArgs) -> i32 {
    let Some(go) = go_command() else {
        return 1;
    };
    let packages = match installed_packages(&go).await {
        Ok((_, packages)) => packages,
        Err(e) => {
            print::err(e);
            return 1;
        }
    };
    let packages = extract_user_specified(packages, &args.names, &BinaryNaming::host());
    if packages.is_empty() {
        print::err("unable to check package: no package information");
        return 1;
    }

    let lookup = match version_lookup(&go, args.proxy) {
        Ok(lookup) => lookup,
        Err(e) => {
            print::err(e);
            return 1;
        }
    };

    print::info("check binary under $GOPATH/bin or $GOBIN");
    let signals = SignalCancel::arm();
    let checker = Checker::new(Arc::new(VersionCache::new(lookup)))
        .with_ignore_go_update(args.ignore_go_update);

    let total = packages.len();
    let results = Arc::new(checker).run(signals.token(), packages, clamp_jobs(args.jobs));
    let summary = collect_results(results, total, report_result).await;
    signals.disarm().await;

    let outdated = summary
        .results
        .iter()
        .filter(|r| r.is_success() && r.updated)
        .map(|r| &r.package);
    if let Some(suggestion) = update_suggestion(outdated) {
        print::info(suggestion);
    }

    summary.exit_code()
}
