//! Command-line surface
//!
//! Each subcommand lives in its own module and returns the process exit
//! code. Per-package failures are printed as they arrive; only whole-run
//! preconditions stop a command before any package is processed.

pub mod check;
pub mod export;
pub mod import;
pub mod list;
pub mod notify;
pub mod remove;
pub mod signal;
pub mod targets;
pub mod update;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tempfile::TempDir;
use tracing::warn;

use crate::goutil::discovery::discover_packages;
use crate::goutil::{GoCommand, GoProxyLookup, ToolchainError, VersionLookup};
use crate::package::Package;
use crate::print;
use crate::update::UpdateResult;

#[derive(Debug, Parser)]
#[command(name = "gup")]
#[command(version, about = "Update binaries installed by 'go install'")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Update binaries installed by 'go install'
    Update(update::UpdateArgs),
    /// Check the latest version of binaries installed by 'go install'
    Check(check::CheckArgs),
    /// Install binaries according to gup.json
    Import(import::ImportArgs),
    /// Export the installed binaries to gup.json
    Export(export::ExportArgs),
    /// List up binaries installed by 'go install'
    List,
    /// Remove binaries under $GOPATH/bin or $GOBIN
    #[command(alias = "rm")]
    Remove(remove::RemoveArgs),
}

/// Runs the parsed command and returns the exit code.
pub async fn run(cli: Cli) -> i32 {
    match cli.command {
        Command::Update(args) => update::run(args).await,
        Command::Check(args) => check::run(args).await,
        Command::Import(args) => import::run(args).await,
        Command::Export(args) => export::run(args).await,
        Command::List => list::run().await,
        Command::Remove(args) => remove::run(args).await,
    }
}

/// Locates `go`, printing the failure.
pub(crate) fn go_command() -> Option<GoCommand> {
    GoCommand::new().inspect_err(|e| print::err(e)).ok()
}

/// $GOBIN and the packages installed there
pub(crate) async fn installed_packages(
    go: &GoCommand,
) -> Result<(PathBuf, Vec<Package>), ToolchainError> {
    let gobin = go.gobin().await?;
    let local_go_version = go.go_version().await.unwrap_or_else(|e| {
        warn!("Can't get local go version: {}", e);
        String::new()
    });
    let packages = discover_packages(go, &gobin, &local_go_version).await?;
    Ok((gobin, packages))
}

/// `go list` by default, the module proxy with `--proxy`
pub(crate) fn version_lookup(
    go: &GoCommand,
    proxy: bool,
) -> Result<Arc<dyn VersionLookup>, ToolchainError> {
    if proxy {
        Ok(Arc::new(GoProxyLookup::from_env()?))
    } else {
        Ok(Arc::new(go.clone()))
    }
}

/// Temporary install directory used instead of $GOBIN by `--dry-run`
pub(crate) fn start_dry_run() -> std::io::Result<TempDir> {
    tempfile::Builder::new().prefix("gup-dry-run-").tempdir()
}

/// Removes the dry-run directory. Call only after signals are disarmed.
pub(crate) fn finish_dry_run(dir: Option<TempDir>) {
    let Some(dir) = dir else {
        return;
    };
    let path = dir.path().to_path_buf();
    if let Err(e) = dir.close() {
        print::warn(format!("can't remove dry run directory {}: {e}", path.display()));
    }
}

/// "[ 3/12]" style counter
pub(crate) fn count_prefix(index: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("[{:>width$}/{:>width$}]", index + 1, total)
}

/// Prints one result line, the summary on success and the error otherwise.
pub(crate) fn report_result(index: usize, total: usize, result: &UpdateResult) {
    let prefix = count_prefix(index, total);
    match &result.error {
        None => print::info(format!(
            "{prefix} {} ({})",
            result.package.import_path, result.summary
        )),
        Some(e) => print::err(format!("{prefix} {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 3, "[1/3]")]
    #[case(2, 12, "[ 3/12]")]
    #[case(99, 100, "[100/100]")]
    fn count_prefix_returns_expected(#[case] index: usize, #[case] total: usize, #[case] expected: &str) {
        assert_eq!(count_prefix(index, total), expected);
    }

    #[test]
    fn cli_parses_update_flags() {
        let cli = Cli::try_parse_from([
            "gup", "update", "air", "--main", "gopls,dlv", "--exclude", "gup", "-j", "0",
            "--dry-run",
        ])
        .unwrap();

        let Command::Update(args) = cli.command else {
            panic!("expected update command");
        };
        assert_eq!(args.names, vec!["air"]);
        assert_eq!(args.main, vec!["gopls", "dlv"]);
        assert_eq!(args.exclude, vec!["gup"]);
        assert_eq!(args.jobs, 0);
        assert!(args.dry_run);
    }

    #[test]
    fn cli_accepts_rm_alias() {
        let cli = Cli::try_parse_from(["gup", "rm", "air", "--force"]).unwrap();

        assert!(matches!(cli.command, Command::Remove(ref args) if args.force));
    }
}
