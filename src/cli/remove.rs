use std::path::{Path, PathBuf};

use clap::Args;
use thiserror::Error;
use tracing::debug;

use crate::cli::go_command;
use crate::goutil::binary::{BinaryNaming, is_safe_binary_name};
use crate::print;

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Binaries to remove
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Remove without asking
    #[arg(short = 'f', long)]
    pub force: bool,
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum RemoveTargetError {
    #[error("invalid command name: {0}")]
    InvalidName(String),
}

/// Path of binary `name` in `gobin`, with the executable suffix added on Windows.
pub fn removal_target(gobin: &Path, name: &str, naming: &BinaryNaming) -> Result<PathBuf, RemoveTargetError> {
    let mut file_name = name.to_string();
    if naming.is_windows() && !file_name.ends_with(naming.exec_suffix()) {
        file_name.push_str(naming.exec_suffix());
    }
    if !is_safe_binary_name(&file_name) {
        return Err(RemoveTargetError::InvalidName(name.to_string()));
    }
    Ok(gobin.join(file_name))
}

pub async fn run(args: RemoveArgs) -> i32 {
    let Some(go) = go_command() else {
        return 1;
    };
    let gobin = match go.gobin().await {
        Ok(gobin) => gobin,
        Err(e) => {
            print::err(e);
            return 1;
        }
    };

    let naming = BinaryNaming::host();
    let mut exit_code = 0;
    for name in &args.names {
        let target = match removal_target(&gobin, name, &naming) {
            Ok(target) => target,
            Err(e) => {
                print::err(e);
                exit_code = 1;
                continue;
            }
        };
        if !target.is_file() {
            print::err(format!("no such file or directory: {}", target.display()));
            exit_code = 1;
            continue;
        }

        if !args.force {
            let confirmed = print::question(&format!("remove {}?", target.display()))
                .unwrap_or_else(|e| {
                    debug!("Can't read answer: {}", e);
                    false
                });
            if !confirmed {
                print::info(format!("cancel removal {}", target.display()));
                continue;
            }
        }

        match tokio::fs::remove_file(&target).await {
            Ok(()) => print::info(format!("removed {}", target.display())),
            Err(e) => {
                print::err(format!("can't remove {}: {e}", target.display()));
                exit_code = 1;
            }
        }
    }
    exit_code
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(false, "air", Ok(PathBuf::from("/go/bin/air")))]
    #[case(true, "air", Ok(PathBuf::from("/go/bin/air.exe")))]
    #[case(true, "air.exe", Ok(PathBuf::from("/go/bin/air.exe")))]
    #[case(false, "../etc/passwd", Err(RemoveTargetError::InvalidName("../etc/passwd".to_string())))]
    #[case(false, "..", Err(RemoveTargetError::InvalidName("..".to_string())))]
    fn removal_target_returns_expected(
        #[case] windows: bool,
        #[case] name: &str,
        #[case] expected: Result<PathBuf, RemoveTargetError>,
    ) {
        let naming = BinaryNaming::new(windows, None);
        assert_eq!(removal_target(Path::new("/go/bin"), name, &naming), expected);
    }
}
