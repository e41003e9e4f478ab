use std::collections::HashMap;
use std::path::PathBuf;

use clap::Args;

use crate::cli::{go_command, installed_packages};
use crate::config::{self, ConfigPackage};
use crate::package::{Package, UpdateChannel};
use crate::print;

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// gup.json to write
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Print to STDOUT instead of writing gup.json
    #[arg(short = 'o', long)]
    pub output: bool,
}

/// Config entries for the installed packages, keeping channels saved in `persisted`.
///
/// Packages without an import path cannot be reinstalled and are skipped
/// with a warning.
pub fn packages_to_export(packages: &[Package], persisted: &[ConfigPackage]) -> Vec<ConfigPackage> {
    let saved_channels: HashMap<&str, UpdateChannel> = persisted
        .iter()
        .map(|p| (p.name.as_str(), p.channel))
        .collect();

    let mut exported: Vec<ConfigPackage> = packages
        .iter()
        .filter(|p| {
            if p.import_path.is_empty() {
                print::warn(format!(
                    "can't get '{}' package path information. old go version binary",
                    p.name
                ));
                return false;
            }
            true
        })
        .map(|p| {
            let channel = saved_channels
                .get(p.name.as_str())
                .copied()
                .unwrap_or_default();
            ConfigPackage::new(&p.name, &p.import_path, &p.version.current, channel).sanitized()
        })
        .collect();
    exported.sort_by(|a, b| a.name.cmp(&b.name));
    exported
}

pub async fn run(args: ExportArgs) -> i32 {
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

    let path = config::resolve_export_file_path(args.file.as_deref());
    let persisted = config::read_config_file_if_exists(&path);
    let exported = packages_to_export(&packages, &persisted);
    if exported.is_empty() {
        print::err("no package information");
        return 1;
    }

    let result = if args.output {
        config::write_config(std::io::stdout().lock(), &exported)
    } else {
        config::write_config_file(&path, &exported)
            .inspect(|_| print::info(format!("Export {}", path.display())))
    };
    match result {
        Ok(()) => 0,
        Err(e) => {
            print::err(e);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Version;

    #[test]
    fn packages_to_export_skips_missing_import_path_and_keeps_channels() {
        let packages = vec![
            Package::new("gopls", "golang.org/x/tools/gopls", "golang.org/x/tools/gopls")
                .with_version(Version::new("v0.16.0", "")),
            Package::new("legacy", "", ""),
            Package::new("air", "github.com/air-verse/air", "github.com/air-verse/air")
                .with_version(Version::new("(devel)", "")),
        ];
        let persisted = vec![ConfigPackage::new(
            "gopls",
            "golang.org/x/tools/gopls",
            "v0.15.0",
            UpdateChannel::Main,
        )];

        let exported = packages_to_export(&packages, &persisted);

        assert_eq!(
            exported,
            vec![
                ConfigPackage::new("air", "github.com/air-verse/air", "(devel)", UpdateChannel::Latest),
                ConfigPackage::new("gopls", "golang.org/x/tools/gopls", "v0.16.0", UpdateChannel::Main),
            ]
        );
    }
}
