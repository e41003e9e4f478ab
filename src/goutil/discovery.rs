//! Discovery of binaries under $GOBIN and their embedded build info

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::goutil::error::ToolchainError;
use crate::goutil::go_command::GoCommand;
use crate::package::{Package, Version};

/// Build metadata embedded by `go build`, as printed by `go version -m`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInfo {
    /// Toolchain that built the binary (e.g. "go1.22.4")
    pub go_version: String,
    /// Main package path (`path` line)
    pub path: String,
    /// Main module path (`mod` line)
    pub module_path: String,
    /// Main module version (`mod` line)
    pub module_version: String,
}

/// Parses `go version -m` output:
///
/// ```text
/// /home/user/go/bin/gopls: go1.22.4
///         path    golang.org/x/tools/gopls
///         mod     golang.org/x/tools/gopls        v0.16.0 h1:...
///         dep     ...
/// ```
pub fn parse_build_info(output: &str) -> BuildInfo {
    let mut info = BuildInfo::default();
    let mut lines = output.lines();

    if let Some(header) = lines.next() {
        info.go_version = header
            .rsplit_once(": ")
            .map(|(_, v)| v.trim().to_string())
            .unwrap_or_default();
    }

    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            ["path", path, ..] => info.path = path.to_string(),
            ["mod", module, version, ..] => {
                info.module_path = module.to_string();
                info.module_version = version.to_string();
            }
            ["mod", module] => info.module_path = module.to_string(),
            _ => {}
        }
    }

    info
}

/// Builds the package for binary `name` from its build info.
pub fn package_from_build_info(name: &str, info: &BuildInfo, local_go_version: &str) -> Package {
    Package::new(name, &info.path, &info.module_path)
        .with_version(Version::new(&info.module_version, ""))
        .with_go_version(Version::new(&info.go_version, local_go_version))
}

/// Lists regular, non-hidden files directly under `gobin`, sorted by path.
pub fn binary_paths(gobin: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(gobin)? {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !entry.file_type()?.is_file() {
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

/// Reads build info for every binary in `gobin`.
///
/// Binaries without build info (not built by `go install`, or built by a
/// Go release too old to embed it) are returned with an empty import path.
pub async fn discover_packages(
    go: &GoCommand,
    gobin: &Path,
    local_go_version: &str,
) -> Result<Vec<Package>, ToolchainError> {
    let paths = binary_paths(gobin).map_err(|source| ToolchainError::ReadGoBin {
        path: gobin.to_path_buf(),
        source: source.into(),
    })?;

    let mut packages = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let info = match go.build_info(&path).await {
            Ok(output) => parse_build_info(&output),
            Err(e) => {
                warn!("Can't read build info of {:?}: {}", path, e);
                BuildInfo::default()
            }
        };
        debug!("Discovered {} ({:?})", name, info);
        packages.push(package_from_build_info(&name, &info, local_go_version));
    }
    Ok(packages)
}
