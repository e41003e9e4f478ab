//! Installation of the packages recorded in gup.json

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::LATEST_KEYWORD;
use crate::goutil::Installer;
use crate::package::{Package, Version};
use crate::update::error::UpdateError;
use crate::update::parallel::for_each_package;
use crate::update::UpdateResult;

/// Version to install for a recorded version string
///
/// Development builds cannot be reinstalled at their version and are
/// installed at `latest` instead.
pub fn version_from_config(recorded: &str) -> Result<String, &'static str> {
    match recorded.trim() {
        "" => Err("version is empty in gup.json"),
        "(devel)" | "devel" => Ok(LATEST_KEYWORD.to_string()),
        version => Ok(version.to_string()),
    }
}

/// Installs every package at its recorded version
pub struct Importer {
    installer: Arc<dyn Installer>,
}

impl Importer {
    pub fn new(installer: Arc<dyn Installer>) -> Self {
        Self { installer }
    }

    pub fn run(
        self: Arc<Self>,
        cancel: CancellationToken,
        packages: Vec<Package>,
        jobs: usize,
    ) -> mpsc::Receiver<UpdateResult> {
        for_each_package(cancel, packages, jobs, move |_, package| {
            let importer = self.clone();
            async move { importer.import_package(package).await }
        })
    }

    pub async fn import_package(&self, package: Package) -> UpdateResult {
        let version = match version_from_config(&package.version.current) {
            Ok(version) => version,
            Err(reason) => {
                let name = package.name.clone();
                return UpdateResult::failed(
                    package,
                    UpdateError::InvalidVersion {
                        name,
                        reason: reason.to_string(),
                    },
                );
            }
        };
        if package.import_path.trim().is_empty() {
            let name = package.name.clone();
            return UpdateResult::failed(package, UpdateError::EmptyImportPath { name });
        }

        let package = package.with_version(Version::new(&version, ""));
        match self
            .installer
            .install_version(&package.import_path, &version)
            .await
        {
            Ok(()) => {
                let summary = format!("{}@{}", package.import_path, version);
                UpdateResult::succeeded(package, summary)
            }
            Err(source) if source.is_canceled() => UpdateResult::canceled(package),
            Err(source) => {
                let name = package.name.clone();
                UpdateResult::failed(package, UpdateError::Install { name, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goutil::ToolchainError;
    use crate::goutil::toolchain::MockInstaller;
    use rstest::rstest;

    #[rstest]
    #[case("v1.2.3", Ok("v1.2.3".to_string()))]
    #[case(" latest ", Ok("latest".to_string()))]
    #[case("(devel)", Ok("latest".to_string()))]
    #[case("devel", Ok("latest".to_string()))]
    #[case("  ", Err("version is empty in gup.json"))]
    fn version_from_config_returns_expected(
        #[case] recorded: &str,
        #[case] expected: Result<String, &'static str>,
    ) {
        assert_eq!(version_from_config(recorded), expected);
    }

    #[tokio::test]
    async fn installs_recorded_version() {
        let mut installer = MockInstaller::new();
        installer
            .expect_install_version()
            .withf(|path, version| path == "github.com/air-verse/air" && version == "v1.52.3")
            .times(1)
            .returning(|_, _| Ok(()));
        let package = Package::new("air", "github.com/air-verse/air", "")
            .with_version(Version::new("v1.52.3", ""));

        let result = Importer::new(Arc::new(installer))
            .import_package(package)
            .await;

        assert!(result.updated);
        assert_eq!(result.summary, "github.com/air-verse/air@v1.52.3");
    }

    #[tokio::test]
    async fn blank_import_path_is_an_error() {
        let package = Package::new("air", " ", "").with_version(Version::new("latest", ""));

        let result = Importer::new(Arc::new(MockInstaller::new()))
            .import_package(package)
            .await;

        assert!(matches!(result.error, Some(UpdateError::EmptyImportPath { .. })));
    }

    #[tokio::test]
    async fn install_failure_is_reported_with_name() {
        let mut installer = MockInstaller::new();
        installer.expect_install_version().returning(|_, _| {
            Err(ToolchainError::CommandFailed {
                command: "go install example.com/tool@v9.9.9".to_string(),
                stderr: "unknown revision v9.9.9".to_string(),
            })
        });
        let package = Package::new("tool", "example.com/tool", "")
            .with_version(Version::new("v9.9.9", ""));

        let result = Importer::new(Arc::new(installer))
            .import_package(package)
            .await;

        assert!(
            result
                .error
                .unwrap()
                .to_string()
                .starts_with("tool: 'go install example.com/tool@v9.9.9' failed")
        );
    }
}
