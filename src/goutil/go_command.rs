//! `go` command backed implementation of the toolchain collaborators

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use crate::goutil::error::ToolchainError;
use crate::goutil::toolchain::{Installer, VersionLookup};

/// Runs the `go` binary found on $PATH
#[derive(Debug, Clone)]
pub struct GoCommand {
    program: PathBuf,
    /// Install destination passed to child processes instead of the user's $GOBIN
    gobin_override: Option<PathBuf>,
}

impl GoCommand {
    /// Locates `go` on $PATH.
    pub fn new() -> Result<Self, ToolchainError> {
        let program = which::which("go").map_err(|e| ToolchainError::GoNotFound(e.to_string()))?;
        Ok(Self {
            program,
            gobin_override: None,
        })
    }

    /// Installs into `dir` instead of $GOBIN (used by dry runs).
    pub fn with_gobin(self, dir: &Path) -> Self {
        Self {
            gobin_override: Some(dir.to_path_buf()),
            ..self
        }
    }

    async fn run<I, S>(&self, args: I) -> Result<String, ToolchainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let command = std::iter::once("go".to_string())
            .chain(
                args.iter()
                    .map(|a| AsRef::<OsStr>::as_ref(a).to_string_lossy().into_owned()),
            )
            .collect::<Vec<_>>()
            .join(" ");
        debug!("Running {}", command);

        let mut cmd = Command::new(&self.program);
        cmd.args(&args).kill_on_drop(true);
        if let Some(dir) = &self.gobin_override {
            cmd.env("GOBIN", dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|source| ToolchainError::Spawn {
                command: command.clone(),
                source: source.into(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!("{} exited with {}: {}", command, output.status, stderr);
            return Err(ToolchainError::CommandFailed { command, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn install(&self, import_path: &str, version: &str) -> Result<(), ToolchainError> {
        let target = format!("{import_path}@{version}");
        self.run(["install", target.as_str()]).await?;
        info!("Installed {}", target);
        Ok(())
    }

    /// Version of the locally installed toolchain (e.g. "go1.22.4")
    pub async fn go_version(&self) -> Result<String, ToolchainError> {
        self.run(["env", "GOVERSION"]).await
    }

    /// Directory `go install` writes binaries to
    ///
    /// Priority: $GOBIN > `go env GOBIN` > first $GOPATH entry + "/bin".
    pub async fn gobin(&self) -> Result<PathBuf, ToolchainError> {
        if let Some(dir) = self.gobin_override.clone() {
            return Ok(dir);
        }
        if let Some(dir) = std::env::var_os("GOBIN").filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        let gobin = self.run(["env", "GOBIN"]).await?;
        if !gobin.is_empty() {
            return Ok(PathBuf::from(gobin));
        }
        let gopath = self.run(["env", "GOPATH"]).await?;
        std::env::split_paths(&gopath)
            .next()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.join("bin"))
            .ok_or_else(|| ToolchainError::InvalidResponse("$GOPATH is not set".to_string()))
    }

    /// Raw `go version -m <binary>` output
    pub async fn build_info(&self, binary: &Path) -> Result<String, ToolchainError> {
        self.run([OsStr::new("version"), OsStr::new("-m"), binary.as_os_str()])
            .await
    }
}

#[async_trait::async_trait]
impl VersionLookup for GoCommand {
    async fn latest_version(&self, module_path: &str) -> Result<String, ToolchainError> {
        let target = format!("{module_path}@latest");
        let version = self
            .run(["list", "-m", "-f", "{{.Version}}", target.as_str()])
            .await?;
        if version.is_empty() {
            return Err(ToolchainError::InvalidResponse(format!(
                "no version reported for {module_path}"
            )));
        }
        Ok(version)
    }
}

#[async_trait::async_trait]
impl Installer for GoCommand {
    async fn install_latest(&self, import_path: &str) -> Result<(), ToolchainError> {
        self.install(import_path, "latest").await
    }

    async fn install_main_or_master(&self, import_path: &str) -> Result<(), ToolchainError> {
        match self.install(import_path, "main").await {
            Err(e) if !e.is_canceled() => {
                debug!("@main failed for {}, retrying with @master: {}", import_path, e);
                self.install(import_path, "master").await
            }
            result => result,
        }
    }

    async fn install_version(
        &self,
        import_path: &str,
        version: &str,
    ) -> Result<(), ToolchainError> {
        self.install(import_path, version).await
    }
}
