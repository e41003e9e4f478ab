//! Scripted Go toolchain that records every call

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use gup::goutil::{Installer, ToolchainError, VersionLookup};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Lookup(String),
    InstallLatest(String),
    InstallMainOrMaster(String),
    InstallVersion(String, String),
}

impl Call {
    fn is_install(&self) -> bool {
        !matches!(self, Call::Lookup(_))
    }
}

/// `go` stand-in with per-path results
///
/// Unknown modules fail lookup with `NotFound`; unknown import paths
/// install successfully.
#[derive(Default)]
pub struct FakeToolchain {
    latest: HashMap<String, Result<String, ToolchainError>>,
    install_errors: HashMap<String, ToolchainError>,
    lookup_delay: Duration,
    calls: Mutex<Vec<Call>>,
}

impl FakeToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latest(mut self, module_path: &str, version: &str) -> Self {
        self.latest
            .insert(module_path.to_string(), Ok(version.to_string()));
        self
    }

    pub fn with_lookup_error(mut self, module_path: &str, error: ToolchainError) -> Self {
        self.latest.insert(module_path.to_string(), Err(error));
        self
    }

    pub fn with_install_error(mut self, import_path: &str, error: ToolchainError) -> Self {
        self.install_errors.insert(import_path.to_string(), error);
        self
    }

    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn install_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_install).collect()
    }

    pub fn lookup_count(&self, module_path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Lookup(m) if m == module_path))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn install_result(&self, import_path: &str) -> Result<(), ToolchainError> {
        match self.install_errors.get(import_path) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VersionLookup for FakeToolchain {
    async fn latest_version(&self, module_path: &str) -> Result<String, ToolchainError> {
        self.record(Call::Lookup(module_path.to_string()));
        if !self.lookup_delay.is_zero() {
            tokio::time::sleep(self.lookup_delay).await;
        }
        self.latest
            .get(module_path)
            .cloned()
            .unwrap_or_else(|| Err(ToolchainError::NotFound(module_path.to_string())))
    }
}

#[async_trait]
impl Installer for FakeToolchain {
    async fn install_latest(&self, import_path: &str) -> Result<(), ToolchainError> {
        self.record(Call::InstallLatest(import_path.to_string()));
        self.install_result(import_path)
    }

    async fn install_main_or_master(&self, import_path: &str) -> Result<(), ToolchainError> {
        self.record(Call::InstallMainOrMaster(import_path.to_string()));
        self.install_result(import_path)
    }

    async fn install_version(&self, import_path: &str, version: &str) -> Result<(), ToolchainError> {
        self.record(Call::InstallVersion(
            import_path.to_string(),
            version.to_string(),
        ));
        self.install_result(import_path)
    }
}

/// Error `go` prints when a module's go.mod declares another path
pub fn mismatch_error(declared: &str, required: &str) -> ToolchainError {
    ToolchainError::CommandFailed {
        command: format!("go install {required}@latest"),
        stderr: format!(
            "go: {required}@latest: version constraints conflict:\n\
             \t{required}@v1.0.0: parsing go.mod:\n\
             \tmodule declares its path as: {declared}\n\
             \t        but was required as: {required}"
        ),
    }
}
