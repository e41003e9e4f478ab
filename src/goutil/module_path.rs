//! Recovery from upstream module renames
//!
//! When a project changes the path declared in its go.mod, `go install` and
//! `go list` fail with:
//!
//! ```text
//! module declares its path as: github.com/air-verse/air
//!         but was required as: github.com/cosmtrek/air
//! ```
//!
//! This text is not a stable contract of the `go` command. Detection lives
//! behind [`MismatchDetector`] so a different strategy can replace
//! [`GoErrorTextDetector`] if the wording changes.

use std::sync::LazyLock;

use regex::Regex;

use crate::goutil::error::ToolchainError;
use crate::package::Package;

/// Paths reported by a module-path mismatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePathMismatch {
    /// Path the module declares in its go.mod
    pub declared: String,
    /// Path the module was requested with
    pub required: String,
}

/// Recognizes module-path mismatches in toolchain errors
pub trait MismatchDetector: Send + Sync {
    fn detect(&self, error: &ToolchainError) -> Option<ModulePathMismatch>;
}

static MISMATCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"module declares its path as:?\s*(\S+)\s+but was required as:?\s*(\S+)")
        .expect("valid module mismatch pattern")
});

/// Matches the free-text error printed by the `go` command
pub struct GoErrorTextDetector {
    pattern: &'static Regex,
}

impl GoErrorTextDetector {
    pub fn new() -> Self {
        Self {
            pattern: &MISMATCH_PATTERN,
        }
    }
}

impl Default for GoErrorTextDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MismatchDetector for GoErrorTextDetector {
    fn detect(&self, error: &ToolchainError) -> Option<ModulePathMismatch> {
        let text = match error {
            ToolchainError::CommandFailed { stderr, .. } => stderr.clone(),
            other => other.to_string(),
        };
        let captures = self.pattern.captures(&text)?;
        Some(ModulePathMismatch {
            declared: captures[1].to_string(),
            required: captures[2].to_string(),
        })
    }
}

/// Returns `package` moved to the declared module path, or `None` when
/// `error` is not a module-path mismatch.
pub fn resolve_module_path_change(
    detector: &dyn MismatchDetector,
    package: &Package,
    error: &ToolchainError,
) -> Option<Package> {
    let mismatch = detector.detect(error)?;
    let import_path =
        replace_import_path_prefix(&package.import_path, &mismatch.required, &mismatch.declared);
    Some(package.clone().with_paths(&import_path, &mismatch.declared))
}

/// Rewrites `import_path` from `old_module` to `new_module`.
///
/// An exact match is replaced wholesale, a sub-package keeps its suffix,
/// anything else falls back to `new_module`.
pub fn replace_import_path_prefix(import_path: &str, old_module: &str, new_module: &str) -> String {
    if import_path == old_module {
        return new_module.to_string();
    }
    match import_path.strip_prefix(old_module) {
        Some(suffix) if !old_module.is_empty() && suffix.starts_with('/') => {
            format!("{new_module}{suffix}")
        }
        _ => new_module.to_string(),
    }
}
