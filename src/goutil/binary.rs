//! Binary naming rules for $GOBIN

use std::path::{Component, Path};

use tracing::{debug, info};

use crate::goutil::error::BinaryError;

/// Platform conventions used when naming and matching binaries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryNaming {
    windows: bool,
    /// Executable suffix appended on Windows ($GOEXE, default ".exe")
    exec_suffix: String,
}

impl BinaryNaming {
    pub fn new(windows: bool, goexe: Option<&str>) -> Self {
        let exec_suffix = if windows {
            match goexe.map(str::trim) {
                Some(suffix) if !suffix.is_empty() => suffix.to_string(),
                _ => ".exe".to_string(),
            }
        } else {
            String::new()
        };
        Self {
            windows,
            exec_suffix,
        }
    }

    /// Naming rules of the platform gup was built for, honouring $GOEXE.
    pub fn host() -> Self {
        Self::new(cfg!(windows), std::env::var("GOEXE").ok().as_deref())
    }

    pub fn is_windows(&self) -> bool {
        self.windows
    }

    pub fn exec_suffix(&self) -> &str {
        &self.exec_suffix
    }

    /// Name `go install` gives the binary built from `import_path`
    ///
    /// A trailing major-version element (`.../tool/v2`) is skipped, so the
    /// binary is named after the element before it.
    pub fn binary_name_from_import_path(&self, import_path: &str) -> String {
        let mut segments = import_path.trim_end_matches('/').rsplit('/');
        let last = segments.next().unwrap_or_default();
        let base = match segments.next() {
            Some(parent) if is_major_version_suffix(last) => parent,
            _ => last,
        };
        if self.windows && !self.has_exec_suffix(base) {
            return format!("{base}{}", self.exec_suffix);
        }
        base.to_string()
    }

    fn has_exec_suffix(&self, name: &str) -> bool {
        name.to_lowercase()
            .ends_with(&self.exec_suffix.to_lowercase())
    }

    /// Strips the executable suffix on Windows so "air.exe" and "air" match.
    pub fn strip_exec_suffix<'a>(&self, name: &'a str) -> &'a str {
        if self.windows && !self.exec_suffix.is_empty() && self.has_exec_suffix(name) {
            name.len()
                .checked_sub(self.exec_suffix.len())
                .and_then(|end| name.get(..end))
                .unwrap_or(name)
        } else {
            name
        }
    }

    /// Case-sensitive comparison, except on Windows which ignores case and
    /// the executable suffix.
    pub fn same_binary(&self, a: &str, b: &str) -> bool {
        if self.windows {
            self.strip_exec_suffix(a)
                .eq_ignore_ascii_case(self.strip_exec_suffix(b))
        } else {
            a == b
        }
    }
}

/// Matches `v[0-9]+`, the major-version element of a module path.
fn is_major_version_suffix(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Reports whether `name` can be joined onto $GOBIN without escaping it.
pub fn is_safe_binary_name(name: &str) -> bool {
    if name.trim().is_empty() || name.contains(['/', '\\']) {
        return false;
    }
    let path = Path::new(name);
    if path.is_absolute() {
        return false;
    }
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Removes `old_name` from `gobin` after a rename installed the binary as `new_name`.
///
/// Nothing is removed when the names refer to the same binary. A missing
/// old binary is not an error.
pub async fn remove_old_binary_if_renamed(
    naming: &BinaryNaming,
    gobin: &Path,
    old_name: &str,
    new_name: &str,
) -> Result<(), BinaryError> {
    for name in [old_name, new_name] {
        if !is_safe_binary_name(name) {
            return Err(BinaryError::UnsafeName(name.to_string()));
        }
    }
    if naming.same_binary(old_name, new_name) {
        return Ok(());
    }

    let old_binary_path = gobin.join(old_name);
    match tokio::fs::metadata(&old_binary_path).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Old binary {:?} is already gone", old_binary_path);
            return Ok(());
        }
        Err(source) => {
            return Err(BinaryError::Stat {
                path: old_binary_path,
                source,
            });
        }
    }

    match tokio::fs::remove_file(&old_binary_path).await {
        Ok(()) => {
            info!("Removed renamed binary {:?}", old_binary_path);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BinaryError::Remove {
            path: old_binary_path,
            source,
        }),
    }
}
