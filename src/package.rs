//! Package model for binaries installed by `go install`

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::goutil::version::{is_toolchain_up_to_date, is_up_to_date};

/// A current/latest version pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Version {
    pub current: String,
    pub latest: String,
}

impl Version {
    pub fn new(current: &str, latest: &str) -> Self {
        Self {
            current: current.to_string(),
            latest: latest.to_string(),
        }
    }
}

/// Upstream ref a package is updated from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UpdateChannel {
    /// `@latest`
    #[default]
    Latest,
    /// Repository default branch (`@main`, falling back to `@master`)
    Main,
    /// Literal `@master`
    Master,
}

impl UpdateChannel {
    /// Normalizes a free-form channel string. Anything unrecognized is `Latest`.
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "main" => UpdateChannel::Main,
            "master" => UpdateChannel::Master,
            _ => UpdateChannel::Latest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateChannel::Latest => "latest",
            UpdateChannel::Main => "main",
            UpdateChannel::Master => "master",
        }
    }
}

impl fmt::Display for UpdateChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UpdateChannel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UpdateChannel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| UpdateChannel::normalize(&s)).unwrap_or_default())
    }
}

/// One binary under $GOBIN
///
/// Values are never shared between workers; every step of the update
/// pipeline consumes a package and returns a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    /// File name of the binary
    pub name: String,
    /// Path used with `go install` (e.g. "golang.org/x/tools/gopls")
    pub import_path: String,
    /// Module root of `import_path`, empty if unknown
    pub module_path: String,
    /// Binary version
    pub version: Version,
    /// Toolchain the binary was built with / toolchain installed locally
    pub go_version: Version,
    pub update_channel: UpdateChannel,
}

impl Package {
    pub fn new(name: &str, import_path: &str, module_path: &str) -> Self {
        Self {
            name: name.to_string(),
            import_path: import_path.to_string(),
            module_path: module_path.to_string(),
            ..Default::default()
        }
    }

    pub fn with_version(self, version: Version) -> Self {
        Self { version, ..self }
    }

    pub fn with_go_version(self, go_version: Version) -> Self {
        Self { go_version, ..self }
    }

    pub fn with_latest_version(self, latest: &str) -> Self {
        let version = Version {
            latest: latest.to_string(),
            ..self.version
        };
        Self { version, ..self }
    }

    pub fn with_channel(self, update_channel: UpdateChannel) -> Self {
        Self {
            update_channel,
            ..self
        }
    }

    pub fn with_name(self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self
        }
    }

    pub fn with_paths(self, import_path: &str, module_path: &str) -> Self {
        Self {
            import_path: import_path.to_string(),
            module_path: module_path.to_string(),
            ..self
        }
    }

    /// Copies the latest versions into the current ones after a successful update.
    pub fn mark_updated(self) -> Self {
        let promote = |v: Version| {
            if v.latest.is_empty() {
                v
            } else {
                Version {
                    current: v.latest.clone(),
                    latest: v.latest,
                }
            }
        };
        Self {
            version: promote(self.version),
            go_version: promote(self.go_version),
            ..self
        }
    }

    pub fn is_package_up_to_date(&self) -> bool {
        is_up_to_date(&self.version.current, &self.version.latest)
    }

    pub fn is_go_up_to_date(&self) -> bool {
        is_toolchain_up_to_date(&self.go_version.current, &self.go_version.latest)
    }

    /// Progress text printed after an update, e.g. "v1.0.0 to v1.1.0, go1.22.0 to go1.22.4"
    pub fn current_to_latest_str(&self) -> String {
        if self.is_package_up_to_date() && self.is_go_up_to_date() {
            return format!(
                "Already up-to-date: {} / {}",
                display_version(&self.version.latest),
                display_version(&self.go_version.current)
            );
        }
        format!(
            "{} to {}, {} to {}",
            display_version(&self.version.current),
            display_version(&self.version.latest),
            display_version(&self.go_version.current),
            display_version(&self.go_version.latest)
        )
    }

    /// Status text printed by `check`
    pub fn version_check_result_str(&self) -> String {
        let package_status = if self.is_package_up_to_date() {
            display_version(&self.version.current).to_string()
        } else {
            format!(
                "current: {}, latest: {}",
                display_version(&self.version.current),
                display_version(&self.version.latest)
            )
        };
        let go_status = if self.is_go_up_to_date() {
            display_version(&self.go_version.current).to_string()
        } else {
            format!(
                "current: {}, installed: {}",
                display_version(&self.go_version.current),
                display_version(&self.go_version.latest)
            )
        };
        format!("{package_status} / {go_status}")
    }
}

fn display_version(version: &str) -> &str {
    if version.is_empty() {
        crate::config::UNKNOWN_VERSION
    } else {
        version
    }
}
