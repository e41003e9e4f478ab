use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::package::{Package, UpdateChannel, Version};

// =============================================================================
// Constants
// =============================================================================

/// Name used for the config and data directories
pub const APP_NAME: &str = "gup";

/// Persisted package list
pub const CONFIG_FILE_NAME: &str = "gup.json";

/// Current layout of [`ConfigFile`]
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Version keyword meaning "whatever is newest upstream"
pub const LATEST_KEYWORD: &str = "latest";

/// Placeholder for a version that could not be determined
pub const UNKNOWN_VERSION: &str = "unknown";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid {CONFIG_FILE_NAME}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("can not make config directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't update {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't write {CONFIG_FILE_NAME}: {0}")]
    Serialize(#[from] serde_json::Error),
}

// =============================================================================
// File format
// =============================================================================

/// On-disk layout of gup.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub packages: Vec<ConfigPackage>,
}

fn default_schema_version() -> u32 {
    CONFIG_SCHEMA_VERSION
}

fn default_version() -> String {
    LATEST_KEYWORD.to_string()
}

/// One persisted binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPackage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub import_path: String,
    /// Version to install on import, `latest` when unpinned
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub channel: UpdateChannel,
}

impl ConfigPackage {
    pub fn new(name: &str, import_path: &str, version: &str, channel: UpdateChannel) -> Self {
        Self {
            name: name.to_string(),
            import_path: import_path.to_string(),
            version: version.to_string(),
            channel,
        }
    }

    /// Trims every field and defaults a blank version to `latest`.
    pub fn sanitized(&self) -> Self {
        let version = match self.version.trim() {
            "" => LATEST_KEYWORD,
            v => v,
        };
        Self::new(
            self.name.trim(),
            self.import_path.trim(),
            version,
            self.channel,
        )
    }

    pub fn to_package(&self) -> Package {
        Package::new(&self.name, &self.import_path, "")
            .with_version(Version::new(&self.version, ""))
            .with_channel(self.channel)
    }
}

// =============================================================================
// Paths
// =============================================================================

/// Returns the path to the config directory for gup.
/// Uses $XDG_CONFIG_HOME/gup if XDG_CONFIG_HOME is set,
/// otherwise falls back to ~/.config/gup,
/// or ./gup if neither is available.
pub fn config_dir() -> PathBuf {
    base_dir_with_env(
        std::env::var("XDG_CONFIG_HOME").ok(),
        dirs::home_dir(),
        ".config",
    )
}

/// Returns the default path of gup.json.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Returns gup.json in the current directory.
pub fn local_config_path() -> PathBuf {
    PathBuf::from(".").join(CONFIG_FILE_NAME)
}

/// Returns the path to the data directory for gup.
/// Uses $XDG_DATA_HOME/gup if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/gup.
pub fn data_dir() -> PathBuf {
    base_dir_with_env(
        std::env::var("XDG_DATA_HOME").ok(),
        dirs::home_dir(),
        ".local/share",
    )
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("gup.log")
}

fn base_dir_with_env(xdg_home: Option<String>, home_dir: Option<PathBuf>, fallback: &str) -> PathBuf {
    let base = xdg_home
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(fallback)))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join(APP_NAME)
}

/// Config file read by `import` (and by `update` for saved channels).
///
/// Priority: explicit path > default path (if it exists) > ./gup.json (if it
/// exists) > default path.
pub fn resolve_import_file_path(explicit: Option<&Path>) -> PathBuf {
    resolve_import_file_path_with(explicit, &config_path(), &local_config_path())
}

fn resolve_import_file_path_with(explicit: Option<&Path>, default: &Path, local: &Path) -> PathBuf {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return path.to_path_buf();
    }
    if default.is_file() {
        return default.to_path_buf();
    }
    if local.is_file() {
        return local.to_path_buf();
    }
    default.to_path_buf()
}

/// Config file written by `export`. Priority: explicit path > default path.
pub fn resolve_export_file_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(config_path)
}

// =============================================================================
// Read / write
// =============================================================================

pub fn read_config_file(path: &Path) -> Result<Vec<ConfigPackage>, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigFile =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if file.schema_version > CONFIG_SCHEMA_VERSION {
        warn!(
            "{:?} has schema version {}, newer than supported {}",
            path, file.schema_version, CONFIG_SCHEMA_VERSION
        );
    }
    Ok(file.packages)
}

/// Best-effort read: a missing, unreadable or malformed file is an empty list.
pub fn read_config_file_if_exists(path: &Path) -> Vec<ConfigPackage> {
    if !path.is_file() {
        return Vec::new();
    }
    read_config_file(path)
        .inspect_err(|e| debug!("Ignoring config file: {}", e))
        .unwrap_or_default()
}

/// Serializes `packages` as pretty JSON followed by a newline.
pub fn write_config<W: Write>(mut writer: W, packages: &[ConfigPackage]) -> Result<(), ConfigError> {
    let file = ConfigFile {
        schema_version: CONFIG_SCHEMA_VERSION,
        packages: packages.to_vec(),
    };
    serde_json::to_writer_pretty(&mut writer, &file)?;
    writer
        .write_all(b"\n")
        .map_err(|e| ConfigError::Serialize(serde_json::Error::io(e)))
}

/// Atomically replaces `path` with `packages`.
///
/// Writes a temp file next to `path`, syncs it and renames it into place.
/// If the rename cannot overwrite the destination, the destination is moved
/// to a backup name first and restored if the second rename fails. The
/// original file is untouched and no temp file is left behind on failure.
pub fn write_config_file(path: &Path, packages: &[ConfigPackage]) -> Result<(), ConfigError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|source| ConfigError::CreateDir {
        path: dir.clone(),
        source,
    })?;

    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = tempfile::Builder::new()
        .prefix(&format!("{CONFIG_FILE_NAME}.tmp-"))
        .tempfile_in(&dir)
        .map_err(write_err)?;
    write_config(temp.as_file_mut(), packages)?;
    temp.as_file().sync_all().map_err(write_err)?;

    match temp.persist(path) {
        Ok(_) => {}
        Err(e) if path.exists() => {
            debug!("Rename over {:?} failed ({}), swapping via backup", path, e.error);
            replace_with_backup_swap(e.file, path, &dir).map_err(write_err)?;
        }
        Err(e) => return Err(write_err(e.error)),
    }

    info!("Wrote {:?}", path);
    Ok(())
}

fn replace_with_backup_swap(
    temp: tempfile::NamedTempFile,
    path: &Path,
    dir: &Path,
) -> std::io::Result<()> {
    let backup = tempfile::Builder::new()
        .prefix(&format!("{CONFIG_FILE_NAME}.bak-"))
        .tempfile_in(dir)?
        .into_temp_path();
    let backup_path = backup.to_path_buf();
    backup.close()?;

    fs::rename(path, &backup_path)?;
    if let Err(e) = temp.persist(path) {
        if let Err(restore) = fs::rename(&backup_path, path) {
            warn!(
                "Can't restore original file {:?} after failed update: {}",
                path, restore
            );
        }
        return Err(e.error);
    }

    let _ = fs::remove_file(&backup_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_packages() -> Vec<ConfigPackage> {
        vec![
            ConfigPackage::new("air", "github.com/air-verse/air", "v1.52.3", UpdateChannel::Latest),
            ConfigPackage::new("gopls", "golang.org/x/tools/gopls", "latest", UpdateChannel::Main),
        ]
    }

    #[test]
    fn write_then_read_config_file_preserves_packages() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(CONFIG_FILE_NAME);

        write_config_file(&path, &sample_packages()).unwrap();

        assert_eq!(read_config_file(&path).unwrap(), sample_packages());
    }

    #[test]
    fn write_config_file_replaces_existing_file_without_leftovers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "old content").unwrap();

        write_config_file(&path, &sample_packages()).unwrap();

        assert_eq!(read_config_file(&path).unwrap(), sample_packages());
        let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn read_config_file_defaults_missing_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{"packages":[{"name":"air","import_path":"github.com/air-verse/air","channel":"trunk"}]}"#,
        )
        .unwrap();

        let packages = read_config_file(&path).unwrap();

        assert_eq!(
            packages,
            vec![ConfigPackage::new("air", "github.com/air-verse/air", "latest", UpdateChannel::Latest)]
        );
    }

    #[test]
    fn read_config_file_rejects_malformed_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "air = github.com/air-verse/air@latest\n").unwrap();

        assert!(matches!(
            read_config_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn read_config_file_if_exists_returns_empty_for_malformed_or_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        assert!(read_config_file_if_exists(&path).is_empty());

        fs::write(&path, "not json").unwrap();
        assert!(read_config_file_if_exists(&path).is_empty());
    }

    #[test]
    fn sanitized_trims_fields_and_defaults_version() {
        let package = ConfigPackage::new(" air ", " github.com/air-verse/air\t", "  ", UpdateChannel::Master);

        assert_eq!(
            package.sanitized(),
            ConfigPackage::new("air", "github.com/air-verse/air", "latest", UpdateChannel::Master)
        );
    }

    #[test]
    fn base_dir_with_env_uses_xdg_home_when_set() {
        let path = base_dir_with_env(
            Some("/tmp/test-config".to_string()),
            Some(PathBuf::from("/home/user")),
            ".config",
        );

        assert_eq!(path, PathBuf::from("/tmp/test-config/gup"));
    }

    #[test]
    fn base_dir_with_env_falls_back_to_home() {
        let path = base_dir_with_env(None, Some(PathBuf::from("/home/user")), ".local/share");

        assert_eq!(path, PathBuf::from("/home/user/.local/share/gup"));
    }

    #[test]
    fn base_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = base_dir_with_env(Some(String::new()), None, ".config");
        assert_eq!(path, PathBuf::from("./gup"));
    }

    #[test]
    fn resolve_import_file_path_prefers_explicit_then_existing_files() {
        let temp_dir = TempDir::new().unwrap();
        let default = temp_dir.path().join("default.json");
        let local = temp_dir.path().join("local.json");
        let explicit = temp_dir.path().join("explicit.json");

        assert_eq!(
            resolve_import_file_path_with(Some(&explicit), &default, &local),
            explicit
        );
        assert_eq!(resolve_import_file_path_with(None, &default, &local), default);

        fs::write(&local, "{}").unwrap();
        assert_eq!(resolve_import_file_path_with(None, &default, &local), local);

        fs::write(&default, "{}").unwrap();
        assert_eq!(resolve_import_file_path_with(None, &default, &local), default);
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn backup_swap_replaces_file_without_leftovers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "old").unwrap();
        let mut temp = tempfile::NamedTempFile::new_in(temp_dir.path()).unwrap();
        temp.write_all(b"new").unwrap();

        replace_with_backup_swap(temp, &path, temp_dir.path()).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(dir_entries(temp_dir.path()), vec![CONFIG_FILE_NAME.to_string()]);
    }

    #[test]
    fn backup_swap_restores_original_when_replacement_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "old").unwrap();
        let temp = tempfile::NamedTempFile::new_in(temp_dir.path()).unwrap();
        // the replacement vanishes, so moving it into place fails
        fs::remove_file(temp.path()).unwrap();

        let result = replace_with_backup_swap(temp, &path, temp_dir.path());

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
        assert_eq!(dir_entries(temp_dir.path()), vec![CONFIG_FILE_NAME.to_string()]);
    }
}
