//! Update channel selection and merging of results back into gup.json

use std::collections::{BTreeMap, HashMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use crate::config::{ConfigPackage, LATEST_KEYWORD, UNKNOWN_VERSION};
use crate::package::{Package, UpdateChannel};
use crate::update::error::ChannelError;

/// Channel per package name, in discovery order
pub type ChannelMap = IndexMap<String, UpdateChannel>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelResolution {
    pub channels: ChannelMap,
    /// Names given to a channel flag that match no package
    pub unknown: Vec<String>,
}

/// Channel names requested on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelFlags<'a> {
    pub main: &'a [String],
    pub master: &'a [String],
    pub latest: &'a [String],
}

impl ChannelFlags<'_> {
    fn in_priority_order(&self) -> [(&'static str, &[String], UpdateChannel); 3] {
        [
            ("main", self.main, UpdateChannel::Main),
            ("master", self.master, UpdateChannel::Master),
            (LATEST_KEYWORD, self.latest, UpdateChannel::Latest),
        ]
    }

    fn is_empty(&self) -> bool {
        self.main.is_empty() && self.master.is_empty() && self.latest.is_empty()
    }
}

/// Builds the channel of every package.
///
/// Every package starts on `latest`, takes the channel saved in gup.json
/// when one exists, then the one given by a flag. Naming a package in two
/// different flags fails the whole resolution.
pub fn resolve_channels(
    packages: &[Package],
    persisted: &[ConfigPackage],
    flags: ChannelFlags<'_>,
) -> Result<ChannelResolution, ChannelError> {
    let mut channels: ChannelMap = packages
        .iter()
        .map(|p| (p.name.clone(), UpdateChannel::Latest))
        .collect();

    for saved in persisted {
        if let Some(channel) = channels.get_mut(&saved.name) {
            *channel = saved.channel;
        }
    }

    let mut assigned_by: HashMap<&str, &'static str> = HashMap::new();
    let mut unknown = Vec::new();
    let mut reported: HashSet<&str> = HashSet::new();

    for (flag, names, channel) in flags.in_priority_order() {
        for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            match assigned_by.get(name) {
                Some(&first) if first != flag => {
                    return Err(ChannelError::Conflict {
                        name: name.to_string(),
                        first,
                        second: flag,
                    });
                }
                _ => {
                    assigned_by.insert(name, flag);
                }
            }

            match channels.get_mut(name) {
                Some(current) => *current = channel,
                None => {
                    if reported.insert(name) {
                        unknown.push(name.to_string());
                    }
                }
            }
        }
    }

    debug!("Resolved update channels: {:?}", channels);
    Ok(ChannelResolution { channels, unknown })
}

/// Channel for `name`, falling back to the package's own channel.
pub fn package_update_channel(
    name: &str,
    fallback: UpdateChannel,
    channels: &ChannelMap,
) -> UpdateChannel {
    channels.get(name).copied().unwrap_or(fallback)
}

/// gup.json is only rewritten by `update` when a channel flag was given.
pub fn should_persist_channels(flags: ChannelFlags<'_>) -> bool {
    !flags.is_empty()
}

/// Folds the packages updated in this run into the saved config.
///
/// Saved entries are sanitized and kept, each successfully updated package
/// replaces its entry, and the resolved channel is applied to every entry
/// named in `channels`. The result is sorted by name.
pub fn merge_config_packages(
    persisted: &[ConfigPackage],
    succeeded: &[Package],
    channels: &ChannelMap,
) -> Vec<ConfigPackage> {
    let mut by_name: BTreeMap<String, ConfigPackage> = persisted
        .iter()
        .map(ConfigPackage::sanitized)
        .map(|p| (p.name.clone(), p))
        .collect();

    for package in succeeded {
        if package.name.is_empty() || package.import_path.is_empty() {
            continue;
        }
        let channel = package_update_channel(&package.name, package.update_channel, channels);
        by_name.insert(
            package.name.clone(),
            ConfigPackage::new(
                &package.name,
                &package.import_path,
                &persisted_version(package),
                channel,
            ),
        );
    }

    for (name, channel) in channels {
        if let Some(entry) = by_name.get_mut(name) {
            entry.channel = *channel;
        }
    }

    by_name.into_values().map(|p| p.sanitized()).collect()
}

/// Drops saved entries of binaries that a module rename replaced.
pub fn prune_renamed<'a>(
    persisted: Vec<ConfigPackage>,
    renamed: impl IntoIterator<Item = &'a str>,
) -> Vec<ConfigPackage> {
    let renamed: HashSet<&str> = renamed.into_iter().collect();
    persisted
        .into_iter()
        .filter(|p| !renamed.contains(p.name.trim()))
        .collect()
}

/// Version written to gup.json: the latest seen version, else the current
/// one, else `latest`.
pub fn persisted_version(package: &Package) -> String {
    let latest = package.version.latest.trim();
    if !latest.is_empty() && latest != UNKNOWN_VERSION {
        return latest.to_string();
    }
    let current = package.version.current.trim();
    if !current.is_empty() {
        return current.to_string();
    }
    LATEST_KEYWORD.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Version;
    use rstest::rstest;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn discovered() -> Vec<Package> {
        vec![
            Package::new("air", "github.com/air-verse/air", "github.com/air-verse/air"),
            Package::new("gopls", "golang.org/x/tools/gopls", "golang.org/x/tools/gopls"),
            Package::new("gup", "github.com/nao1215/gup", "github.com/nao1215/gup"),
        ]
    }

    #[test]
    fn resolve_channels_applies_defaults_persisted_and_flags() {
        let persisted = vec![
            ConfigPackage::new("gopls", "golang.org/x/tools/gopls", "latest", UpdateChannel::Main),
            ConfigPackage::new("gup", "github.com/nao1215/gup", "latest", UpdateChannel::Master),
            ConfigPackage::new("removed", "example.com/removed", "latest", UpdateChannel::Main),
        ];
        let main = names(&["air"]);
        let latest = names(&["gup"]);

        let resolution = resolve_channels(
            &discovered(),
            &persisted,
            ChannelFlags {
                main: &main,
                latest: &latest,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(resolution.channels.get("air"), Some(&UpdateChannel::Main));
        assert_eq!(resolution.channels.get("gopls"), Some(&UpdateChannel::Main));
        assert_eq!(resolution.channels.get("gup"), Some(&UpdateChannel::Latest));
        assert!(!resolution.channels.contains_key("removed"));
        assert!(resolution.unknown.is_empty());
    }

    #[test]
    fn resolve_channels_rejects_name_in_two_flags() {
        let main = names(&["air"]);
        let master = names(&[" air "]);

        let result = resolve_channels(
            &discovered(),
            &[],
            ChannelFlags {
                main: &main,
                master: &master,
                ..Default::default()
            },
        );

        assert_eq!(
            result,
            Err(ChannelError::Conflict {
                name: "air".to_string(),
                first: "main",
                second: "master",
            })
        );
        assert_eq!(
            result.unwrap_err().to_string(),
            "same binary (air) is specified in both --main and --master"
        );
    }

    #[test]
    fn resolve_channels_rejects_conflict_for_unknown_name() {
        let master = names(&["ghost"]);
        let latest = names(&["ghost"]);

        let result = resolve_channels(
            &discovered(),
            &[],
            ChannelFlags {
                master: &master,
                latest: &latest,
                ..Default::default()
            },
        );

        assert!(matches!(result, Err(ChannelError::Conflict { .. })));
    }

    #[test]
    fn resolve_channels_reports_unknown_names_once() {
        let main = names(&["ghost", "", "ghost", "air"]);

        let resolution = resolve_channels(
            &discovered(),
            &[],
            ChannelFlags {
                main: &main,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(resolution.unknown, vec!["ghost".to_string()]);
        assert_eq!(resolution.channels.len(), 3);
        assert_eq!(resolution.channels.get("air"), Some(&UpdateChannel::Main));
    }

    #[rstest]
    #[case(&[], &[], &[], false)]
    #[case(&["air"], &[], &[], true)]
    #[case(&[], &["air"], &[], true)]
    #[case(&[], &[], &["air"], true)]
    fn should_persist_channels_returns_expected(
        #[case] main: &[&str],
        #[case] master: &[&str],
        #[case] latest: &[&str],
        #[case] expected: bool,
    ) {
        let (main, master, latest) = (names(main), names(master), names(latest));
        let flags = ChannelFlags {
            main: &main,
            master: &master,
            latest: &latest,
        };
        assert_eq!(should_persist_channels(flags), expected);
    }

    #[rstest]
    #[case("v1.2.0", "v1.1.0", "v1.2.0")]
    #[case("unknown", "v1.1.0", "v1.1.0")]
    #[case(" ", "v1.1.0", "v1.1.0")]
    #[case("", "", "latest")]
    fn persisted_version_returns_expected(
        #[case] latest: &str,
        #[case] current: &str,
        #[case] expected: &str,
    ) {
        let package = Package::new("air", "github.com/air-verse/air", "")
            .with_version(Version::new(current, latest));
        assert_eq!(persisted_version(&package), expected);
    }

    #[test]
    fn prune_renamed_drops_replaced_binaries() {
        let persisted = vec![
            ConfigPackage::new("foo-cli", "github.com/example/foo-cli", "v1.0.0", UpdateChannel::Main),
            ConfigPackage::new("gopls", "golang.org/x/tools/gopls", "v0.16.0", UpdateChannel::Latest),
        ];

        let pruned = prune_renamed(persisted, ["foo-cli"]);

        assert_eq!(
            pruned,
            vec![ConfigPackage::new(
                "gopls",
                "golang.org/x/tools/gopls",
                "v0.16.0",
                UpdateChannel::Latest
            )]
        );
    }

    #[test]
    fn merge_config_packages_without_changes_returns_sanitized_sorted_config() {
        let persisted = vec![
            ConfigPackage::new(" gup ", "github.com/nao1215/gup ", "", UpdateChannel::Master),
            ConfigPackage::new("air", "github.com/air-verse/air", "v1.52.3", UpdateChannel::Latest),
        ];

        let merged = merge_config_packages(&persisted, &[], &ChannelMap::new());

        assert_eq!(
            merged,
            vec![
                ConfigPackage::new("air", "github.com/air-verse/air", "v1.52.3", UpdateChannel::Latest),
                ConfigPackage::new("gup", "github.com/nao1215/gup", "latest", UpdateChannel::Master),
            ]
        );
        assert_eq!(merge_config_packages(&merged, &[], &ChannelMap::new()), merged);
    }

    #[test]
    fn merge_config_packages_overlays_succeeded_and_channels() {
        let persisted = vec![
            ConfigPackage::new("air", "github.com/cosmtrek/air", "v1.40.0", UpdateChannel::Latest),
            ConfigPackage::new("gopls", "golang.org/x/tools/gopls", "v0.15.0", UpdateChannel::Latest),
        ];
        let succeeded = vec![
            Package::new("air", "github.com/air-verse/air", "github.com/air-verse/air")
                .with_version(Version::new("v1.52.3", "v1.52.3")),
            Package::new("broken", "", "").with_version(Version::new("v1.0.0", "")),
            Package::new("dlv", "github.com/go-delve/delve/cmd/dlv", "")
                .with_version(Version::new("v1.23.0", UNKNOWN_VERSION))
                .with_channel(UpdateChannel::Master),
        ];
        let channels: ChannelMap = [
            ("air".to_string(), UpdateChannel::Main),
            ("gopls".to_string(), UpdateChannel::Master),
        ]
        .into_iter()
        .collect();

        let merged = merge_config_packages(&persisted, &succeeded, &channels);

        assert_eq!(
            merged,
            vec![
                ConfigPackage::new("air", "github.com/air-verse/air", "v1.52.3", UpdateChannel::Main),
                ConfigPackage::new(
                    "dlv",
                    "github.com/go-delve/delve/cmd/dlv",
                    "v1.23.0",
                    UpdateChannel::Master
                ),
                ConfigPackage::new("gopls", "golang.org/x/tools/gopls", "v0.15.0", UpdateChannel::Master),
            ]
        );
    }
}
