//! Go module and toolchain version comparison
//!
//! Module versions are semver with a leading `v`, optionally marked
//! `+incompatible` (v2+ modules without go.mod) or written as a
//! pseudo-version such as `v0.0.0-20210101000000-abcdef123456`.
//!
//! Toolchain versions look like `go1.22.4` (or `go1.22` for the first release).

use std::cmp::Ordering;

use semver::Version;
use tracing::debug;

/// A module version ready for ordering
///
/// Pseudo-versions of untagged commits keep their commit time, which is the
/// only meaningful order between two of them.
#[derive(Debug, PartialEq, Eq)]
struct ModuleVersion {
    release: Version,
    commit_time: Option<String>,
}

impl ModuleVersion {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let bare = raw.strip_prefix('v').unwrap_or(raw);
        let bare = bare.strip_suffix("+incompatible").unwrap_or(bare);

        let pseudo = bare.split_once('-').and_then(|(base, rest)| {
            let (stamp, _commit) = rest.split_once('-')?;
            is_commit_time(stamp).then_some((base, stamp))
        });
        if let Some((base, stamp)) = pseudo {
            return Some(Self {
                release: Version::parse(base).ok()?,
                commit_time: Some(stamp.to_string()),
            });
        }

        match Version::parse(bare) {
            Ok(release) => Some(Self {
                release,
                commit_time: None,
            }),
            Err(e) => {
                debug!("'{}' is not a module version: {}", raw, e);
                None
            }
        }
    }
}

fn is_commit_time(stamp: &str) -> bool {
    stamp.len() == 14 && stamp.bytes().all(|b| b.is_ascii_digit())
}

impl Ord for ModuleVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release
            .cmp(&other.release)
            .then_with(|| match (&self.commit_time, &other.commit_time) {
                (Some(a), Some(b)) => a.cmp(b),
                // a tagged release outranks a pseudo-version of the same base
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (None, None) => Ordering::Equal,
            })
    }
}

impl PartialOrd for ModuleVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reports whether `current` needs no update to reach `latest`.
///
/// A blank side is never up to date. Unparsable pairs (e.g. "(devel)")
/// fall back to exact string equality.
pub fn is_up_to_date(current: &str, latest: &str) -> bool {
    let (current, latest) = (current.trim(), latest.trim());
    if current.is_empty() || latest.is_empty() {
        return false;
    }
    match (ModuleVersion::parse(current), ModuleVersion::parse(latest)) {
        (Some(c), Some(l)) => c >= l,
        _ => current == latest,
    }
}

/// Parses "go1.22.4" or "go1.22" into a full semver triple.
fn parse_toolchain_version(version: &str) -> Option<Version> {
    let version = version.split_whitespace().next()?;
    let version = version.strip_prefix("go").unwrap_or(version);
    let padded = match version.matches('.').count() {
        0 => format!("{version}.0.0"),
        1 => format!("{version}.0"),
        _ => version.to_string(),
    };
    Version::parse(&padded).ok()
}

/// Reports whether a binary built with `current` matches the local toolchain `latest`.
pub fn is_toolchain_up_to_date(current: &str, latest: &str) -> bool {
    let (current, latest) = (current.trim(), latest.trim());
    if current.is_empty() || latest.is_empty() {
        return false;
    }
    match (parse_toolchain_version(current), parse_toolchain_version(latest)) {
        (Some(c), Some(l)) => c >= l,
        _ => current == latest,
    }
}
