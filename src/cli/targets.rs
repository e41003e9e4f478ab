//! Narrowing the discovered packages to the ones named on the command line

use crate::goutil::binary::BinaryNaming;
use crate::package::Package;
use crate::print;

/// Packages named in `targets`, or all packages when `targets` is empty.
///
/// Names that match nothing are reported as warnings. On Windows the
/// executable suffix and case are ignored.
pub fn extract_user_specified(
    packages: Vec<Package>,
    targets: &[String],
    naming: &BinaryNaming,
) -> Vec<Package> {
    if targets.is_empty() {
        return packages;
    }

    let (selected, missing) = split_by_targets(packages, targets, naming);
    for name in missing {
        print::warn(format!("not found '{name}' package in $GOPATH/bin or $GOBIN"));
    }
    selected
}

fn split_by_targets(
    packages: Vec<Package>,
    targets: &[String],
    naming: &BinaryNaming,
) -> (Vec<Package>, Vec<String>) {
    let selected: Vec<Package> = packages
        .into_iter()
        .filter(|p| targets.iter().any(|t| naming.same_binary(&p.name, t)))
        .collect();
    let missing = targets
        .iter()
        .filter(|t| !selected.iter().any(|p| naming.same_binary(&p.name, t)))
        .cloned()
        .collect();
    (selected, missing)
}

/// Drops the packages named in `excluded`.
pub fn exclude_packages(packages: Vec<Package>, excluded: &[String]) -> Vec<Package> {
    packages
        .into_iter()
        .filter(|p| {
            let skip = excluded.iter().any(|name| name.trim() == p.name);
            if skip {
                print::info(format!("Exclude '{}' from the update target", p.name));
            }
            !skip
        })
        .collect()
}

/// Worker count from `--jobs`; anything below 1 means 1.
pub fn clamp_jobs(jobs: i64) -> usize {
    usize::try_from(jobs).unwrap_or(0).max(1)
}

/// Default for `--jobs`
pub fn default_jobs() -> i64 {
    std::thread::available_parallelism()
        .map(|n| n.get() as i64)
        .unwrap_or(1)
}
