use crate::cli::{go_command, installed_packages};
use crate::config::UNKNOWN_VERSION;
use crate::package::Package;
use crate::print;

fn list_line(package: &Package, width: usize) -> String {
    let version = match package.version.current.as_str() {
        "" => UNKNOWN_VERSION,
        v => v,
    };
    format!(
        "{:>width$}: {}@{}",
        package.name, package.import_path, version
    )
}

pub async fn run() -> i32 {
    let Some(go) = go_command() else {
        return 1;
    };
    let packages = match installed_packages(&go).await {
        Ok((_, packages)) => packages,
        Err(e) => {
            print::err(e);
            return 1;
        }
    };
    if packages.is_empty() {
        print::err("unable to list up package: no package information");
        return 1;
    }

    let width = packages.iter().map(|p| p.name.len()).max().unwrap_or(0);
    for package in &packages {
        println!("{}", list_line(package, width));
    }
    0
}
