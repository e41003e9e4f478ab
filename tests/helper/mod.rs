//! Shared test utilities

#![allow(dead_code)]

mod toolchain;

pub use toolchain::*;

use gup::package::{Package, UpdateChannel, Version};
use gup::update::{RunSummary, UpdateResult, collect_results};
use tokio::sync::mpsc;

/// Package as discovery would report it
pub fn installed(name: &str, import_path: &str, module_path: &str, current: &str) -> Package {
    Package::new(name, import_path, module_path)
        .with_version(Version::new(current, ""))
        .with_go_version(Version::new("go1.22.4", "go1.22.4"))
        .with_channel(UpdateChannel::Latest)
}

/// Drains a result stream into a summary
pub async fn collect(results: mpsc::Receiver<UpdateResult>, total: usize) -> RunSummary {
    collect_results(results, total, |_, _, _| {}).await
}

/// Error messages of the failed results, sorted
pub fn error_messages(summary: &RunSummary) -> Vec<String> {
    let mut messages: Vec<String> = summary
        .failed()
        .filter_map(|r| r.error.as_ref().map(|e| e.to_string()))
        .collect();
    messages.sort();
    messages
}
