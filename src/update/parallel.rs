//! Fixed-size worker pool over a package list

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::package::Package;
use crate::update::error::UpdateError;
use crate::update::{UpdateResult, cancelable};

/// Runs `op` for every package on at most `jobs` concurrent workers.
///
/// The returned receiver yields exactly `packages.len()` results, in
/// completion order, and is closed after the last one. `jobs` is clamped to
/// `[1, packages.len()]`. Packages reached after `cancel` fires, or whose
/// operation is still running when it fires, get a canceled result.
pub fn for_each_package<F, Fut>(
    cancel: CancellationToken,
    packages: Vec<Package>,
    jobs: usize,
    op: F,
) -> mpsc::Receiver<UpdateResult>
where
    F: Fn(CancellationToken, Package) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = UpdateResult> + Send + 'static,
{
    let total = packages.len();
    let (tx, rx) = mpsc::channel(total.max(1));
    if total == 0 {
        return rx;
    }

    let workers = jobs.clamp(1, total);
    debug!("Processing {} packages with {} workers", total, workers);

    let queue = Arc::new(Mutex::new(VecDeque::from(packages)));
    let op = Arc::new(op);

    for _ in 0..workers {
        let queue = queue.clone();
        let op = op.clone();
        let tx = tx.clone();
        let cancel = cancel.clone();

        tokio::spawn(async move {
            loop {
                let next = queue
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .pop_front();
                let Some(package) = next else {
                    break;
                };

                let result = if cancel.is_cancelled() {
                    UpdateResult::canceled(package)
                } else {
                    run_one(&cancel, op.as_ref(), package).await
                };

                if tx.send(result).await.is_err() {
                    debug!("Result receiver dropped, stopping worker");
                    break;
                }
            }
        });
    }

    rx
}

async fn run_one<F, Fut>(cancel: &CancellationToken, op: &F, package: Package) -> UpdateResult
where
    F: Fn(CancellationToken, Package) -> Fut,
    Fut: Future<Output = UpdateResult>,
{
    let original = package.clone();
    let op_cancel = cancel.clone();
    let operation = AssertUnwindSafe(async move { op(op_cancel, package).await }).catch_unwind();

    match cancelable(cancel, operation).await {
        Some(Ok(result)) => result,
        Some(Err(_)) => {
            error!("Operation on {} panicked", original.name);
            let name = original.name.clone();
            UpdateResult::failed(original, UpdateError::Panicked { name })
        }
        None => UpdateResult::canceled(original),
    }
}
