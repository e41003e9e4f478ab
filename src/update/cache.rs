//! Per-run cache of latest module versions
//!
//! Concurrent lookups of the same module path share one upstream call.
//! Successes and ordinary failures are kept for the lifetime of the cache;
//! a lookup interrupted by cancellation is forgotten so the next caller
//! tries again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::goutil::{ToolchainError, VersionLookup};
use crate::update::cancelable;

enum EntryState {
    Idle,
    InFlight,
    Resolved(Result<String, ToolchainError>),
}

struct Entry {
    state: Mutex<EntryState>,
    /// Signaled whenever the entry leaves `InFlight`
    settled: Notify,
}

impl Entry {
    fn new() -> Self {
        Self {
            state: Mutex::new(EntryState::Idle),
            settled: Notify::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, EntryState> {
        lock(&self.state)
    }

    fn settle(&self, state: EntryState) {
        *self.state() = state;
        self.settled.notify_waiters();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reverts the entry to `Idle` if the fetching future is dropped midway.
struct FetchGuard<'a> {
    entry: &'a Entry,
    armed: bool,
}

impl FetchGuard<'_> {
    fn finish(mut self, result: &Result<String, ToolchainError>) {
        self.armed = false;
        match result {
            Err(e) if e.is_canceled() => self.entry.settle(EntryState::Idle),
            other => self.entry.settle(EntryState::Resolved(other.clone())),
        }
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.entry.settle(EntryState::Idle);
        }
    }
}

/// Single-flight cache in front of a [`VersionLookup`]
pub struct VersionCache {
    lookup: Arc<dyn VersionLookup>,
    entries: Mutex<HashMap<String, Arc<Entry>>>,
}

impl VersionCache {
    pub fn new(lookup: Arc<dyn VersionLookup>) -> Self {
        Self {
            lookup,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, module_path: &str) -> Arc<Entry> {
        lock(&self.entries)
            .entry(module_path.to_string())
            .or_insert_with(|| Arc::new(Entry::new()))
            .clone()
    }

    /// Latest version of `module_path`.
    ///
    /// Returns [`ToolchainError::Canceled`] as soon as `cancel` fires, whether
    /// this caller is fetching or waiting on another caller's fetch.
    pub async fn get(
        &self,
        cancel: &CancellationToken,
        module_path: &str,
    ) -> Result<String, ToolchainError> {
        let entry = self.entry(module_path);

        loop {
            let settled = entry.settled.notified();
            tokio::pin!(settled);

            let claimed = {
                let mut state = entry.state();
                match *state {
                    EntryState::Resolved(ref result) => return result.clone(),
                    EntryState::InFlight => {
                        settled.as_mut().enable();
                        false
                    }
                    EntryState::Idle => {
                        *state = EntryState::InFlight;
                        true
                    }
                }
            };

            if claimed {
                return self.fetch(cancel, &entry, module_path).await;
            }

            debug!("Waiting for in-flight lookup of {}", module_path);
            if cancelable(cancel, settled).await.is_none() {
                return Err(ToolchainError::Canceled);
            }
        }
    }

    async fn fetch(
        &self,
        cancel: &CancellationToken,
        entry: &Entry,
        module_path: &str,
    ) -> Result<String, ToolchainError> {
        let guard = FetchGuard { entry, armed: true };
        debug!("Looking up latest version of {}", module_path);

        let result = cancelable(cancel, self.lookup.latest_version(module_path))
            .await
            .unwrap_or(Err(ToolchainError::Canceled));

        guard.finish(&result);
        result
    }
}
