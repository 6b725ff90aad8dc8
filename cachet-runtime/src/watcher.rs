//! Tracking of the authoritative catalog version on behalf of a session.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use cachet_catalog::{CatalogVersion, VersionedCatalogStore};

use crate::cache::SessionCache;

/// Per-session view of the authoritative catalog version.
///
/// The watcher holds the session's last-known version and decides when the
/// session cache can no longer be trusted. Two trigger modes exist:
///
/// - **Lazy**: [`refresh_if_needed`](Self::refresh_if_needed) is called when
///   a statement aborts on a version mismatch. Always correct; may cost the
///   caller one failed attempt.
/// - **Eager**: an optional background poller (see
///   [`Session::start_eager_refresh`](crate::Session::start_eager_refresh))
///   calls the same method on an interval, shrinking the window in which the
///   lazy path is hit. Advisory only; correctness never depends on it.
pub struct VersionWatcher {
    store: Arc<VersionedCatalogStore>,
    last_known: AtomicU64,
}

impl VersionWatcher {
    /// Start tracking at the store's current version, the way a freshly
    /// connected session does.
    pub fn new(store: Arc<VersionedCatalogStore>) -> Self {
        let initial = store.read_version();
        Self {
            store,
            last_known: AtomicU64::new(initial),
        }
    }

    /// The catalog version this session last observed.
    #[inline]
    pub fn last_known(&self) -> CatalogVersion {
        self.last_known.load(Ordering::SeqCst)
    }

    /// Advance the session's view, e.g. after its own DDL committed.
    /// Monotone: never moves the view backwards.
    pub fn advance_to(&self, version: CatalogVersion) {
        self.last_known.fetch_max(version, Ordering::SeqCst);
    }

    /// Compare the session's view against the authority; on divergence,
    /// invalidate the whole cache and catch up. Returns whether a change was
    /// detected.
    pub fn refresh_if_needed(&self, cache: &SessionCache) -> bool {
        let current = self.store.read_version();
        let known = self.last_known();
        if current == known {
            return false;
        }

        cache.invalidate_all();
        self.advance_to(current);
        tracing::debug!(from = known, to = current, "session caught up with catalog");
        true
    }
}

/// Polling cadence for the eager refresh thread.
#[derive(Clone, Copy, Debug)]
pub struct EagerRefreshConfig {
    pub interval: Duration,
}

impl Default for EagerRefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
        }
    }
}

/// Handle to a running eager-refresh poller.
///
/// The poller stops when the handle is dropped or [`stop`](Self::stop) is
/// called explicitly.
pub struct EagerRefreshHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EagerRefreshHandle {
    pub(crate) fn new(stop: Arc<AtomicBool>, thread: JoinHandle<()>) -> Self {
        Self {
            stop,
            thread: Some(thread),
        }
    }

    /// Stop the poller and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for EagerRefreshHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
