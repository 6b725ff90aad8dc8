//! Per-session cache of schema object snapshots.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cachet_catalog::{CatalogVersion, SchemaObject};
use cachet_plan::TableRef;
use rustc_hash::FxHashMap;

/// A cached schema snapshot stamped with the catalog version at which it was
/// fetched.
///
/// The entry is trustworthy only while its recorded version equals the
/// session's current last-known authoritative version. The model is
/// deliberately version-exact rather than per-object: any schema change
/// anywhere invalidates the reasoning behind every prior cache read in the
/// session. False staleness positives only cost a refresh; false negatives
/// are ruled out by the exact-equality comparison.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub object: Arc<SchemaObject>,
    pub version: CatalogVersion,
}

/// Point-in-time cache counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Session-private schema cache.
///
/// Owned exclusively by one session; cross-session effects propagate only
/// through the shared catalog version counter, never through cache sharing.
pub struct SessionCache {
    entries: RwLock<FxHashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SessionCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached entry for the given table, if any.
    pub fn lookup(&self, table: &TableRef) -> Option<CacheEntry> {
        let entries = self.entries.read().expect("session cache lock poisoned");
        match entries.get(&table.canonical_key()) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Whether an entry can be trusted at the given authoritative version.
    #[inline]
    pub fn is_stale(entry: &CacheEntry, current: CatalogVersion) -> bool {
        entry.version != current
    }

    /// Insert or overwrite the entry for `object`.
    pub fn populate(&self, object: Arc<SchemaObject>, version: CatalogVersion) {
        let mut entries = self.entries.write().expect("session cache lock poisoned");
        entries.insert(object.canonical_key(), CacheEntry { object, version });
    }

    /// Drop every entry; subsequent lookups miss and refetch from the
    /// catalog store.
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write().expect("session cache lock poisoned");
        if !entries.is_empty() {
            tracing::trace!(dropped = entries.len(), "session cache invalidated");
        }
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("session cache lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}
