//! Sessions: the per-connection surface of the consistency protocol.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use cachet_catalog::{CatalogVersion, DdlChange, DdlOp, DdlRequest, VersionedCatalogStore};
use cachet_plan::{AlterTableOperation, DdlPlan, StatementPlan};
use cachet_result::{Error, Result};
use cachet_table::StorageEngine;

use crate::cache::{CacheStats, SessionCache};
use crate::executor;
use crate::statement_result::StatementResult;
use crate::watcher::{EagerRefreshConfig, EagerRefreshHandle, VersionWatcher};

/// Shared interior of a session, so background pollers can reference the
/// cache and watcher without borrowing the session itself.
pub(crate) struct SessionInner {
    pub(crate) store: Arc<VersionedCatalogStore>,
    pub(crate) engine: Arc<dyn StorageEngine>,
    pub(crate) cache: SessionCache,
    pub(crate) watcher: VersionWatcher,
}

/// One client connection's view of the shared catalog.
///
/// A session owns exactly one [`SessionCache`] and one last-known catalog
/// version; independent sessions never share cache state. All coordination
/// happens through the shared [`VersionedCatalogStore`].
///
/// - [`execute`](Self::execute) runs data statements under the retryable
///   staleness contract.
/// - [`execute_ddl`](Self::execute_ddl) proposes schema changes through the
///   optimistic version guard.
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Connect a new session, starting from the catalog's current version
    /// with an empty cache.
    pub fn connect(store: Arc<VersionedCatalogStore>, engine: Arc<dyn StorageEngine>) -> Self {
        let watcher = VersionWatcher::new(Arc::clone(&store));
        Self {
            inner: Arc::new(SessionInner {
                store,
                engine,
                cache: SessionCache::new(),
                watcher,
            }),
        }
    }

    /// Execute one data statement.
    ///
    /// Returns [`Error::CatalogVersionMismatch`] when the session's view of
    /// the schema turned out to be stale; the session cache has been
    /// refreshed by the time the error is returned, and the caller decides
    /// whether to resubmit (see [`with_catalog_retries`](crate::with_catalog_retries)).
    pub fn execute(&self, plan: impl Into<StatementPlan>) -> Result<StatementResult> {
        executor::execute_statement(&self.inner, &plan.into())
    }

    /// Propose a schema change, serialized through the catalog's
    /// compare-and-bump commit.
    ///
    /// On success the session's own view advances to the returned version and
    /// its cache is invalidated (entries were stamped with the old version);
    /// other sessions catch up through their own lazy or eager refresh. A
    /// lost version race surfaces [`Error::DdlRejected`] and is never retried
    /// by the engine: re-issuing a structural change against a schema that
    /// moved may not mean the same thing, so resubmission is the caller's
    /// deliberate act.
    pub fn execute_ddl(&self, plan: impl Into<DdlPlan>) -> Result<CatalogVersion> {
        let plan = plan.into();
        let base = self.inner.watcher.last_known();

        // Soft variants resolve to a no-op without touching the version.
        match &plan {
            DdlPlan::CreateTable(create) if create.if_not_exists => {
                if self.inner.store.fetch_object(&create.table).is_some() {
                    tracing::trace!(table = %create.table, "create skipped, table exists");
                    return Ok(base);
                }
            }
            DdlPlan::DropTable(drop) if drop.if_exists => {
                if self.inner.store.fetch_object(&drop.table).is_none() {
                    tracing::trace!(table = %drop.table, "drop skipped, table missing");
                    return Ok(base);
                }
            }
            _ => {}
        }

        let request = DdlRequest::new(base, lower_ddl_plan(plan));
        let engine = Arc::clone(&self.inner.engine);
        match self
            .inner
            .store
            .apply_ddl(request, |change| storage_effects(engine.as_ref(), change))
        {
            Ok(version) => {
                self.inner.cache.invalidate_all();
                self.inner.watcher.advance_to(version);
                Ok(version)
            }
            Err(err @ Error::DdlRejected { .. }) => {
                // Refresh so a deliberate re-plan by the caller sees the
                // version that beat us.
                self.inner.watcher.refresh_if_needed(&self.inner.cache);
                Err(err)
            }
            Err(other) => Err(other),
        }
    }

    /// The catalog version this session last observed.
    pub fn current_version(&self) -> CatalogVersion {
        self.inner.watcher.last_known()
    }

    /// Manually reconcile with the authority. Returns whether a change was
    /// detected.
    pub fn refresh(&self) -> bool {
        self.inner.watcher.refresh_if_needed(&self.inner.cache)
    }

    /// Cache counters for this session.
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Start the advisory eager-refresh poller for this session.
    ///
    /// Reduces how often statements hit the lazy mismatch path; correctness
    /// never depends on it. The poller stops when the returned handle is
    /// dropped.
    pub fn start_eager_refresh(&self, config: EagerRefreshConfig) -> EagerRefreshHandle {
        let inner = Arc::clone(&self.inner);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let thread = thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                inner.watcher.refresh_if_needed(&inner.cache);
                thread::sleep(config.interval);
            }
        });
        EagerRefreshHandle::new(stop, thread)
    }
}

/// Lower a DDL plan into the store's request vocabulary.
fn lower_ddl_plan(plan: DdlPlan) -> DdlOp {
    match plan {
        DdlPlan::CreateTable(create) => DdlOp::CreateTable {
            table: create.table,
            columns: create.columns,
        },
        DdlPlan::DropTable(drop) => DdlOp::DropTable { table: drop.table },
        DdlPlan::AlterTable(alter) => match alter.operation {
            AlterTableOperation::AddColumn(column) => DdlOp::AddColumn {
                table: alter.table,
                column,
            },
            AlterTableOperation::DropColumn(column) => DdlOp::DropColumn {
                table: alter.table,
                column,
            },
        },
    }
}

/// Apply the physical side of a catalog change.
///
/// Runs inside the store's commit, so a storage failure aborts the DDL.
/// ALTER needs no physical work: column data is keyed by stable field id and
/// padding happens lazily at scan time.
fn storage_effects(engine: &dyn StorageEngine, change: &DdlChange) -> Result<()> {
    match change {
        DdlChange::Created(object) => engine.create_object(object),
        DdlChange::Dropped(object) => engine.drop_object(object.object_id),
        DdlChange::Altered { .. } => Ok(()),
    }
}
