//! Session layer for the cachet catalog-cache consistency core.
//!
//! A [`Session`] models one client connection. It owns a private
//! [`SessionCache`] of schema snapshots and a [`VersionWatcher`] tracking the
//! last catalog version it has observed; independent sessions coordinate only
//! through the shared
//! [`VersionedCatalogStore`](cachet_catalog::VersionedCatalogStore).
//!
//! # Consistency contract
//!
//! - DML goes through [`Session::execute`]: statement planning resolves every
//!   referenced schema object against the session cache, and execution is
//!   pinned to the planning-time catalog version. Any staleness discovered on
//!   the way aborts the statement with the retryable
//!   [`CatalogVersionMismatch`](cachet_result::Error::CatalogVersionMismatch)
//!   error, after refreshing the cache, so a caller-driven retry of the same
//!   statement is expected to succeed.
//! - DDL goes through [`Session::execute_ddl`]: an optimistic
//!   compare-and-bump against the catalog version. Losing the race surfaces
//!   [`DdlRejected`](cachet_result::Error::DdlRejected), which the engine
//!   never retries on the caller's behalf.
//!
//! The retry loop itself is an explicit caller-side construct; see
//! [`with_catalog_retries`].

#![forbid(unsafe_code)]

pub mod cache;
pub mod executor;
pub mod retry;
pub mod session;
pub mod statement_result;
pub mod watcher;

pub use cache::{CacheEntry, CacheStats, SessionCache};
pub use retry::with_catalog_retries;
pub use session::Session;
pub use statement_result::StatementResult;
pub use watcher::{EagerRefreshConfig, EagerRefreshHandle, VersionWatcher};

// Re-export the plan vocabulary users need to drive a session.
pub use cachet_plan::{
    AlterTablePlan, ColumnSpec, CreateTablePlan, DdlPlan, DeletePlan, DropTablePlan, FilterExpr,
    InsertPlan, PlanValue, SelectPlan, StatementPlan, TableRef,
};
