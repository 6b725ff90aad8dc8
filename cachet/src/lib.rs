//! Cachet: versioned catalog-cache consistency for independent sessions.
//!
//! This crate serves as the primary entrypoint for the cachet toolkit. It
//! re-exports the session layer and catalog authority from the underlying
//! `cachet-*` crates, providing a unified API surface for users.
//!
//! # Quick Start
//!
//! Share one catalog store and storage engine between sessions; schema
//! changes made through any session become visible to the others through the
//! catalog version, at the cost of at most one retryable failure:
//!
//! ```rust
//! use std::sync::Arc;
//! use arrow::datatypes::DataType;
//! use cachet::{
//!     CreateTablePlan, InsertPlan, MemTableStore, Session, TableRef, VersionedCatalogStore,
//!     with_catalog_retries,
//! };
//!
//! let store = Arc::new(VersionedCatalogStore::new());
//! let engine = Arc::new(MemTableStore::new());
//! let alice = Session::connect(Arc::clone(&store), Arc::<MemTableStore>::clone(&engine));
//! let bob = Session::connect(Arc::clone(&store), Arc::<MemTableStore>::clone(&engine));
//!
//! let table = TableRef::bare("t");
//! alice
//!     .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Int64)))
//!     .unwrap();
//!
//! // Bob's view predates the table; the first attempt fails retryably and
//! // the explicit retry succeeds.
//! let result = with_catalog_retries(2, || {
//!     bob.execute(InsertPlan::new(table.clone()).with_row([1_i64]))
//! });
//! assert!(result.is_ok());
//! ```
//!
//! # Architecture
//!
//! Cachet is organized as a layered workspace:
//!
//! - **Plans** (`cachet-plan`): Logical statement plans and the schema-ref
//!   contract supplied by the (external) parser.
//! - **Catalog** (`cachet-catalog`): The shared authority: versioned schema
//!   metadata behind an atomic compare-and-bump commit.
//! - **Runtime** (`cachet-runtime`): Sessions, the per-session schema cache,
//!   the version watcher, and the retryable statement executor.
//! - **Storage** (`cachet-table`): The storage-engine seam and an in-memory
//!   columnar implementation.

#![forbid(unsafe_code)]

// The session layer is the primary user-facing API.
pub use cachet_runtime::{
    EagerRefreshConfig, EagerRefreshHandle, Session, SessionCache, StatementResult, VersionWatcher,
    with_catalog_retries,
};

// Catalog authority types users need to stand up a cluster-shaped topology.
pub use cachet_catalog::{
    CatalogVersion, ColumnDef, INITIAL_CATALOG_VERSION, ObjectId, SchemaObject,
    VersionedCatalogStore,
};

// Plan vocabulary.
pub use cachet_plan::{
    AlterTablePlan, ColumnSpec, CreateTablePlan, DdlPlan, DeletePlan, DropTablePlan, FilterExpr,
    InsertPlan, PlanValue, SelectPlan, StatementPlan, TableRef,
};

// Storage seam.
pub use cachet_table::{MemTableStore, StorageEngine};

// Result types for error handling.
pub use cachet_result::{Error, Result};
