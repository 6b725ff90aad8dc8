//! Shared catalog authority for cachet.
//!
//! This crate implements the single source of truth that independent sessions
//! coordinate through: schema metadata stamped with a monotonically
//! increasing catalog version, mutated only through an atomic
//! compare-and-bump commit.
//!
//! # Architecture
//!
//! - [`VersionedCatalogStore`] holds the authoritative object map and the
//!   current [`CatalogVersion`] behind one write lock; reads are snapshots
//!   and [`VersionedCatalogStore::read_version`] is a lock-free atomic load.
//! - [`DdlRequest`] carries the base version a schema change was planned
//!   against. [`VersionedCatalogStore::apply_ddl`] is the cluster-wide
//!   serialization point: of two concurrent requests sharing a base version,
//!   exactly one commits and bumps the version by 1; the rest are rejected
//!   with no mutation.
//! - [`SchemaObject`] carries a structural identity ([`ObjectId`]) that is
//!   never reused: dropping and recreating a table under the same name
//!   yields a new identity, so stale caches can never confuse the two.
//!
//! Sessions never share cache state; everything they learn about each
//! other's schema changes flows through this store's version counter.

#![forbid(unsafe_code)]

pub mod ddl;
pub mod schema;
pub mod store;
pub mod version;

pub use ddl::{DdlChange, DdlOp, DdlRequest};
pub use schema::{ColumnDef, SchemaObject, sql_type_name};
pub use store::VersionedCatalogStore;
pub use version::{CatalogVersion, FieldId, INITIAL_CATALOG_VERSION, ObjectId};
