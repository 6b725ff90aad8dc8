//! Physical storage collaborator for cachet.
//!
//! The consistency core treats row storage as an opaque component behind the
//! [`StorageEngine`] trait: given validated, fresh schema snapshots it
//! performs the actual reads and writes, and its failures pass through as
//! opaque storage faults. This crate provides that trait plus
//! [`MemTableStore`], an in-memory columnar implementation keyed by
//! `(ObjectId, FieldId)` so that recreated tables and recreated columns never
//! alias old data.
//!
//! Value typing lives here too: [`coerce::coerce_row`] checks and coerces
//! plan literals against a column set, producing the typed rows the engine
//! stores.

#![forbid(unsafe_code)]

pub mod coerce;
pub mod engine;

pub use coerce::{coerce_row, coerce_value};
pub use engine::{MemTableStore, RowFilter, StorageEngine, TypedRow};
