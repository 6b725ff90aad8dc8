//! Schema-change requests submitted to the catalog store.

use std::sync::Arc;

use cachet_plan::{ColumnSpec, TableRef};

use crate::schema::SchemaObject;
use crate::version::CatalogVersion;

/// A single catalog mutation.
///
/// Soft variants (`IF NOT EXISTS` / `IF EXISTS`) are resolved by the session
/// layer before a request is built; by the time an op reaches the store it is
/// unconditional.
#[derive(Clone, Debug)]
pub enum DdlOp {
    CreateTable {
        table: TableRef,
        columns: Vec<ColumnSpec>,
    },
    DropTable {
        table: TableRef,
    },
    AddColumn {
        table: TableRef,
        column: ColumnSpec,
    },
    DropColumn {
        table: TableRef,
        column: String,
    },
}

impl DdlOp {
    /// The object this mutation targets.
    pub fn target(&self) -> &TableRef {
        match self {
            DdlOp::CreateTable { table, .. }
            | DdlOp::DropTable { table }
            | DdlOp::AddColumn { table, .. }
            | DdlOp::DropColumn { table, .. } => table,
        }
    }
}

/// A proposed catalog mutation carrying the base version it was planned
/// against.
///
/// The base version is the optimistic concurrency token: the store commits
/// the request only if the catalog is still at exactly that version.
#[derive(Clone, Debug)]
pub struct DdlRequest {
    pub base_version: CatalogVersion,
    pub op: DdlOp,
}

impl DdlRequest {
    pub fn new(base_version: CatalogVersion, op: DdlOp) -> Self {
        Self { base_version, op }
    }
}

/// The staged outcome of a catalog mutation, handed to the storage-effects
/// hook before the commit point.
///
/// Snapshots referenced here are the post-validation objects: `Created`
/// carries the object about to become visible, `Dropped` the object about to
/// be retired, `Altered` both sides of an in-place change (same
/// [`ObjectId`](crate::ObjectId), new column set).
#[derive(Clone, Debug)]
pub enum DdlChange {
    Created(Arc<SchemaObject>),
    Dropped(Arc<SchemaObject>),
    Altered {
        before: Arc<SchemaObject>,
        after: Arc<SchemaObject>,
    },
}
