//! The shared catalog authority with atomic compare-and-bump commits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use arrow::datatypes::DataType;
use cachet_plan::{ColumnSpec, TableRef};
use cachet_result::{Error, Result};
use rustc_hash::FxHashMap;

use crate::ddl::{DdlChange, DdlOp, DdlRequest};
use crate::schema::{ColumnDef, SchemaObject, canonical_object_key};
use crate::version::{CatalogVersion, FieldId, INITIAL_CATALOG_VERSION};

/// Authoritative catalog state guarded by the store's write lock.
struct CatalogState {
    version: CatalogVersion,
    objects: FxHashMap<String, Arc<SchemaObject>>,
}

/// Shared source of truth for schema metadata.
///
/// All cross-session coordination flows through this store: sessions read
/// the version counter to detect staleness and submit [`DdlRequest`]s to
/// mutate schema. The store guarantees:
///
/// - [`read_version`](Self::read_version) is lock-free and observes a
///   monotonically non-decreasing sequence of committed versions;
/// - [`apply_ddl`](Self::apply_ddl) is atomic with respect to the
///   read-then-conditionally-write of the version: of concurrent requests
///   sharing a base version, exactly one commits (bumping the version by
///   exactly 1) and the rest are rejected with no mutation;
/// - [`run_pinned`](Self::run_pinned) lets a statement execute against a
///   verified version with schema changes excluded for the duration.
pub struct VersionedCatalogStore {
    state: RwLock<CatalogState>,
    /// Lock-free mirror of `state.version`, published before the write lock
    /// is released.
    committed_version: AtomicU64,
    /// Structural identities; never reused across drop/recreate.
    next_object_id: AtomicU64,
}

impl VersionedCatalogStore {
    /// Create an empty catalog at [`INITIAL_CATALOG_VERSION`].
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CatalogState {
                version: INITIAL_CATALOG_VERSION,
                objects: FxHashMap::default(),
            }),
            committed_version: AtomicU64::new(INITIAL_CATALOG_VERSION),
            next_object_id: AtomicU64::new(1),
        }
    }

    /// Latest committed catalog version.
    ///
    /// Lock-free; linearizable with respect to [`apply_ddl`](Self::apply_ddl).
    #[inline]
    pub fn read_version(&self) -> CatalogVersion {
        self.committed_version.load(Ordering::SeqCst)
    }

    /// Current snapshot of a schema object, plus the catalog version at which
    /// that snapshot is authoritative.
    pub fn fetch_object(&self, table: &TableRef) -> Option<(Arc<SchemaObject>, CatalogVersion)> {
        let state = self.state.read().expect("catalog state lock poisoned");
        state
            .objects
            .get(&table.canonical_key())
            .map(|object| (Arc::clone(object), state.version))
    }

    /// Number of live schema objects.
    pub fn object_count(&self) -> usize {
        let state = self.state.read().expect("catalog state lock poisoned");
        state.objects.len()
    }

    /// Snapshot of every live schema object, for catalog introspection.
    pub fn list_objects(&self) -> Vec<Arc<SchemaObject>> {
        let state = self.state.read().expect("catalog state lock poisoned");
        let mut objects: Vec<Arc<SchemaObject>> = state.objects.values().map(Arc::clone).collect();
        objects.sort_by(|a, b| a.canonical_key().cmp(&b.canonical_key()));
        objects
    }

    /// Atomically apply a schema change.
    ///
    /// Under a single write lock: verifies `request.base_version` still
    /// matches the current version (rejecting with [`Error::DdlRejected`]
    /// otherwise), stages the mutation, runs the `effects` hook (the storage
    /// engine's create/drop side of the change; a failure here aborts the
    /// DDL with no catalog mutation), then commits and bumps the version by
    /// exactly 1.
    ///
    /// Every successful call is a linearization point visible to all
    /// subsequent [`read_version`](Self::read_version) /
    /// [`fetch_object`](Self::fetch_object) calls from any session.
    pub fn apply_ddl<F>(&self, request: DdlRequest, effects: F) -> Result<CatalogVersion>
    where
        F: FnOnce(&DdlChange) -> Result<()>,
    {
        let mut state = self.state.write().expect("catalog state lock poisoned");

        if request.base_version != state.version {
            tracing::debug!(
                base = request.base_version,
                current = state.version,
                table = %request.op.target(),
                "rejecting schema change planned against stale version"
            );
            return Err(Error::DdlRejected {
                base: request.base_version,
                current: state.version,
            });
        }

        let change = self.stage(&state, &request.op)?;
        effects(&change)?;

        match &change {
            DdlChange::Created(object) => {
                state
                    .objects
                    .insert(object.canonical_key(), Arc::clone(object));
            }
            DdlChange::Dropped(object) => {
                state.objects.remove(&object.canonical_key());
            }
            DdlChange::Altered { after, .. } => {
                state
                    .objects
                    .insert(after.canonical_key(), Arc::clone(after));
            }
        }

        state.version += 1;
        self.committed_version.store(state.version, Ordering::SeqCst);
        tracing::debug!(
            version = state.version,
            table = %request.op.target(),
            "schema change committed"
        );
        Ok(state.version)
    }

    /// Run `op` with the catalog pinned at `expected`.
    ///
    /// Takes the read lock, verifies the version still equals `expected`
    /// (failing with [`Error::CatalogVersionMismatch`] otherwise), and holds
    /// the lock while `op` runs so no schema change can commit mid-flight.
    /// This is the commit-time staleness gate for statement execution.
    pub fn run_pinned<R, F>(&self, expected: CatalogVersion, op: F) -> Result<R>
    where
        F: FnOnce() -> Result<R>,
    {
        let state = self.state.read().expect("catalog state lock poisoned");
        if state.version != expected {
            return Err(Error::CatalogVersionMismatch {
                expected,
                found: state.version,
            });
        }
        op()
    }

    /// Validate an op against the locked state and build the staged change.
    ///
    /// Validation failures surface without bumping the version.
    fn stage(&self, state: &CatalogState, op: &DdlOp) -> Result<DdlChange> {
        match op {
            DdlOp::CreateTable { table, columns } => {
                let key = table.canonical_key();
                if state.objects.contains_key(&key) {
                    return Err(Error::ConstraintError(format!(
                        "table '{table}' already exists"
                    )));
                }
                let columns = build_column_defs(table, columns)?;
                let next_field_id = columns.len() as FieldId + 1;
                let object = Arc::new(SchemaObject {
                    object_id: self.next_object_id.fetch_add(1, Ordering::SeqCst),
                    namespace: table.namespace.clone(),
                    name: table.name.clone(),
                    columns,
                    next_field_id,
                });
                Ok(DdlChange::Created(object))
            }
            DdlOp::DropTable { table } => {
                let object = lookup(state, table)?;
                Ok(DdlChange::Dropped(object))
            }
            DdlOp::AddColumn { table, column } => {
                let before = lookup(state, table)?;
                check_supported_type(&column.data_type)?;
                let after =
                    before.with_column(&column.name, column.data_type.clone(), column.nullable)?;
                Ok(DdlChange::Altered {
                    before,
                    after: Arc::new(after),
                })
            }
            DdlOp::DropColumn { table, column } => {
                let before = lookup(state, table)?;
                let after = before.without_column(column)?;
                Ok(DdlChange::Altered {
                    before,
                    after: Arc::new(after),
                })
            }
        }
    }
}

impl Default for VersionedCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup(state: &CatalogState, table: &TableRef) -> Result<Arc<SchemaObject>> {
    state
        .objects
        .get(&canonical_object_key(&table.namespace, &table.name))
        .map(Arc::clone)
        .ok_or_else(|| Error::object_not_found(&table.namespace, &table.name))
}

fn check_supported_type(data_type: &DataType) -> Result<()> {
    match data_type {
        DataType::Int64 | DataType::Float64 | DataType::Boolean | DataType::Utf8 => Ok(()),
        other => Err(Error::InvalidArgumentError(format!(
            "unsupported column type: {other:?}"
        ))),
    }
}

fn build_column_defs(table: &TableRef, specs: &[ColumnSpec]) -> Result<Vec<ColumnDef>> {
    if specs.is_empty() {
        return Err(Error::InvalidArgumentError(
            "CREATE TABLE requires at least one column".into(),
        ));
    }

    let mut seen: FxHashMap<String, ()> =
        FxHashMap::with_capacity_and_hasher(specs.len(), Default::default());
    let mut columns = Vec::with_capacity(specs.len());

    for (idx, spec) in specs.iter().enumerate() {
        check_supported_type(&spec.data_type)?;
        let normalized = spec.name.to_ascii_lowercase();
        if seen.insert(normalized, ()).is_some() {
            return Err(Error::InvalidArgumentError(format!(
                "duplicate column name '{}' in table '{table}'",
                spec.name
            )));
        }
        columns.push(ColumnDef::new(
            idx as FieldId + 1,
            spec.name.clone(),
            spec.data_type.clone(),
            spec.nullable,
        ));
    }

    Ok(columns)
}
