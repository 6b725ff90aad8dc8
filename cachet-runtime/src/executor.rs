//! The retryable statement executor.
//!
//! Each data statement moves through `Planning -> Executing` and either
//! succeeds or aborts. Planning resolves every referenced schema object
//! against the session cache at the session's last-known catalog version;
//! Executing runs the storage call pinned to that same version, so a schema
//! change that lands between the two is detected before anything commits.
//! Every mismatch abort refreshes the session cache before surfacing the
//! retryable error, which is what makes an immediate caller-driven retry
//! succeed under an otherwise quiet catalog.

use std::sync::Arc;

use cachet_catalog::{CatalogVersion, ColumnDef, SchemaObject};
use cachet_plan::{
    DeletePlan, FilterExpr, InsertPlan, PlanValue, SelectPlan, SelectProjection, StatementPlan,
    TableRef,
};
use cachet_result::{Error, Result};
use cachet_table::{RowFilter, TypedRow, coerce_row, coerce_value};

use crate::cache::SessionCache;
use crate::session::SessionInner;
use crate::statement_result::StatementResult;

/// Execute one data statement against the session's view of the catalog.
pub(crate) fn execute_statement(
    inner: &SessionInner,
    plan: &StatementPlan,
) -> Result<StatementResult> {
    let planning_version = inner.watcher.last_known();

    // Planning: resolve every schema reference the parser reported.
    let refs = plan.schema_refs();
    let mut objects = Vec::with_capacity(refs.len());
    for table in &refs {
        objects.push(resolve_ref(inner, table, planning_version)?);
    }

    let result = match plan {
        StatementPlan::Insert(insert) => {
            execute_insert(inner, insert, &objects[0], planning_version, &refs)
        }
        StatementPlan::Select(select) => {
            execute_select(inner, select, &objects[0], planning_version, &refs)
        }
        StatementPlan::Delete(delete) => {
            execute_delete(inner, delete, &objects[0], planning_version, &refs)
        }
    };

    result.map_err(|err| reconcile_statement_error(inner, planning_version, err))
}

/// Resolve one schema reference at the session's planning version.
///
/// Misses are served from the catalog store as long as the store is still at
/// the session's version; anything newer aborts with the retryable mismatch
/// rather than silently substituting fresher metadata. An object absent at
/// the session's own version is an ordinary "does not exist" error, not a
/// protocol error.
fn resolve_ref(
    inner: &SessionInner,
    table: &TableRef,
    planning_version: CatalogVersion,
) -> Result<Arc<SchemaObject>> {
    if let Some(entry) = inner.cache.lookup(table) {
        if !SessionCache::is_stale(&entry, planning_version) {
            return Ok(entry.object);
        }
        // Entries are stamped with the version that populated them, so this
        // only happens if the statement raced a refresh on its own session.
        let found = inner.store.read_version();
        return Err(stale_abort(inner, planning_version, found));
    }

    match inner.store.fetch_object(table) {
        Some((object, version)) if version == planning_version => {
            inner.cache.populate(Arc::clone(&object), version);
            Ok(object)
        }
        Some((_, version)) => Err(stale_abort(inner, planning_version, version)),
        None => {
            let current = inner.store.read_version();
            if current == planning_version {
                return Err(Error::object_not_found(&table.namespace, &table.name));
            }
            // The catalog moved under us; find out whether the object is
            // really gone or we simply have not caught up yet.
            inner.watcher.refresh_if_needed(&inner.cache);
            match inner.store.fetch_object(table) {
                None => Err(Error::object_not_found(&table.namespace, &table.name)),
                Some(_) => Err(Error::CatalogVersionMismatch {
                    expected: planning_version,
                    found: current,
                }),
            }
        }
    }
}

/// Refresh the session, then surface the retryable staleness error.
fn stale_abort(inner: &SessionInner, expected: CatalogVersion, found: CatalogVersion) -> Error {
    inner.watcher.refresh_if_needed(&inner.cache);
    tracing::debug!(expected, found, "statement aborted on stale catalog view");
    Error::CatalogVersionMismatch { expected, found }
}

/// Decide whether a statement error was derived from a stale schema view.
///
/// Validation runs against planning-time snapshots. An "unknown column" or
/// type error judged under a snapshot the authority has already replaced is
/// not a verdict the caller should see: the same statement may be perfectly
/// valid under the current schema (a column added by another session, a
/// recreated table). When the authority moved, refresh and report the
/// retryable mismatch instead; the retry re-judges the statement against
/// fresh metadata, and only then does a genuine statement error surface.
fn reconcile_statement_error(
    inner: &SessionInner,
    planning_version: CatalogVersion,
    err: Error,
) -> Error {
    match err {
        Error::CatalogVersionMismatch { .. }
        | Error::ObjectNotFound { .. }
        | Error::StorageFault(_)
        | Error::Arrow(_)
        | Error::Internal(_) => err,
        other => {
            let current = inner.store.read_version();
            if current == planning_version {
                return other;
            }
            inner.watcher.refresh_if_needed(&inner.cache);
            tracing::debug!(
                expected = planning_version,
                found = current,
                "statement error re-judged as staleness"
            );
            Error::CatalogVersionMismatch {
                expected: planning_version,
                found: current,
            }
        }
    }
}

/// Map a commit-time pin failure to the caller-visible error.
///
/// The pin failing means a schema change landed between Planning and the
/// storage call. If the change removed an object this statement touches, the
/// statement is wrong at the current schema (`does not exist`); otherwise it
/// is merely stale and retryable. Either way the session refreshes first.
fn commit_conflict(inner: &SessionInner, refs: &[&TableRef], err: Error) -> Error {
    let Error::CatalogVersionMismatch { expected, found } = err else {
        return err;
    };

    inner.watcher.refresh_if_needed(&inner.cache);
    for table in refs {
        if inner.store.fetch_object(table).is_none() {
            return Error::object_not_found(&table.namespace, &table.name);
        }
    }
    tracing::debug!(
        expected,
        found,
        "statement aborted by concurrent schema change"
    );
    Error::CatalogVersionMismatch { expected, found }
}

fn execute_insert(
    inner: &SessionInner,
    insert: &InsertPlan,
    object: &Arc<SchemaObject>,
    planning_version: CatalogVersion,
    refs: &[&TableRef],
) -> Result<StatementResult> {
    // Map the target column list onto the object's declared columns. An
    // empty list targets all columns in declared order.
    let target_positions: Vec<usize> = if insert.columns.is_empty() {
        (0..object.columns.len()).collect()
    } else {
        let mut positions = Vec::with_capacity(insert.columns.len());
        for name in &insert.columns {
            let position = object
                .columns
                .iter()
                .position(|column| column.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| unknown_column(object, name))?;
            positions.push(position);
        }
        positions
    };

    let all_columns: Vec<&ColumnDef> = object.columns.iter().collect();
    let mut typed_rows: Vec<TypedRow> = Vec::with_capacity(insert.rows.len());
    for row in &insert.rows {
        if row.len() != target_positions.len() {
            return Err(Error::ConstraintError(format!(
                "INSERT row has {} values but targets {} columns",
                row.len(),
                target_positions.len()
            )));
        }

        // Unmentioned columns receive NULL; coercion enforces nullability.
        let mut full_row = vec![PlanValue::Null; object.columns.len()];
        for (value, position) in row.iter().zip(&target_positions) {
            full_row[*position] = value.clone();
        }
        typed_rows.push(coerce_row(&all_columns, &full_row)?);
    }

    let rows_inserted = inner
        .store
        .run_pinned(planning_version, || {
            inner.engine.insert_rows(object, typed_rows)
        })
        .map_err(|err| commit_conflict(inner, refs, err))?;

    Ok(StatementResult::Insert {
        table_name: object.qualified_name(),
        rows_inserted,
    })
}

fn execute_select(
    inner: &SessionInner,
    select: &SelectPlan,
    object: &Arc<SchemaObject>,
    planning_version: CatalogVersion,
    refs: &[&TableRef],
) -> Result<StatementResult> {
    let projection: Vec<ColumnDef> = match &select.projection {
        SelectProjection::AllColumns => object.columns.clone(),
        SelectProjection::Columns(names) => {
            let mut columns = Vec::with_capacity(names.len());
            for name in names {
                let column = object
                    .column(name)
                    .ok_or_else(|| unknown_column(object, name))?;
                columns.push(column.clone());
            }
            columns
        }
    };

    let filter = lower_filter(object, select.filter.as_ref())?;

    let batch = inner
        .store
        .run_pinned(planning_version, || {
            inner.engine.scan(object, &projection, filter.as_ref())
        })
        .map_err(|err| commit_conflict(inner, refs, err))?;

    Ok(StatementResult::Select {
        table_name: object.qualified_name(),
        schema: batch.schema(),
        batch,
    })
}

fn execute_delete(
    inner: &SessionInner,
    delete: &DeletePlan,
    object: &Arc<SchemaObject>,
    planning_version: CatalogVersion,
    refs: &[&TableRef],
) -> Result<StatementResult> {
    let filter = lower_filter(object, delete.filter.as_ref())?;

    let rows_deleted = inner
        .store
        .run_pinned(planning_version, || {
            inner.engine.delete_rows(object, filter.as_ref())
        })
        .map_err(|err| commit_conflict(inner, refs, err))?;

    Ok(StatementResult::Delete {
        table_name: object.qualified_name(),
        rows_deleted,
    })
}

fn unknown_column(object: &SchemaObject, name: &str) -> Error {
    Error::InvalidArgumentError(format!(
        "column '{}' of table '{}' does not exist",
        name,
        object.qualified_name()
    ))
}

/// Resolve a plan filter against the object's columns, coercing the literal
/// to the column's type.
fn lower_filter(object: &SchemaObject, filter: Option<&FilterExpr>) -> Result<Option<RowFilter>> {
    let Some(FilterExpr::Equals { column, value }) = filter else {
        return Ok(None);
    };

    let column_def = object
        .column(column)
        .ok_or_else(|| unknown_column(object, column))?;

    // Equality with NULL matches nothing; skip coercion so the nullability
    // check cannot misfire on a filter literal.
    let value = if value.is_null() {
        PlanValue::Null
    } else {
        coerce_value(column_def, value)?
    };

    Ok(Some(RowFilter {
        field_id: column_def.field_id,
        value,
    }))
}
