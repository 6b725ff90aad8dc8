//! Storage engine trait and the in-memory columnar implementation.

use std::sync::{Arc, RwLock};

use arrow::array::{ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use cachet_catalog::{ColumnDef, FieldId, ObjectId, SchemaObject};
use cachet_plan::PlanValue;
use cachet_result::{Error, Result};
use rustc_hash::FxHashMap;

/// A row whose values have been coerced to their columns' declared types,
/// keyed by stable field id.
pub type TypedRow = Vec<(FieldId, PlanValue)>;

/// Equality predicate on a single column, with the literal already coerced
/// to the column's type.
#[derive(Clone, Debug)]
pub struct RowFilter {
    pub field_id: FieldId,
    pub value: PlanValue,
}

/// The physical execution collaborator.
///
/// Implementations receive validated, fresh [`SchemaObject`] snapshots and
/// perform the actual data reads and writes. Failures are opaque to the
/// consistency core and surface as [`Error::StorageFault`] unchanged.
pub trait StorageEngine: Send + Sync {
    /// Allocate physical storage for a newly created object.
    fn create_object(&self, object: &SchemaObject) -> Result<()>;

    /// Release physical storage for a dropped object.
    fn drop_object(&self, object_id: ObjectId) -> Result<()>;

    /// Append typed rows; returns the number of rows written.
    fn insert_rows(&self, object: &SchemaObject, rows: Vec<TypedRow>) -> Result<usize>;

    /// Delete rows matching the filter (all rows when `None`); returns the
    /// number of rows removed.
    fn delete_rows(&self, object: &SchemaObject, filter: Option<&RowFilter>) -> Result<usize>;

    /// Scan the projected columns of rows matching the filter into an Arrow
    /// record batch.
    fn scan(
        &self,
        object: &SchemaObject,
        projection: &[ColumnDef],
        filter: Option<&RowFilter>,
    ) -> Result<RecordBatch>;
}

/// Per-object column vectors keyed by field id.
///
/// Columns added by ALTER simply have no vector (or a shorter one) for rows
/// that predate them; reads pad with NULL. Dropped columns keep their retired
/// vectors around unreferenced, since field ids are never reused.
struct TableData {
    columns: FxHashMap<FieldId, Vec<PlanValue>>,
    row_count: usize,
}

impl TableData {
    fn new() -> Self {
        Self {
            columns: FxHashMap::default(),
            row_count: 0,
        }
    }

    fn value_at(&self, field_id: FieldId, row: usize) -> PlanValue {
        self.columns
            .get(&field_id)
            .and_then(|column| column.get(row))
            .cloned()
            .unwrap_or(PlanValue::Null)
    }

    fn matching_rows(&self, filter: Option<&RowFilter>) -> Vec<usize> {
        match filter {
            None => (0..self.row_count).collect(),
            Some(filter) => (0..self.row_count)
                .filter(|row| {
                    let value = self.value_at(filter.field_id, *row);
                    // SQL equality: NULL matches nothing.
                    !value.is_null() && value == filter.value
                })
                .collect(),
        }
    }
}

/// In-memory columnar storage engine.
///
/// Tables are keyed by [`ObjectId`], so a dropped-and-recreated table starts
/// from empty storage and stale writers can never resurrect old rows.
pub struct MemTableStore {
    tables: RwLock<FxHashMap<ObjectId, Arc<RwLock<TableData>>>>,
}

impl MemTableStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(FxHashMap::default()),
        }
    }

    fn table(&self, object_id: ObjectId) -> Result<Arc<RwLock<TableData>>> {
        let tables = self.tables.read().expect("table registry lock poisoned");
        tables
            .get(&object_id)
            .map(Arc::clone)
            .ok_or_else(|| Error::StorageFault(format!("unknown storage object {object_id}")))
    }
}

impl Default for MemTableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine for MemTableStore {
    fn create_object(&self, object: &SchemaObject) -> Result<()> {
        let mut tables = self.tables.write().expect("table registry lock poisoned");
        if tables.contains_key(&object.object_id) {
            return Err(Error::StorageFault(format!(
                "storage object {} already exists",
                object.object_id
            )));
        }
        tables.insert(object.object_id, Arc::new(RwLock::new(TableData::new())));
        tracing::trace!(object_id = object.object_id, table = %object.qualified_name(), "storage object created");
        Ok(())
    }

    fn drop_object(&self, object_id: ObjectId) -> Result<()> {
        let mut tables = self.tables.write().expect("table registry lock poisoned");
        if tables.remove(&object_id).is_none() {
            return Err(Error::StorageFault(format!(
                "unknown storage object {object_id}"
            )));
        }
        tracing::trace!(object_id, "storage object dropped");
        Ok(())
    }

    fn insert_rows(&self, object: &SchemaObject, rows: Vec<TypedRow>) -> Result<usize> {
        let table = self.table(object.object_id)?;
        let mut data = table.write().expect("table data lock poisoned");

        let inserted = rows.len();
        for row in rows {
            let row_index = data.row_count;
            for (field_id, value) in row {
                let column = data.columns.entry(field_id).or_default();
                // Pad for rows written before this column existed.
                column.resize(row_index, PlanValue::Null);
                column.push(value);
            }
            data.row_count += 1;
        }

        // Retired or unmentioned columns keep alignment with NULLs.
        let row_count = data.row_count;
        for column in data.columns.values_mut() {
            column.resize(row_count, PlanValue::Null);
        }

        tracing::trace!(object_id = object.object_id, inserted, "rows appended");
        Ok(inserted)
    }

    fn delete_rows(&self, object: &SchemaObject, filter: Option<&RowFilter>) -> Result<usize> {
        let table = self.table(object.object_id)?;
        let mut data = table.write().expect("table data lock poisoned");

        let matches = data.matching_rows(filter);
        if matches.is_empty() {
            return Ok(0);
        }

        let mut keep = vec![true; data.row_count];
        for row in &matches {
            keep[*row] = false;
        }

        for column in data.columns.values_mut() {
            let mut index = 0;
            column.retain(|_| {
                let kept = keep[index];
                index += 1;
                kept
            });
        }
        data.row_count -= matches.len();

        tracing::trace!(
            object_id = object.object_id,
            deleted = matches.len(),
            "rows deleted"
        );
        Ok(matches.len())
    }

    fn scan(
        &self,
        object: &SchemaObject,
        projection: &[ColumnDef],
        filter: Option<&RowFilter>,
    ) -> Result<RecordBatch> {
        let table = self.table(object.object_id)?;
        let data = table.read().expect("table data lock poisoned");
        let rows = data.matching_rows(filter);

        let mut fields = Vec::with_capacity(projection.len());
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(projection.len());
        for column in projection {
            let values: Vec<PlanValue> = rows
                .iter()
                .map(|row| data.value_at(column.field_id, *row))
                .collect();
            fields.push(Field::new(
                &column.name,
                column.data_type.clone(),
                column.nullable,
            ));
            arrays.push(build_array(column, values)?);
        }

        let schema = Arc::new(Schema::new(fields));
        Ok(RecordBatch::try_new(schema, arrays)?)
    }
}

/// Materialize one column of stored values as an Arrow array.
fn build_array(column: &ColumnDef, values: Vec<PlanValue>) -> Result<ArrayRef> {
    fn unexpected(column: &ColumnDef, value: &PlanValue) -> Error {
        Error::Internal(format!(
            "stored value {value:?} diverged from declared type of column '{}'",
            column.name
        ))
    }

    match column.data_type {
        DataType::Int64 => {
            let mut builder = Int64Builder::with_capacity(values.len());
            for value in &values {
                match value {
                    PlanValue::Null => builder.append_null(),
                    PlanValue::Integer(v) => builder.append_value(*v),
                    other => return Err(unexpected(column, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Float64 => {
            let mut builder = Float64Builder::with_capacity(values.len());
            for value in &values {
                match value {
                    PlanValue::Null => builder.append_null(),
                    PlanValue::Float(v) => builder.append_value(*v),
                    other => return Err(unexpected(column, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(values.len());
            for value in &values {
                match value {
                    PlanValue::Null => builder.append_null(),
                    PlanValue::Boolean(v) => builder.append_value(*v),
                    other => return Err(unexpected(column, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Utf8 => {
            let mut builder = StringBuilder::new();
            for value in &values {
                match value {
                    PlanValue::Null => builder.append_null(),
                    PlanValue::String(v) => builder.append_value(v),
                    other => return Err(unexpected(column, other)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        ref other => Err(Error::InvalidArgumentError(format!(
            "unsupported column type: {other:?}"
        ))),
    }
}
