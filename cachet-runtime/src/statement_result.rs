//! Results returned by the statement executor.

use arrow::array::{Array, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use cachet_plan::PlanValue;
use cachet_result::{Error, Result};

/// Outcome of a successfully executed data statement.
#[derive(Clone, Debug)]
pub enum StatementResult {
    Insert {
        table_name: String,
        rows_inserted: usize,
    },
    Delete {
        table_name: String,
        rows_deleted: usize,
    },
    Select {
        table_name: String,
        schema: SchemaRef,
        batch: RecordBatch,
    },
}

impl StatementResult {
    /// Materialize a SELECT result as plan values, row-major.
    ///
    /// Convenience for tests and embedders that do not want to touch Arrow
    /// arrays directly.
    pub fn select_rows(&self) -> Result<Vec<Vec<PlanValue>>> {
        match self {
            StatementResult::Select { batch, .. } => batch_to_rows(batch),
            other => Err(Error::InvalidArgumentError(format!(
                "not a SELECT result: {other:?}"
            ))),
        }
    }
}

fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<Vec<PlanValue>>> {
    let mut rows = vec![Vec::with_capacity(batch.num_columns()); batch.num_rows()];

    let schema = batch.schema();
    for (index, field) in schema.fields().iter().enumerate() {
        let column = batch.column(index);
        for (row_index, row) in rows.iter_mut().enumerate() {
            if column.is_null(row_index) {
                row.push(PlanValue::Null);
                continue;
            }
            let value = match field.data_type() {
                DataType::Int64 => {
                    let array = downcast::<Int64Array>(column, field.name())?;
                    PlanValue::Integer(array.value(row_index))
                }
                DataType::Float64 => {
                    let array = downcast::<Float64Array>(column, field.name())?;
                    PlanValue::Float(array.value(row_index))
                }
                DataType::Boolean => {
                    let array = downcast::<BooleanArray>(column, field.name())?;
                    PlanValue::Boolean(array.value(row_index))
                }
                DataType::Utf8 => {
                    let array = downcast::<StringArray>(column, field.name())?;
                    PlanValue::String(array.value(row_index).to_string())
                }
                other => {
                    return Err(Error::InvalidArgumentError(format!(
                        "unsupported column type: {other:?}"
                    )));
                }
            };
            row.push(value);
        }
    }

    Ok(rows)
}

fn downcast<'a, T: 'static>(column: &'a dyn Array, name: &str) -> Result<&'a T> {
    column.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::Internal(format!(
            "result column '{name}' does not match its declared type"
        ))
    })
}
