//! Execution-time typing of plan literals against resolved column sets.

use arrow::datatypes::DataType;
use cachet_catalog::{ColumnDef, sql_type_name};
use cachet_plan::PlanValue;
use cachet_result::{Error, Result};

use crate::engine::TypedRow;

/// Check and coerce one literal against a column's declared type.
///
/// The only implicit conversion is integer-literal-into-float-column; every
/// other cross-type combination is a type error carrying SQL-style type
/// names, and NULL into a non-nullable column is a constraint error.
pub fn coerce_value(column: &ColumnDef, value: &PlanValue) -> Result<PlanValue> {
    match (value, &column.data_type) {
        (PlanValue::Null, _) => {
            if column.nullable {
                Ok(PlanValue::Null)
            } else {
                Err(Error::ConstraintError(format!(
                    "null value in column '{}' violates not-null constraint",
                    column.name
                )))
            }
        }
        (PlanValue::Integer(v), DataType::Int64) => Ok(PlanValue::Integer(*v)),
        (PlanValue::Integer(v), DataType::Float64) => Ok(PlanValue::Float(*v as f64)),
        (PlanValue::Float(v), DataType::Float64) => Ok(PlanValue::Float(*v)),
        (PlanValue::Boolean(v), DataType::Boolean) => Ok(PlanValue::Boolean(*v)),
        (PlanValue::String(v), DataType::Utf8) => Ok(PlanValue::String(v.clone())),
        (other, declared) => Err(Error::TypeMismatch {
            column: column.name.clone(),
            expected: sql_type_name(declared).to_string(),
            actual: other.sql_type_name().to_string(),
        }),
    }
}

/// Coerce a full row of literals against the given column set.
///
/// `columns` and `values` are positionally aligned; arity mismatches are the
/// caller's bug and surface as constraint errors.
pub fn coerce_row(columns: &[&ColumnDef], values: &[PlanValue]) -> Result<TypedRow> {
    if columns.len() != values.len() {
        return Err(Error::ConstraintError(format!(
            "row has {} values but {} columns were targeted",
            values.len(),
            columns.len()
        )));
    }

    let mut row = Vec::with_capacity(columns.len());
    for (column, value) in columns.iter().zip(values) {
        row.push((column.field_id, coerce_value(column, value)?));
    }
    Ok(row)
}
