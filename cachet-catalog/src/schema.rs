//! Schema object snapshots handed out by the catalog store.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use cachet_result::{Error, Result};

use crate::version::{FieldId, ObjectId};

/// SQL-style display name for a column type, used in error messages.
pub fn sql_type_name(data_type: &DataType) -> &'static str {
    match data_type {
        DataType::Int64 => "bigint",
        DataType::Float64 => "double precision",
        DataType::Boolean => "boolean",
        DataType::Utf8 => "text",
        _ => "unsupported",
    }
}

/// A typed column within a [`SchemaObject`].
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    /// Stable identity of this column within its object.
    pub field_id: FieldId,
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnDef {
    pub fn new(
        field_id: FieldId,
        name: impl Into<String>,
        data_type: DataType,
        nullable: bool,
    ) -> Self {
        Self {
            field_id,
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Immutable snapshot of one schema object (a table) at some catalog version.
///
/// Snapshots are shared via `Arc` between the store, session caches, and
/// in-flight statements; a schema change never mutates an existing snapshot,
/// it installs a replacement in the store.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaObject {
    /// Structural identity; changes when the object is dropped and recreated
    /// under the same name.
    pub object_id: ObjectId,
    pub namespace: String,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    /// Next field id to hand out for ALTER TABLE ADD COLUMN.
    pub next_field_id: FieldId,
}

impl SchemaObject {
    /// Display form `namespace.name`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Canonical lookup key, ASCII-lowercased.
    pub fn canonical_key(&self) -> String {
        canonical_object_key(&self.namespace, &self.name)
    }

    /// Case-insensitive column lookup.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }

    /// Render this object as an Arrow schema for result construction.
    pub fn to_arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|column| Field::new(&column.name, column.data_type.clone(), column.nullable))
            .collect();
        Arc::new(Schema::new(fields))
    }

    /// Copy of this object with one more column.
    ///
    /// Added columns must be nullable: there is no default back-fill for
    /// existing rows at this layer.
    pub fn with_column(&self, name: &str, data_type: DataType, nullable: bool) -> Result<Self> {
        if self.column(name).is_some() {
            return Err(Error::ConstraintError(format!(
                "column '{}' of table '{}' already exists",
                name,
                self.qualified_name()
            )));
        }
        if !nullable {
            return Err(Error::ConstraintError(format!(
                "cannot add non-nullable column '{}' to table '{}' without a default",
                name,
                self.qualified_name()
            )));
        }

        let mut updated = self.clone();
        updated.columns.push(ColumnDef::new(
            updated.next_field_id,
            name,
            data_type,
            nullable,
        ));
        updated.next_field_id += 1;
        Ok(updated)
    }

    /// Copy of this object with the named column removed.
    pub fn without_column(&self, name: &str) -> Result<Self> {
        let position = self
            .columns
            .iter()
            .position(|column| column.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                Error::InvalidArgumentError(format!(
                    "column '{}' of table '{}' does not exist",
                    name,
                    self.qualified_name()
                ))
            })?;

        if self.columns.len() == 1 {
            return Err(Error::InvalidArgumentError(format!(
                "cannot drop the only column of table '{}'",
                self.qualified_name()
            )));
        }

        let mut updated = self.clone();
        updated.columns.remove(position);
        Ok(updated)
    }
}

/// Canonical lookup key for a qualified object name.
pub fn canonical_object_key(namespace: &str, name: &str) -> String {
    format!(
        "{}.{}",
        namespace.to_ascii_lowercase(),
        name.to_ascii_lowercase()
    )
}
