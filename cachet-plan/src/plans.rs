//! Plan structures for DML statements and schema changes.

use arrow::datatypes::DataType;

/// Result type for plan operations.
pub type PlanResult<T> = cachet_result::Result<T>;

/// Namespace used when a table reference does not name one explicitly.
pub const DEFAULT_NAMESPACE: &str = "public";

// ============================================================================
// PlanValue Types
// ============================================================================

/// Literal value carried by a plan.
///
/// Values are untyped at the plan layer; the executor coerces them against
/// the resolved column types at execution time.
#[derive(Clone, Debug, PartialEq)]
pub enum PlanValue {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl PlanValue {
    /// SQL-style name of the literal's type, used in type-mismatch messages.
    ///
    /// Numeric literals deliberately share one name ("numeric"): whether an
    /// integer or a float was written, the complaint against a boolean column
    /// reads the same way.
    pub fn sql_type_name(&self) -> &'static str {
        match self {
            PlanValue::Null => "unknown",
            PlanValue::Integer(_) | PlanValue::Float(_) => "numeric",
            PlanValue::Boolean(_) => "boolean",
            PlanValue::String(_) => "text",
        }
    }

    /// Whether this literal is the SQL NULL.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, PlanValue::Null)
    }
}

impl From<&str> for PlanValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PlanValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for PlanValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for PlanValue {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<f64> for PlanValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PlanValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

// ============================================================================
// Table References
// ============================================================================

/// Qualified (namespace, name) reference to a schema object.
///
/// Display forms are preserved as written; lookups use the canonical
/// (ASCII-lowercased) form so `People` and `people` name the same object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub namespace: String,
    pub name: String,
}

impl TableRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Reference in the default namespace.
    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(DEFAULT_NAMESPACE, name)
    }

    /// Canonical lookup key: `namespace.name`, ASCII-lowercased.
    pub fn canonical_key(&self) -> String {
        format!(
            "{}.{}",
            self.namespace.to_ascii_lowercase(),
            self.name.to_ascii_lowercase()
        )
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

// ============================================================================
// Column Specifications
// ============================================================================

/// Column specification for CREATE TABLE and ALTER TABLE ADD COLUMN.
#[derive(Clone, Debug)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Trait for types that can be converted into a [`ColumnSpec`].
pub trait IntoColumnSpec {
    fn into_column_spec(self) -> ColumnSpec;
}

impl IntoColumnSpec for ColumnSpec {
    fn into_column_spec(self) -> ColumnSpec {
        self
    }
}

impl IntoColumnSpec for (&str, DataType) {
    fn into_column_spec(self) -> ColumnSpec {
        ColumnSpec::new(self.0, self.1, true)
    }
}

impl IntoColumnSpec for (&str, DataType, bool) {
    fn into_column_spec(self) -> ColumnSpec {
        ColumnSpec::new(self.0, self.1, self.2)
    }
}

// ============================================================================
// Schema Change Plans
// ============================================================================

/// Plan for creating a table.
#[derive(Clone, Debug)]
pub struct CreateTablePlan {
    pub table: TableRef,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnSpec>,
}

impl CreateTablePlan {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            if_not_exists: false,
            columns: Vec::new(),
        }
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn with_column(mut self, spec: impl IntoColumnSpec) -> Self {
        self.columns.push(spec.into_column_spec());
        self
    }
}

/// Plan for dropping a table.
#[derive(Clone, Debug)]
pub struct DropTablePlan {
    pub table: TableRef,
    pub if_exists: bool,
}

impl DropTablePlan {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            if_exists: false,
        }
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }
}

/// A single ALTER TABLE operation.
#[derive(Clone, Debug)]
pub enum AlterTableOperation {
    AddColumn(ColumnSpec),
    DropColumn(String),
}

/// Plan for altering a table in place.
#[derive(Clone, Debug)]
pub struct AlterTablePlan {
    pub table: TableRef,
    pub operation: AlterTableOperation,
}

impl AlterTablePlan {
    pub fn add_column(table: TableRef, spec: impl IntoColumnSpec) -> Self {
        Self {
            table,
            operation: AlterTableOperation::AddColumn(spec.into_column_spec()),
        }
    }

    pub fn drop_column(table: TableRef, column: impl Into<String>) -> Self {
        Self {
            table,
            operation: AlterTableOperation::DropColumn(column.into()),
        }
    }
}

/// Schema-mutating statement, routed through the DDL guard rather than the
/// retryable statement executor.
#[derive(Clone, Debug)]
pub enum DdlPlan {
    CreateTable(CreateTablePlan),
    DropTable(DropTablePlan),
    AlterTable(AlterTablePlan),
}

impl DdlPlan {
    /// The schema object this change targets.
    pub fn target(&self) -> &TableRef {
        match self {
            DdlPlan::CreateTable(plan) => &plan.table,
            DdlPlan::DropTable(plan) => &plan.table,
            DdlPlan::AlterTable(plan) => &plan.table,
        }
    }
}

impl From<CreateTablePlan> for DdlPlan {
    fn from(plan: CreateTablePlan) -> Self {
        DdlPlan::CreateTable(plan)
    }
}

impl From<DropTablePlan> for DdlPlan {
    fn from(plan: DropTablePlan) -> Self {
        DdlPlan::DropTable(plan)
    }
}

impl From<AlterTablePlan> for DdlPlan {
    fn from(plan: AlterTablePlan) -> Self {
        DdlPlan::AlterTable(plan)
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Minimal predicate supported by scans and deletes.
///
/// The full expression language belongs to the excluded planner; equality on
/// a single column is all this layer needs.
#[derive(Clone, Debug)]
pub enum FilterExpr {
    Equals { column: String, value: PlanValue },
}

impl FilterExpr {
    pub fn equals(column: impl Into<String>, value: impl Into<PlanValue>) -> Self {
        FilterExpr::Equals {
            column: column.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// INSERT Plan
// ============================================================================

/// Plan for inserting rows into a table.
#[derive(Clone, Debug)]
pub struct InsertPlan {
    pub table: TableRef,
    /// Target column names. Empty means "all columns in declared order".
    pub columns: Vec<String>,
    pub rows: Vec<Vec<PlanValue>>,
}

impl InsertPlan {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_row<I, V>(mut self, row: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<PlanValue>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
        self
    }
}

// ============================================================================
// SELECT Plan
// ============================================================================

/// Projection for SELECT operations.
#[derive(Clone, Debug)]
pub enum SelectProjection {
    AllColumns,
    Columns(Vec<String>),
}

/// Logical query plan for SELECT operations.
#[derive(Clone, Debug)]
pub struct SelectPlan {
    pub table: TableRef,
    pub projection: SelectProjection,
    pub filter: Option<FilterExpr>,
}

impl SelectPlan {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            projection: SelectProjection::AllColumns,
            filter: None,
        }
    }

    pub fn select_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = SelectProjection::Columns(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filter = Some(filter);
        self
    }
}

// ============================================================================
// DELETE Plan
// ============================================================================

/// Plan for deleting rows from a table.
#[derive(Clone, Debug)]
pub struct DeletePlan {
    pub table: TableRef,
    pub filter: Option<FilterExpr>,
}

impl DeletePlan {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filter = Some(filter);
        self
    }
}

// ============================================================================
// Statement Plans
// ============================================================================

/// Data statement routed through the retryable statement executor.
#[derive(Clone, Debug)]
pub enum StatementPlan {
    Insert(InsertPlan),
    Select(SelectPlan),
    Delete(DeletePlan),
}

impl StatementPlan {
    /// The schema objects this statement references, as supplied by the
    /// parser/planner collaborator ahead of cache resolution.
    pub fn schema_refs(&self) -> Vec<&TableRef> {
        match self {
            StatementPlan::Insert(plan) => vec![&plan.table],
            StatementPlan::Select(plan) => vec![&plan.table],
            StatementPlan::Delete(plan) => vec![&plan.table],
        }
    }
}

impl From<InsertPlan> for StatementPlan {
    fn from(plan: InsertPlan) -> Self {
        StatementPlan::Insert(plan)
    }
}

impl From<SelectPlan> for StatementPlan {
    fn from(plan: SelectPlan) -> Self {
        StatementPlan::Select(plan)
    }
}

impl From<DeletePlan> for StatementPlan {
    fn from(plan: DeletePlan) -> Self {
        StatementPlan::Delete(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_key_folds_case() {
        let a = TableRef::new("Public", "Cache_Test1");
        let b = TableRef::bare("cache_test1");
        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_eq!(a.to_string(), "Public.Cache_Test1");
    }

    #[test]
    fn schema_refs_cover_every_statement_kind() {
        let table = TableRef::bare("t");
        let insert = StatementPlan::from(InsertPlan::new(table.clone()).with_row([1_i64]));
        let select = StatementPlan::from(SelectPlan::new(table.clone()));
        let delete = StatementPlan::from(DeletePlan::new(table.clone()));

        for plan in [insert, select, delete] {
            assert_eq!(plan.schema_refs(), vec![&table]);
        }
    }

    #[test]
    fn fluent_create_table_builder() {
        use arrow::datatypes::DataType;

        let plan = CreateTablePlan::new(TableRef::bare("people"))
            .with_column(("id", DataType::Int64, false))
            .with_column(("name", DataType::Utf8))
            .if_not_exists();

        assert!(plan.if_not_exists);
        assert_eq!(plan.columns.len(), 2);
        assert!(!plan.columns[0].nullable);
        assert!(plan.columns[1].nullable);
    }

    #[test]
    fn plan_value_type_names() {
        assert_eq!(PlanValue::from(1_i64).sql_type_name(), "numeric");
        assert_eq!(PlanValue::from(1.5_f64).sql_type_name(), "numeric");
        assert_eq!(PlanValue::from(true).sql_type_name(), "boolean");
        assert_eq!(PlanValue::from("x").sql_type_name(), "text");
        assert_eq!(PlanValue::Null.sql_type_name(), "unknown");
    }
}
