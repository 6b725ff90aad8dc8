//! Logical statement plan structures for cachet.
//!
//! This crate defines the plan structures that represent logical statement
//! operations before they are executed. Plans are created by SQL parsers or
//! fluent builders and consumed by the runtime's statement executor; the
//! grammar that produces them is an external collaborator and never appears
//! at this layer.
//!
//! The one contract the executor relies on is [`StatementPlan::schema_refs`]:
//! the set of schema objects a statement touches, known before planning
//! resolves anything against the session cache.

#![forbid(unsafe_code)]

pub mod plans;

pub use plans::{
    AlterTableOperation, AlterTablePlan, ColumnSpec, CreateTablePlan, DEFAULT_NAMESPACE, DdlPlan,
    DeletePlan, DropTablePlan, FilterExpr, InsertPlan, IntoColumnSpec, PlanResult, PlanValue,
    SelectPlan, SelectProjection, StatementPlan, TableRef,
};
