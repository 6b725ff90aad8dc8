//! End-to-end cache-consistency scenarios over two sessions sharing one
//! catalog store, mirroring the behavior of a multi-node deployment where
//! each connection caches schema locally.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arrow::datatypes::DataType;
use cachet_catalog::VersionedCatalogStore;
use cachet_plan::{
    AlterTablePlan, CreateTablePlan, DeletePlan, DropTablePlan, FilterExpr, InsertPlan, PlanValue,
    SelectPlan, TableRef,
};
use cachet_result::Error;
use cachet_runtime::{EagerRefreshConfig, Session, with_catalog_retries};
use cachet_table::MemTableStore;

fn cluster() -> (Arc<VersionedCatalogStore>, Arc<MemTableStore>) {
    cachet_test_utils::init_tracing_for_tests();
    (
        Arc::new(VersionedCatalogStore::new()),
        Arc::new(MemTableStore::new()),
    )
}

fn connect(store: &Arc<VersionedCatalogStore>, engine: &Arc<MemTableStore>) -> Session {
    Session::connect(Arc::clone(store), Arc::<MemTableStore>::clone(engine))
}

fn insert_one(table: &TableRef, value: impl Into<PlanValue>) -> InsertPlan {
    InsertPlan::new(table.clone()).with_row([value.into()])
}

fn select_all(table: &TableRef) -> SelectPlan {
    SelectPlan::new(table.clone())
}

#[test]
fn stale_session_insert_succeeds_after_one_retry() {
    let (store, engine) = cluster();
    let session1 = connect(&store, &engine);
    let session2 = connect(&store, &engine);
    let table = TableRef::bare("cache_test1");

    // Session 1 creates the table and can use it immediately.
    session1
        .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Int64)))
        .expect("create");
    session1.execute(insert_one(&table, 1_i64)).expect("insert");

    // Session 2 connected before the table existed: its first touch fails
    // with the retryable mismatch, and the retry lands.
    let err = session2
        .execute(insert_one(&table, 2_i64))
        .expect_err("stale view");
    assert!(err.is_retryable(), "expected retryable error, got {err}");
    assert!(err.to_string().contains("Catalog Version Mismatch"));
    session2
        .execute(insert_one(&table, 2_i64))
        .expect("retry after refresh");

    // Both writes are visible.
    let rows = session1
        .execute(select_all(&table))
        .expect("select")
        .select_rows()
        .expect("rows");
    assert_eq!(
        rows,
        vec![vec![PlanValue::Integer(1)], vec![PlanValue::Integer(2)]]
    );
}

#[test]
fn dropped_table_does_not_exist_for_any_session() {
    let (store, engine) = cluster();
    let session1 = connect(&store, &engine);
    let session2 = connect(&store, &engine);
    let table = TableRef::bare("cache_test1");

    session1
        .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Int64)))
        .expect("create");
    session1.execute(insert_one(&table, 1_i64)).expect("insert");
    with_catalog_retries(2, || session2.execute(insert_one(&table, 2_i64))).expect("warm cache");

    // Session 2 drops the table; its own view is already current.
    session2
        .execute_ddl(DropTablePlan::new(table.clone()))
        .expect("drop");

    // Inserts now fail on both sessions with the not-found class, never a
    // retryable mismatch: the object is gone, retrying cannot help.
    let err = session1
        .execute(insert_one(&table, 3_i64))
        .expect_err("dropped");
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("does not exist"), "got {err}");

    let err = session2
        .execute(insert_one(&table, 4_i64))
        .expect_err("dropped");
    assert!(err.to_string().contains("does not exist"), "got {err}");
}

#[test]
fn recreate_with_new_type_is_never_written_through_stale_schema() {
    let (store, engine) = cluster();
    let session1 = connect(&store, &engine);
    let session2 = connect(&store, &engine);
    let table = TableRef::bare("cache_test2");

    // Session 1 creates an int table and uses it.
    session1
        .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Int64)))
        .expect("create int");
    session1.execute(insert_one(&table, 0_i64)).expect("insert");

    // Session 2 drops and recreates the same name with a float column.
    session2.refresh();
    session2
        .execute_ddl(DropTablePlan::new(table.clone()))
        .expect("drop");
    session2
        .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Float64)))
        .expect("recreate float");

    // Session 1 still holds the int-typed snapshot of the old object. Its
    // insert aborts once, then lands against the float column with the
    // integer literal coerced -- never against the stale int assumption.
    let err = session1
        .execute(insert_one(&table, 1_i64))
        .expect_err("stale identity");
    assert!(err.is_retryable());
    session1.execute(insert_one(&table, 1_i64)).expect("retry");
    session2
        .execute(insert_one(&table, 2_i64))
        .expect("current session insert");

    let rows = session1
        .execute(select_all(&table))
        .expect("select")
        .select_rows()
        .expect("rows");
    assert_eq!(
        rows,
        vec![vec![PlanValue::Float(1.0)], vec![PlanValue::Float(2.0)]]
    );
}

#[test]
fn recreate_as_boolean_surfaces_a_type_error_after_refresh() {
    let (store, engine) = cluster();
    let session1 = connect(&store, &engine);
    let session2 = connect(&store, &engine);
    let table = TableRef::bare("cache_test2");

    session1
        .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Float64)))
        .expect("create float");
    with_catalog_retries(2, || session2.execute(insert_one(&table, 1.5_f64))).expect("warm");

    // Session 1 swaps the table for a boolean one.
    session1
        .execute_ddl(DropTablePlan::new(table.clone()))
        .expect("drop");
    session1
        .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Boolean)))
        .expect("recreate bool");

    // A float insert from the stale session fails once with the mismatch,
    // then -- against the refreshed schema -- with a plain type error.
    let err = with_catalog_retries(2, || session2.execute(insert_one(&table, 1.0_f64)))
        .expect_err("numeric into boolean");
    assert_eq!(
        err.to_string(),
        "column 'a' is of type boolean but expression is of type numeric"
    );

    // Booleans work from both sessions.
    session2.execute(insert_one(&table, true)).expect("insert");
    session1.execute(insert_one(&table, false)).expect("insert");

    let rows = session2
        .execute(select_all(&table))
        .expect("select")
        .select_rows()
        .expect("rows");
    assert_eq!(
        rows,
        vec![vec![PlanValue::Boolean(true)], vec![PlanValue::Boolean(false)]]
    );
}

#[test]
fn added_column_costs_the_stale_session_exactly_one_mismatch() {
    let (store, engine) = cluster();
    let session1 = connect(&store, &engine);
    let session2 = connect(&store, &engine);
    let table = TableRef::bare("cache_test2");

    session1
        .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Boolean)))
        .expect("create");
    session1.execute(insert_one(&table, true)).expect("insert");
    with_catalog_retries(2, || session2.execute(insert_one(&table, false))).expect("warm");

    session1
        .execute_ddl(AlterTablePlan::add_column(
            table.clone(),
            ("b", DataType::Int64),
        ))
        .expect("alter");

    // Session 2's insert names the new column its snapshot has never seen:
    // one mismatch, then success with the new schema visible.
    let insert = InsertPlan::new(table.clone())
        .with_columns(["a", "b"])
        .with_row([PlanValue::Boolean(true), PlanValue::Integer(11)]);
    let err = session2.execute(insert.clone()).expect_err("stale shape");
    assert!(err.is_retryable(), "expected mismatch, got {err}");
    session2.execute(insert).expect("retry");

    session1
        .execute(
            InsertPlan::new(table.clone())
                .with_columns(["a", "b"])
                .with_row([PlanValue::Boolean(false), PlanValue::Integer(12)]),
        )
        .expect("current session insert");

    // Rows that predate the column read back as NULL.
    let rows = session2
        .execute(select_all(&table))
        .expect("select")
        .select_rows()
        .expect("rows");
    assert_eq!(
        rows,
        vec![
            vec![PlanValue::Boolean(true), PlanValue::Null],
            vec![PlanValue::Boolean(false), PlanValue::Null],
            vec![PlanValue::Boolean(true), PlanValue::Integer(11)],
            vec![PlanValue::Boolean(false), PlanValue::Integer(12)],
        ]
    );
}

#[test]
fn concurrent_create_against_shared_base_version_rejects_the_loser() {
    let (store, engine) = cluster();
    let session1 = connect(&store, &engine);
    let session2 = connect(&store, &engine);

    // Both sessions plan their CREATE against the same base version.
    session1
        .execute_ddl(CreateTablePlan::new(TableRef::bare("a")).with_column(("id", DataType::Int64)))
        .expect("winner");

    let err = session2
        .execute_ddl(CreateTablePlan::new(TableRef::bare("b")).with_column(("id", DataType::Int64)))
        .expect_err("loser");
    assert!(matches!(err, Error::DdlRejected { .. }));
    assert!(err.to_string().contains("Catalog Version Mismatch"));
    assert!(!err.is_retryable());

    // The losing table was not queued or merged.
    assert!(store.fetch_object(&TableRef::bare("b")).is_none());

    // The rejection refreshed session 2's view, so a deliberate re-plan
    // succeeds.
    session2
        .execute_ddl(CreateTablePlan::new(TableRef::bare("b")).with_column(("id", DataType::Int64)))
        .expect("re-planned create");
}

#[test]
fn unrelated_ddl_invalidates_the_whole_cache() {
    let (store, engine) = cluster();
    let session1 = connect(&store, &engine);
    let session2 = connect(&store, &engine);
    let table = TableRef::bare("t");

    session1
        .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Int64)))
        .expect("create");
    with_catalog_retries(2, || session2.execute(insert_one(&table, 1_i64))).expect("warm");

    // A DDL that never touches `t` still advances the version, so session
    // 2's next statement on `t` pays one mismatch. The consistency model is
    // version-exact, not per-object.
    session1
        .execute_ddl(
            CreateTablePlan::new(TableRef::bare("unrelated")).with_column(("x", DataType::Utf8)),
        )
        .expect("unrelated create");

    let err = session2
        .execute(insert_one(&table, 2_i64))
        .expect_err("whole-cache staleness");
    assert!(err.is_retryable());
    session2.execute(insert_one(&table, 3_i64)).expect("retry");
}

#[test]
fn refresh_converges_in_one_step_under_a_quiet_catalog() {
    let (store, engine) = cluster();
    let session1 = connect(&store, &engine);
    let session2 = connect(&store, &engine);
    let table = TableRef::bare("t");

    session1
        .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Int64)))
        .expect("create");

    let plan = insert_one(&table, 1_i64);
    assert!(session2.execute(plan.clone()).is_err());
    // Identical statement, unchanged schema: the retry must succeed.
    session2.execute(plan).expect("converged");
    assert_eq!(session2.current_version(), store.read_version());
}

#[test]
fn eager_refresh_converges_without_a_failed_statement() {
    let (store, engine) = cluster();
    let session1 = connect(&store, &engine);
    let session2 = connect(&store, &engine);
    let table = TableRef::bare("t");

    let poller = session2.start_eager_refresh(EagerRefreshConfig {
        interval: Duration::from_millis(5),
    });

    session1
        .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Int64)))
        .expect("create");

    // The poller is advisory, so give it a bounded window to catch up.
    let deadline = Instant::now() + Duration::from_secs(5);
    while session2.current_version() != store.read_version() {
        assert!(Instant::now() < deadline, "eager refresh never converged");
        std::thread::sleep(Duration::from_millis(5));
    }
    poller.stop();

    // No mismatch left to pay: the first attempt goes through.
    session2
        .execute(insert_one(&table, 1_i64))
        .expect("insert without lazy path");
}

#[test]
fn explicit_column_lists_null_fill_and_enforce_not_null() {
    let (store, engine) = cluster();
    let session = connect(&store, &engine);
    let table = TableRef::bare("t");

    session
        .execute_ddl(
            CreateTablePlan::new(table.clone())
                .with_column(("a", DataType::Int64, false))
                .with_column(("b", DataType::Utf8)),
        )
        .expect("create");

    // Unmentioned nullable column back-fills with NULL.
    session
        .execute(
            InsertPlan::new(table.clone())
                .with_columns(["a"])
                .with_row([41_i64]),
        )
        .expect("insert");

    // Omitting the non-nullable column is a constraint violation.
    let err = session
        .execute(
            InsertPlan::new(table.clone())
                .with_columns(["b"])
                .with_row(["x"]),
        )
        .expect_err("not-null");
    assert!(matches!(err, Error::ConstraintError(_)));

    let rows = session
        .execute(select_all(&table))
        .expect("select")
        .select_rows()
        .expect("rows");
    assert_eq!(rows, vec![vec![PlanValue::Integer(41), PlanValue::Null]]);
}

#[test]
fn delete_pays_the_same_staleness_contract_as_insert() {
    let (store, engine) = cluster();
    let session1 = connect(&store, &engine);
    let session2 = connect(&store, &engine);
    let table = TableRef::bare("t");

    session1
        .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Int64)))
        .expect("create");
    for value in [1_i64, 2, 2, 3] {
        session1.execute(insert_one(&table, value)).expect("seed");
    }

    let delete = DeletePlan::new(table.clone()).with_filter(FilterExpr::equals("a", 2_i64));
    let result =
        with_catalog_retries(2, || session2.execute(delete.clone())).expect("delete with retry");
    match result {
        cachet_runtime::StatementResult::Delete { rows_deleted, .. } => assert_eq!(rows_deleted, 2),
        other => panic!("unexpected result: {other:?}"),
    }

    let rows = session1
        .execute(select_all(&table))
        .expect("select")
        .select_rows()
        .expect("rows");
    assert_eq!(
        rows,
        vec![vec![PlanValue::Integer(1)], vec![PlanValue::Integer(3)]]
    );
}

#[test]
fn select_projection_follows_the_refreshed_schema() {
    let (store, engine) = cluster();
    let session1 = connect(&store, &engine);
    let session2 = connect(&store, &engine);
    let table = TableRef::bare("t");

    session1
        .execute_ddl(CreateTablePlan::new(table.clone()).with_column(("a", DataType::Int64)))
        .expect("create");
    session1.execute(insert_one(&table, 7_i64)).expect("insert");
    with_catalog_retries(2, || session2.execute(select_all(&table))).expect("warm");

    session1
        .execute_ddl(AlterTablePlan::add_column(
            table.clone(),
            ("b", DataType::Utf8),
        ))
        .expect("alter");

    // A projection naming the new column is staleness, not a missing column.
    let select = SelectPlan::new(table.clone()).select_columns(["a", "b"]);
    let err = session2.execute(select.clone()).expect_err("stale");
    assert!(err.is_retryable(), "expected mismatch, got {err}");

    let rows = session2
        .execute(select)
        .expect("retry")
        .select_rows()
        .expect("rows");
    assert_eq!(rows, vec![vec![PlanValue::Integer(7), PlanValue::Null]]);
}
