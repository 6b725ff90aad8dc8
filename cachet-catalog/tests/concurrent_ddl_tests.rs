//! Concurrency contracts of the catalog store: exactly-one-winner commits
//! and monotone version observation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use arrow::datatypes::DataType;
use cachet_catalog::{DdlOp, DdlRequest, INITIAL_CATALOG_VERSION, VersionedCatalogStore};
use cachet_plan::{ColumnSpec, TableRef};
use cachet_result::{Error, Result};

fn create_op(name: &str) -> DdlOp {
    DdlOp::CreateTable {
        table: TableRef::bare(name),
        columns: vec![ColumnSpec::new("a", DataType::Int64, true)],
    }
}

#[test]
fn same_base_version_commits_exactly_once() {
    cachet_test_utils::init_tracing_for_tests();
    let store = Arc::new(VersionedCatalogStore::new());
    let contenders = 8;
    let barrier = Arc::new(Barrier::new(contenders));

    let handles: Vec<_> = (0..contenders)
        .map(|index| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.apply_ddl(
                    DdlRequest::new(INITIAL_CATALOG_VERSION, create_op(&format!("t{index}"))),
                    |_| Ok(()),
                )
            })
        })
        .collect();

    let outcomes: Vec<Result<_>> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread panicked"))
        .collect();

    let committed: Vec<_> = outcomes.iter().filter(|outcome| outcome.is_ok()).collect();
    assert_eq!(committed.len(), 1, "outcomes: {outcomes:?}");
    for outcome in &outcomes {
        if let Err(err) = outcome {
            assert!(matches!(err, Error::DdlRejected { .. }), "got {err}");
        }
    }

    // One winner, one bump, one object.
    assert_eq!(store.read_version(), INITIAL_CATALOG_VERSION + 1);
    assert_eq!(store.object_count(), 1);
}

#[test]
fn read_version_never_decreases_under_ddl_storm() {
    cachet_test_utils::init_tracing_for_tests();
    let store = Arc::new(VersionedCatalogStore::new());
    let done = Arc::new(AtomicBool::new(false));

    let reader_store = Arc::clone(&store);
    let reader_done = Arc::clone(&done);
    let reader = thread::spawn(move || {
        let mut last = reader_store.read_version();
        while !reader_done.load(Ordering::SeqCst) {
            let observed = reader_store.read_version();
            assert!(observed >= last, "version regressed: {last} -> {observed}");
            last = observed;
        }
        last
    });

    for index in 0..50 {
        let base = store.read_version();
        store
            .apply_ddl(DdlRequest::new(base, create_op(&format!("t{index}"))), |_| {
                Ok(())
            })
            .expect("sequential ddl");
    }
    done.store(true, Ordering::SeqCst);

    let final_observed = reader.join().expect("reader thread");
    assert!(final_observed <= store.read_version());
    assert_eq!(store.read_version(), INITIAL_CATALOG_VERSION + 50);
}

#[test]
fn chained_ddl_each_bumps_by_one() {
    let store = VersionedCatalogStore::new();
    let mut version = store.read_version();
    for index in 0..5 {
        let next = store
            .apply_ddl(
                DdlRequest::new(version, create_op(&format!("t{index}"))),
                |_| Ok(()),
            )
            .expect("create");
        assert_eq!(next, version + 1);
        version = next;
    }
    assert_eq!(store.object_count(), 5);
}
