// Integration tests for concurrent writers on one database
// Each writer runs on its own thread with its own connection

mod common;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use common::{all_keys, new_store, setup, tk};
use relstore_core::errors::ExErrorKind;
use relstore_core::{Result, TupleKey, WriteOptions};
use relstore_store::Datastore;

/// Run `f` on `n` threads released together; collect their results
fn race<F>(datastore: &Datastore, n: usize, f: F) -> Vec<Result<()>>
where
    F: Fn(&Datastore, usize) -> Result<()> + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(n));
    let f = Arc::new(f);
    let handles: Vec<_> = (0..n)
        .map(|i| {
            let ds = datastore.clone();
            let barrier = barrier.clone();
            let f = f.clone();
            thread::spawn(move || {
                barrier.wait();
                f(&ds, i)
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn test_concurrent_deletes_of_missing_tuple_both_fail() {
    let (_dir, ds) = setup();
    let store = new_store(&ds);

    let s = store.clone();
    let results = race(&ds, 2, move |ds, _| {
        ds.write(&s, &[tk("doc:1", "viewer", "user:anne")], &[], WriteOptions::default())
    });

    for result in results {
        assert_eq!(result.unwrap_err().kind(), ExErrorKind::InvalidWriteInput);
    }
}

#[test]
fn test_concurrent_inserts_of_same_tuple_exactly_one_wins() {
    // Given: Two writers inserting the same new tuple at once
    let (_dir, ds) = setup();
    let store = new_store(&ds);

    let s = store.clone();
    let results = race(&ds, 2, move |ds, _| {
        ds.write(&s, &[], &[tk("doc:1", "viewer", "user:anne")], WriteOptions::default())
    });

    // Then: One commits and the other reports the lost race
    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1, "results: {:?}", results);
    let loser = results.into_iter().find_map(|r| r.err()).unwrap();
    assert!(
        matches!(
            loser.kind(),
            ExErrorKind::InvalidWriteInput | ExErrorKind::WriteConflictOnInsert
        ),
        "unexpected kind {:?}",
        loser.kind()
    );
    assert_eq!(all_keys(&ds, &store).len(), 1);
}

#[test]
fn test_concurrent_deletes_of_existing_tuple_exactly_one_wins() {
    let (_dir, ds) = setup();
    let store = new_store(&ds);
    ds.write(&store, &[], &[tk("doc:1", "viewer", "user:anne")], WriteOptions::default())
        .unwrap();

    let s = store.clone();
    let results = race(&ds, 2, move |ds, _| {
        ds.write(&s, &[tk("doc:1", "viewer", "user:anne")], &[], WriteOptions::default())
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = results.into_iter().find_map(|r| r.err()).unwrap();
    assert!(loser.kind().is_write_conflict(), "kind {:?}", loser.kind());
    assert!(all_keys(&ds, &store).is_empty());
}

#[test]
fn test_overlapping_writers_in_opposite_order_all_commit() {
    // Given: Writers touching the same keys, each listing them in a different order
    let (_dir, ds) = setup();
    let store = new_store(&ds);
    let keys: Vec<TupleKey> = (0..20)
        .map(|i| tk(&format!("doc:{:02}", i), "viewer", "user:anne"))
        .collect();
    ds.write(&store, &[], &keys, WriteOptions::default()).unwrap();

    // When: Each writer deletes the shared keys (missing ones ignored) and inserts its own
    let s = store.clone();
    let shared = keys.clone();
    let results = race(&ds, 4, move |ds, i| {
        let mut deletes = shared.clone();
        if i % 2 == 1 {
            deletes.reverse();
        }
        let own = tk(&format!("doc:writer{}", i), "owner", "user:anne");
        ds.write(
            &s,
            &deletes,
            &[own],
            WriteOptions::default().ignore_missing_deletes(),
        )
    });

    // Then: Nobody deadlocks or fails, and only the writers' own tuples remain
    for result in &results {
        assert!(result.is_ok(), "{:?}", result);
    }
    let mut remaining = all_keys(&ds, &store);
    remaining.sort();
    assert_eq!(
        remaining,
        (0..4)
            .map(|i| format!("doc:writer{}#owner@user:anne", i))
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_readers_see_committed_state_only() {
    let (_dir, ds) = setup();
    let store = new_store(&ds);
    let writes: Vec<TupleKey> = (0..50)
        .map(|i| tk(&format!("doc:{:02}", i), "viewer", "user:anne"))
        .collect();

    let writer_ds = ds.clone();
    let s = store.clone();
    let writer = thread::spawn(move || {
        writer_ds
            .write(&s, &[], &writes, WriteOptions::default())
            .unwrap()
    });

    // a reader never observes a partial call
    for _ in 0..20 {
        let n = all_keys(&ds, &store).len();
        assert!(n == 0 || n == 50, "saw {} tuples", n);
    }
    writer.join().unwrap();
    assert_eq!(all_keys(&ds, &store).len(), 50);
}

#[test]
fn test_deadline_bounds_wait_for_held_write_lock() {
    // Given: Another connection holding the write lock, and a busy timeout
    // far longer than the caller's deadline
    let (_dir, ds) = setup();
    let store = new_store(&ds);
    assert!(ds.config().busy_timeout() >= Duration::from_secs(5));
    let holder = rusqlite::Connection::open(&ds.config().database_path).unwrap();
    holder.execute_batch("BEGIN IMMEDIATE").unwrap();

    // When: A write with a short deadline waits for the lock
    let started = Instant::now();
    let err = ds
        .write(
            &store,
            &[],
            &[tk("doc:1", "viewer", "user:anne")],
            WriteOptions::default().with_deadline(started + Duration::from_millis(200)),
        )
        .unwrap_err();

    // Then: It gives up at the deadline, not after the busy timeout
    assert_eq!(err.kind(), ExErrorKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());

    // And: Once the lock is released the same write goes through
    holder.execute_batch("ROLLBACK").unwrap();
    ds.write(&store, &[], &[tk("doc:1", "viewer", "user:anne")], WriteOptions::default())
        .unwrap();
    assert_eq!(all_keys(&ds, &store).len(), 1);
}
