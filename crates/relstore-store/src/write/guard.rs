//! Commit guard: post-statement checks, deadline enforcement, commit/rollback
//!
//! Nothing a write call does becomes visible unless every batch passed its
//! check; the first failure rolls back the whole transaction.

use std::time::{Duration, Instant};

use relstore_core::errors::{ExError, ExErrorKind};
use relstore_core::WriteOptions;
use rusqlite::{Connection, Transaction};

use crate::classifier::{BackendErrorClass, ErrorClassifier};
use crate::errors::{deadline_exceeded, handle_sql_error, Result};

use super::OP_WRITE;

/// Statements run between progress-handler callbacks
const PROGRESS_OPS: i32 = 1_000;

/// A delete batch must remove exactly the rows that were locked for it
pub fn check_delete_batch(affected: usize, expected: usize) -> Result<()> {
    if affected == expected {
        return Ok(());
    }
    Err(ExError::new(ExErrorKind::WriteConflictOnDelete)
        .with_op(OP_WRITE)
        .with_message(format!(
            "deleted {} rows, expected {}; a concurrent transaction removed some of them",
            affected, expected
        )))
}

/// Reclassify a uniqueness violation on a tuple insert as a lost race
pub fn check_insert_batch(
    result: rusqlite::Result<usize>,
    classifier: &dyn ErrorClassifier,
) -> Result<usize> {
    result.map_err(|err| match classifier.classify(&err) {
        BackendErrorClass::Collision => ExError::new(ExErrorKind::WriteConflictOnInsert)
            .with_op(OP_WRITE)
            .with_message("tuple inserted by a concurrent transaction after the lock was taken"),
        _ => handle_sql_error(classifier, err, OP_WRITE),
    })
}

/// Checked before every round trip
pub fn check_deadline(options: &WriteOptions) -> Result<()> {
    if options.deadline_passed() {
        Err(deadline_exceeded(OP_WRITE))
    } else {
        Ok(())
    }
}

/// Interrupt any statement still running once `deadline` passes
pub fn install_deadline(conn: &Connection, deadline: Instant) {
    conn.progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= deadline));
}

/// Time left to wait for the write lock: the busy timeout, cut short by `deadline`
///
/// The progress handler does not run while SQLite waits on a busy lock, so
/// the wait itself has to be bounded.
pub fn lock_wait(busy_timeout: Duration, deadline: Instant) -> Duration {
    busy_timeout.min(deadline.saturating_duration_since(Instant::now()))
}

pub fn clear_deadline(conn: &Connection) {
    conn.progress_handler(0, None::<fn() -> bool>);
}

/// Commit on success, roll back on any error
pub fn finish<T>(
    tx: Transaction<'_>,
    outcome: Result<T>,
    classifier: &dyn ErrorClassifier,
) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit()
                .map_err(|e| handle_sql_error(classifier, e, OP_WRITE))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                tracing::warn!(error = %rollback_err, "rollback failed after write error");
            }
            Err(err)
        }
    }
}
