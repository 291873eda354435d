//! Transactional write path
//!
//! One call runs in one `BEGIN IMMEDIATE` transaction:
//!
//! 1. order and deduplicate the touched keys ([`make_tuple_lock_keys`])
//! 2. lock and read the existing rows ([`locker`])
//! 3. decide against that snapshot ([`resolve`])
//! 4. apply deletes, inserts and changelog rows in batches ([`executor`])
//! 5. check every batch and commit, or roll back on the first failure ([`guard`])

pub mod executor;
pub mod guard;
pub mod locker;

use std::time::Duration;

use relstore_core::tuple_utils::validate_write_request;
use relstore_core::{log_op_step, make_tuple_lock_keys, resolve, IdGenerator, TupleKey, WriteOptions};
use rusqlite::{Connection, TransactionBehavior};

use crate::classifier::ErrorClassifier;
use crate::dialect::SqlDialect;
use crate::errors::{handle_sql_error, Result};

pub use executor::ExecutionReport;

pub const OP_WRITE: &str = "write";

/// Collaborators and limits for the write path
pub struct WriteEngine<'a> {
    pub dialect: &'a dyn SqlDialect,
    pub classifier: &'a dyn ErrorClassifier,
    pub ids: &'a dyn IdGenerator,
    pub batch_size: usize,
    pub max_tuples_per_write: usize,
    /// Connection's configured wait for the write lock
    pub busy_timeout: Duration,
}

/// Outcome of a committed write call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub lock_keys: usize,
    pub report: ExecutionReport,
}

impl WriteEngine<'_> {
    /// Apply `deletes` and `writes` to `store` atomically
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for malformed or duplicate keys, or too many of them
    /// - `InvalidWriteInput` / `ConditionConflict` per the policies in `options`
    /// - `WriteConflictOnDelete` / `WriteConflictOnInsert` for lost races
    /// - `Timeout` once `options.deadline` has passed
    ///
    /// On any error nothing is applied.
    pub fn write(
        &self,
        conn: &mut Connection,
        store: &str,
        deletes: &[TupleKey],
        writes: &[TupleKey],
        options: &WriteOptions,
    ) -> Result<WriteSummary> {
        validate_write_request(deletes, writes, self.max_tuples_per_write)?;
        if deletes.is_empty() && writes.is_empty() {
            return Ok(WriteSummary::default());
        }
        guard::check_deadline(options)?;

        if let Some(deadline) = options.deadline {
            conn.busy_timeout(guard::lock_wait(self.busy_timeout, deadline))
                .map_err(|e| handle_sql_error(self.classifier, e, OP_WRITE))?;
            guard::install_deadline(conn, deadline);
        }
        let outcome = self.run(conn, store, deletes, writes, options);
        if options.deadline.is_some() {
            guard::clear_deadline(conn);
            if let Err(e) = conn.busy_timeout(self.busy_timeout) {
                tracing::warn!(error = %e, "failed to restore busy timeout after write");
            }
        }
        outcome
    }

    fn run(
        &self,
        conn: &mut Connection,
        store: &str,
        deletes: &[TupleKey],
        writes: &[TupleKey],
        options: &WriteOptions,
    ) -> Result<WriteSummary> {
        // a lock wait cut short by the deadline is a timeout, not a backend failure
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| match guard::check_deadline(options) {
                Err(timeout) => timeout,
                Ok(()) => handle_sql_error(self.classifier, e, OP_WRITE),
            })?;

        let outcome = (|| -> Result<WriteSummary> {
            let lock_keys = make_tuple_lock_keys(deletes, writes);
            let existing = locker::lock_existing(&tx, self, store, &lock_keys, options)?;
            log_op_step!(
                OP_WRITE,
                "locked",
                store_id = store,
                lock_keys_len = lock_keys.len(),
                rows_len = existing.len(),
                batches = lock_keys.len().div_ceil(self.batch_size),
            );

            let resolved = resolve(&existing, deletes, writes, options)?;
            let report = executor::execute(&tx, self, store, &resolved, options)?;
            log_op_step!(
                OP_WRITE,
                "applied",
                store_id = store,
                deletes_len = report.deleted,
                writes_len = report.inserted,
                batches = report.round_trips,
            );

            guard::check_deadline(options)?;
            Ok(WriteSummary {
                lock_keys: lock_keys.len(),
                report,
            })
        })();

        guard::finish(tx, outcome, self.classifier)
    }
}
