//! SQL dialect strategy
//!
//! The write engine asks the dialect for the two things that differ between
//! backends: how to match a batch of composite keys, and how to ask for row
//! locks on the rows it reads.

use relstore_core::TupleLockKey;

use crate::sql::Fragment;

pub trait SqlDialect: Send + Sync {
    /// Predicate matching any of `keys` on the tuple identity columns
    fn key_disjunction(&self, keys: &[TupleLockKey]) -> Fragment;

    /// Table reference for a locking read (table hints go here)
    fn lock_table(&self, table: &str) -> String;

    /// Clause appended to a locking read (`FOR UPDATE` and the like)
    fn lock_suffix(&self) -> &'static str;

    fn limit(&self, n: usize) -> String;
}

/// SQLite has no row locks. A write transaction takes the database write
/// lock at `BEGIN IMMEDIATE`, which already serializes overlapping writers,
/// so both lock hooks are no-ops here.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn key_disjunction(&self, keys: &[TupleLockKey]) -> Fragment {
        // no row-value IN on every supported backend: expand to OR of ANDs
        Fragment::any_of(
            keys.iter()
                .map(|k| {
                    Fragment::new(
                        "object_type = ? AND object_id = ? AND relation = ? AND _user = ? AND user_type = ?",
                        vec![
                            k.object_type.clone().into(),
                            k.object_id.clone().into(),
                            k.relation.clone().into(),
                            k.user.clone().into(),
                            k.user_type.as_str().to_string().into(),
                        ],
                    )
                })
                .collect(),
        )
    }

    fn lock_table(&self, table: &str) -> String {
        table.to_string()
    }

    fn lock_suffix(&self) -> &'static str {
        ""
    }

    fn limit(&self, n: usize) -> String {
        format!(" LIMIT {}", n)
    }
}
