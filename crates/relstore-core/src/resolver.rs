//! Conflict resolution against the locked snapshot
//!
//! Runs after the existing rows for every touched key have been locked, so
//! the snapshot cannot change underneath the decision.

use std::collections::HashMap;
use std::time::Instant;

use crate::errors::{condition_conflict, invalid_write_input, Result};
use crate::model::{conditions_equal, Tuple, TupleKey, TupleOperation};
use crate::tuple_utils::tuple_key_to_string;

/// What to do when a delete targets a tuple that does not exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnMissingDelete {
    #[default]
    Error,
    Ignore,
}

/// What to do when a write targets a tuple that already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnDuplicateInsert {
    #[default]
    Error,
    /// Skip the write if the stored condition is identical, fail otherwise
    Ignore,
}

/// Per-call write options
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    pub on_missing_delete: OnMissingDelete,
    pub on_duplicate_insert: OnDuplicateInsert,
    /// Abort and roll back once this instant has passed
    pub deadline: Option<Instant>,
}

impl WriteOptions {
    pub fn ignore_missing_deletes(mut self) -> Self {
        self.on_missing_delete = OnMissingDelete::Ignore;
        self
    }

    pub fn ignore_duplicate_inserts(mut self) -> Self {
        self.on_duplicate_insert = OnDuplicateInsert::Ignore;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// The mutations that survive resolution, in caller order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedWrite {
    pub deletes: Vec<TupleKey>,
    pub writes: Vec<TupleKey>,
}

impl ResolvedWrite {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.writes.is_empty()
    }
}

/// Decide which deletes and writes to apply
///
/// `existing` maps `object#relation@user` to the locked row.
///
/// # Errors
///
/// - `InvalidWriteInput` (DELETE) for a missing delete under `OnMissingDelete::Error`
/// - `InvalidWriteInput` (WRITE) for an existing write under `OnDuplicateInsert::Error`
/// - `ConditionConflict` for an existing write with a different condition under `OnDuplicateInsert::Ignore`
pub fn resolve(
    existing: &HashMap<String, Tuple>,
    deletes: &[TupleKey],
    writes: &[TupleKey],
    options: &WriteOptions,
) -> Result<ResolvedWrite> {
    let mut resolved = ResolvedWrite::default();

    for key in deletes {
        let rendered = tuple_key_to_string(key);
        if existing.contains_key(&rendered) {
            resolved.deletes.push(key.without_condition());
            continue;
        }
        match options.on_missing_delete {
            OnMissingDelete::Ignore => {}
            OnMissingDelete::Error => {
                return Err(invalid_write_input(rendered, TupleOperation::Delete));
            }
        }
    }

    for key in writes {
        let rendered = tuple_key_to_string(key);
        let Some(stored) = existing.get(&rendered) else {
            resolved.writes.push(key.clone());
            continue;
        };
        match options.on_duplicate_insert {
            OnDuplicateInsert::Error => {
                return Err(invalid_write_input(rendered, TupleOperation::Write));
            }
            OnDuplicateInsert::Ignore => {
                if !conditions_equal(key.condition.as_ref(), stored.key.condition.as_ref()) {
                    return Err(condition_conflict(rendered));
                }
            }
        }
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use crate::model::RelationshipCondition;
    use chrono::Utc;

    fn stored(key: TupleKey) -> (String, Tuple) {
        (
            tuple_key_to_string(&key),
            Tuple {
                key,
                store: "s".to_string(),
                ulid: "0000".to_string(),
                inserted_at: Utc::now(),
            },
        )
    }

    fn anne() -> TupleKey {
        TupleKey::new("doc:1", "viewer", "user:anne")
    }

    #[test]
    fn test_missing_delete_error_policy() {
        let err = resolve(&HashMap::new(), &[anne()], &[], &WriteOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidWriteInput);
        assert_eq!(err.operation(), Some(TupleOperation::Delete));
    }

    #[test]
    fn test_missing_delete_ignore_policy() {
        let opts = WriteOptions::default().ignore_missing_deletes();
        let resolved = resolve(&HashMap::new(), &[anne()], &[], &opts).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_duplicate_insert_error_policy() {
        let existing: HashMap<_, _> = [stored(anne())].into_iter().collect();
        let err = resolve(&existing, &[], &[anne()], &WriteOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidWriteInput);
        assert_eq!(err.operation(), Some(TupleOperation::Write));
    }

    #[test]
    fn test_duplicate_insert_ignore_same_condition_is_noop() {
        let cond = RelationshipCondition::new("in_office");
        let existing: HashMap<_, _> =
            [stored(anne().with_condition(cond.clone()))].into_iter().collect();
        let opts = WriteOptions::default().ignore_duplicate_inserts();
        let resolved = resolve(&existing, &[], &[anne().with_condition(cond)], &opts).unwrap();
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_duplicate_insert_ignore_different_condition_conflicts() {
        let existing: HashMap<_, _> = [stored(anne())].into_iter().collect();
        let opts = WriteOptions::default().ignore_duplicate_inserts();
        let write = anne().with_condition(RelationshipCondition::new("in_office"));
        let err = resolve(&existing, &[], &[write], &opts).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::ConditionConflict);
    }

    #[test]
    fn test_present_delete_and_new_write_pass_through() {
        let existing: HashMap<_, _> = [stored(anne())].into_iter().collect();
        let bob = TupleKey::new("doc:1", "viewer", "user:bob");
        let resolved = resolve(&existing, &[anne()], &[bob.clone()], &WriteOptions::default())
            .unwrap();
        assert_eq!(resolved.deletes, vec![anne()]);
        assert_eq!(resolved.writes, vec![bob]);
    }

    #[test]
    fn test_deadline_passed() {
        let opts = WriteOptions::default().with_deadline(Instant::now());
        assert!(opts.deadline_passed());
        assert!(!WriteOptions::default().deadline_passed());
    }
}
