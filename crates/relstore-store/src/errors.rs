//! Error handling for relstore-store
//!
//! Every rusqlite error passes through [`handle_sql_error`], which asks the
//! classifier what it means and builds the matching `ExError`.

use relstore_core::errors::{ExError, ExErrorKind};

use crate::classifier::{BackendErrorClass, ErrorClassifier, SqliteErrorClassifier};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Translate a backend error into the canonical taxonomy
pub fn handle_sql_error(
    classifier: &dyn ErrorClassifier,
    err: rusqlite::Error,
    op: &str,
) -> ExError {
    match classifier.classify(&err) {
        BackendErrorClass::NotFound => ExError::new(ExErrorKind::NotFound).with_op(op),
        BackendErrorClass::Collision => ExError::new(ExErrorKind::Collision)
            .with_op(op)
            .with_message("item already exists"),
        BackendErrorClass::Interrupted => ExError::new(ExErrorKind::Timeout)
            .with_op(op)
            .with_message("deadline exceeded; statement interrupted"),
        BackendErrorClass::Other => ExError::new(ExErrorKind::Persistence)
            .with_op(op)
            .with_message(err.to_string()),
    }
}

/// `handle_sql_error` with the SQLite classifier, for code outside the datastore
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    handle_sql_error(&SqliteErrorClassifier, err, "sqlite")
}

pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Migration)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::Migration)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: recorded {}, embedded {}",
            migration_id, expected, actual
        ))
}

pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

pub fn deadline_exceeded(op: &str) -> ExError {
    ExError::new(ExErrorKind::Timeout)
        .with_op(op)
        .with_message("deadline exceeded")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_codes_do_not_leak_into_kind() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT PRIMARY KEY); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();
        let ex = handle_sql_error(&SqliteErrorClassifier, err, "insert");
        assert_eq!(ex.kind(), ExErrorKind::Collision);
        assert_eq!(ex.op(), Some("insert"));
    }

    #[test]
    fn test_other_errors_are_persistence() {
        let err = from_rusqlite(rusqlite::Error::InvalidQuery);
        assert_eq!(err.kind(), ExErrorKind::Persistence);
    }
}
