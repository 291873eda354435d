//! Assertion persistence: one blob per `(store, model)`, replaced wholesale

use relstore_core::Assertion;
use rusqlite::{params, Connection, OptionalExtension};

use crate::classifier::ErrorClassifier;
use crate::errors::{handle_sql_error, Result};

pub fn upsert_assertions(
    conn: &Connection,
    classifier: &dyn ErrorClassifier,
    store: &str,
    model_id: &str,
    assertions: &[Assertion],
) -> Result<()> {
    let blob = serde_json::to_vec(assertions)?;
    conn.execute(
        "INSERT INTO assertion (store, authorization_model_id, assertions) VALUES (?, ?, ?)
         ON CONFLICT (store, authorization_model_id) DO UPDATE SET assertions = excluded.assertions",
        params![store, model_id, blob],
    )
    .map_err(|e| handle_sql_error(classifier, e, "write_assertions").with_store_id(store))?;
    Ok(())
}

/// Assertions for a model; empty when none were written
pub fn read_assertions(
    conn: &Connection,
    classifier: &dyn ErrorClassifier,
    store: &str,
    model_id: &str,
) -> Result<Vec<Assertion>> {
    let blob: Option<Vec<u8>> = conn
        .query_row(
            "SELECT assertions FROM assertion WHERE store = ? AND authorization_model_id = ?",
            params![store, model_id],
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| handle_sql_error(classifier, e, "read_assertions").with_store_id(store))?;
    match blob {
        Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
        None => Ok(Vec::new()),
    }
}
