//! Existing-row locker
//!
//! Reads the current row for every touched key, in lock-key order, inside
//! the write transaction. The result is the snapshot the resolver decides
//! against.

use std::collections::HashMap;

use relstore_core::tuple_utils::tuple_key_to_string;
use relstore_core::{Tuple, TupleLockKey, WriteOptions};
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use rusqlite::Transaction;

use crate::errors::{handle_sql_error, Result};
use crate::rows::{RawTuple, TUPLE_COLUMNS};

use super::{guard, WriteEngine, OP_WRITE};

/// Locked rows keyed by `object#relation@user`
pub fn lock_existing(
    tx: &Transaction<'_>,
    engine: &WriteEngine<'_>,
    store: &str,
    keys: &[TupleLockKey],
    options: &WriteOptions,
) -> Result<HashMap<String, Tuple>> {
    let mut existing = HashMap::with_capacity(keys.len());

    for batch in keys.chunks(engine.batch_size) {
        guard::check_deadline(options)?;

        let disjunction = engine.dialect.key_disjunction(batch);
        let sql = format!(
            "SELECT {} FROM {} WHERE store = ? AND {}{}",
            TUPLE_COLUMNS,
            engine.dialect.lock_table("tuple"),
            disjunction.sql,
            engine.dialect.lock_suffix()
        );
        let mut params = Vec::with_capacity(disjunction.params.len() + 1);
        params.push(Value::Text(store.to_string()));
        params.extend(disjunction.params);

        let mut stmt = tx
            .prepare(&sql)
            .map_err(|e| handle_sql_error(engine.classifier, e, OP_WRITE))?;
        let raw = stmt
            .query_map(params_from_iter(params), RawTuple::from_row)
            .map_err(|e| handle_sql_error(engine.classifier, e, OP_WRITE))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| handle_sql_error(engine.classifier, e, OP_WRITE))?;

        for row in raw {
            let tuple = row.into_tuple(store)?;
            existing.insert(tuple_key_to_string(&tuple.key), tuple);
        }
    }

    Ok(existing)
}
