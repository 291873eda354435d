//! Mutation executor
//!
//! Applies resolved deletes and writes in batches, then appends one
//! changelog row per applied mutation. Delete entries get their ids first,
//! so within one call every DELETE sorts before every WRITE.

use chrono::Utc;
use relstore_core::tuple_utils::{encode_condition, get_user_type_from_user, split_object};
use relstore_core::{ResolvedWrite, TupleKey, TupleLockKey, TupleOperation, WriteOptions};
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use rusqlite::Transaction;

use crate::errors::{handle_sql_error, Result};
use crate::rows::datetime_to_micros;
use crate::sql::row_placeholders;

use super::{guard, WriteEngine, OP_WRITE};

const TUPLE_INSERT_COLUMNS: [&str; 10] = [
    "store",
    "object_type",
    "object_id",
    "relation",
    "_user",
    "user_type",
    "condition_name",
    "condition_context",
    "ulid",
    "inserted_at",
];

const CHANGELOG_INSERT_COLUMNS: [&str; 10] = [
    "store",
    "object_type",
    "object_id",
    "relation",
    "_user",
    "condition_name",
    "condition_context",
    "operation",
    "ulid",
    "inserted_at",
];

/// What one write call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub deleted: usize,
    pub inserted: usize,
    pub changelog_rows: usize,
    pub round_trips: usize,
}

struct ChangeRow<'a> {
    key: &'a TupleKey,
    operation: TupleOperation,
    ulid: String,
}

pub fn execute(
    tx: &Transaction<'_>,
    engine: &WriteEngine<'_>,
    store: &str,
    resolved: &ResolvedWrite,
    options: &WriteOptions,
) -> Result<ExecutionReport> {
    let mut report = ExecutionReport::default();
    let now = datetime_to_micros(Utc::now());

    let mut changes: Vec<ChangeRow<'_>> = resolved
        .deletes
        .iter()
        .map(|key| ChangeRow {
            key,
            operation: TupleOperation::Delete,
            ulid: engine.ids.next_id(),
        })
        .collect();
    let write_ids: Vec<String> = resolved.writes.iter().map(|_| engine.ids.next_id()).collect();

    for batch in resolved.deletes.chunks(engine.batch_size) {
        guard::check_deadline(options)?;
        report.deleted += delete_batch(tx, engine, store, batch)?;
        report.round_trips += 1;
    }

    let writes: Vec<(&TupleKey, &String)> = resolved.writes.iter().zip(write_ids.iter()).collect();
    for batch in writes.chunks(engine.batch_size) {
        guard::check_deadline(options)?;
        report.inserted += insert_batch(tx, engine, store, batch, now)?;
        report.round_trips += 1;
    }

    changes.extend(writes.iter().map(|&(key, ulid)| ChangeRow {
        key,
        operation: TupleOperation::Write,
        ulid: ulid.clone(),
    }));
    for batch in changes.chunks(engine.batch_size) {
        guard::check_deadline(options)?;
        report.changelog_rows += changelog_batch(tx, engine, store, batch, now)?;
        report.round_trips += 1;
    }

    Ok(report)
}

fn delete_batch(
    tx: &Transaction<'_>,
    engine: &WriteEngine<'_>,
    store: &str,
    batch: &[TupleKey],
) -> Result<usize> {
    let keys: Vec<TupleLockKey> = batch.iter().map(TupleLockKey::from_tuple_key).collect();
    let disjunction = engine.dialect.key_disjunction(&keys);
    let sql = format!("DELETE FROM tuple WHERE store = ? AND {}", disjunction.sql);

    let mut params = Vec::with_capacity(disjunction.params.len() + 1);
    params.push(Value::Text(store.to_string()));
    params.extend(disjunction.params);

    let affected = tx
        .execute(&sql, params_from_iter(params))
        .map_err(|e| handle_sql_error(engine.classifier, e, OP_WRITE))?;
    guard::check_delete_batch(affected, batch.len())?;
    Ok(affected)
}

fn insert_batch(
    tx: &Transaction<'_>,
    engine: &WriteEngine<'_>,
    store: &str,
    batch: &[(&TupleKey, &String)],
    now: i64,
) -> Result<usize> {
    let sql = format!(
        "INSERT INTO tuple ({}) VALUES {}",
        TUPLE_INSERT_COLUMNS.join(", "),
        row_placeholders(batch.len(), TUPLE_INSERT_COLUMNS.len())
    );

    let mut params = Vec::with_capacity(batch.len() * TUPLE_INSERT_COLUMNS.len());
    for (key, ulid) in batch {
        let (object_type, object_id) = split_object(&key.object);
        let (condition_name, condition_context) = encode_condition(key.condition.as_ref())?;
        params.extend([
            Value::Text(store.to_string()),
            Value::Text(object_type.to_string()),
            Value::Text(object_id.to_string()),
            Value::Text(key.relation.clone()),
            Value::Text(key.user.clone()),
            Value::Text(get_user_type_from_user(&key.user).as_str().to_string()),
            condition_name.into(),
            condition_context.into(),
            Value::Text(ulid.to_string()),
            Value::Integer(now),
        ]);
    }

    guard::check_insert_batch(tx.execute(&sql, params_from_iter(params)), engine.classifier)
}

fn changelog_batch(
    tx: &Transaction<'_>,
    engine: &WriteEngine<'_>,
    store: &str,
    batch: &[ChangeRow<'_>],
    now: i64,
) -> Result<usize> {
    let sql = format!(
        "INSERT INTO changelog ({}) VALUES {}",
        CHANGELOG_INSERT_COLUMNS.join(", "),
        row_placeholders(batch.len(), CHANGELOG_INSERT_COLUMNS.len())
    );

    let mut params = Vec::with_capacity(batch.len() * CHANGELOG_INSERT_COLUMNS.len());
    for change in batch {
        let (object_type, object_id) = split_object(&change.key.object);
        // deletes record identity only
        let (condition_name, condition_context) = match change.operation {
            TupleOperation::Write => encode_condition(change.key.condition.as_ref())?,
            TupleOperation::Delete => (None, None),
        };
        params.extend([
            Value::Text(store.to_string()),
            Value::Text(object_type.to_string()),
            Value::Text(object_id.to_string()),
            Value::Text(change.key.relation.clone()),
            Value::Text(change.key.user.clone()),
            condition_name.into(),
            condition_context.into(),
            Value::Integer(change.operation.as_i64()),
            Value::Text(change.ulid.clone()),
            Value::Integer(now),
        ]);
    }

    tx.execute(&sql, params_from_iter(params))
        .map_err(|e| handle_sql_error(engine.classifier, e, OP_WRITE))
}
