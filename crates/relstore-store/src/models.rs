//! Authorization model persistence
//!
//! Models are immutable: one row per `(store, id)`, written once, stored as a
//! single JSON blob. Ids are monotonic, so "latest" is the greatest id.

use relstore_core::errors::{ExError, ExErrorKind, TupleError};
use relstore_core::pagination::split_page;
use relstore_core::{AuthorizationModel, Pagination};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use crate::classifier::ErrorClassifier;
use crate::dialect::SqlDialect;
use crate::errors::{handle_sql_error, Result};
use crate::sql::{Conditions, Fragment};

fn decode(blob: Vec<u8>) -> Result<AuthorizationModel> {
    Ok(serde_json::from_slice(&blob)?)
}

fn not_found_message(err: ExError, message: &str) -> ExError {
    if err.kind() == ExErrorKind::NotFound {
        err.with_message(message.to_string())
    } else {
        err
    }
}

/// Persist a model; a model without type definitions is not written
///
/// # Errors
///
/// - `InvalidInput` when the model has more than `max_types` type definitions
/// - `Collision` when `(store, model.id)` already exists
pub fn insert_model(
    conn: &Connection,
    classifier: &dyn ErrorClassifier,
    store: &str,
    model: &AuthorizationModel,
    max_types: usize,
) -> Result<()> {
    if model.type_definitions.is_empty() {
        return Ok(());
    }
    if model.type_definitions.len() > max_types {
        return Err(TupleError::ExceedsMaxTypesPerModel {
            count: model.type_definitions.len(),
            limit: max_types,
        }
        .into());
    }

    let blob = serde_json::to_vec(model)?;
    conn.execute(
        "INSERT INTO authorization_model (store, authorization_model_id, schema_version, serialized_model) VALUES (?, ?, ?, ?)",
        params![store, model.id, model.schema_version, blob],
    )
    .map_err(|e| handle_sql_error(classifier, e, "write_authorization_model").with_store_id(store))?;
    Ok(())
}

/// # Errors
///
/// `NotFound` if the model does not exist in `store`.
pub fn get_model(
    conn: &Connection,
    classifier: &dyn ErrorClassifier,
    store: &str,
    id: &str,
) -> Result<AuthorizationModel> {
    let blob: Vec<u8> = conn
        .query_row(
            "SELECT serialized_model FROM authorization_model WHERE store = ? AND authorization_model_id = ?",
            params![store, id],
            |r| r.get(0),
        )
        .map_err(|e| {
            not_found_message(
                handle_sql_error(classifier, e, "read_authorization_model").with_store_id(store),
                "authorization model not found",
            )
        })?;
    decode(blob)
}

/// Models newest first, paged with an inclusive `id <= token` resume
pub fn list_models(
    conn: &Connection,
    classifier: &dyn ErrorClassifier,
    dialect: &dyn SqlDialect,
    store: &str,
    pagination: &Pagination,
) -> Result<(Vec<AuthorizationModel>, Option<String>)> {
    let mut conditions = Conditions::new().and(Fragment::eq("store", store.to_string()));
    if let Some(from) = pagination.decoded_from()? {
        conditions = conditions.and(Fragment::new(
            "authorization_model_id <= ?",
            vec![Value::Text(from)],
        ));
    }
    let limit = pagination
        .fetch_limit()
        .map(|n| dialect.limit(n))
        .unwrap_or_default();
    let sql = format!(
        "SELECT serialized_model FROM authorization_model{} ORDER BY authorization_model_id DESC{}",
        conditions.where_clause(),
        limit
    );

    let classify = |e| handle_sql_error(classifier, e, "read_authorization_models");
    let mut stmt = conn.prepare(&sql).map_err(classify)?;
    let models = stmt
        .query_map(params_from_iter(conditions.into_params()), |r| r.get::<_, Vec<u8>>(0))
        .map_err(classify)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(classify)?
        .into_iter()
        .map(decode)
        .collect::<Result<Vec<_>>>()?;

    Ok(split_page(models, pagination.page_size, |m| m.id.clone()))
}

/// # Errors
///
/// `NotFound` if the store has no models.
pub fn latest_model(
    conn: &Connection,
    classifier: &dyn ErrorClassifier,
    store: &str,
) -> Result<AuthorizationModel> {
    let blob: Vec<u8> = conn
        .query_row(
            "SELECT serialized_model FROM authorization_model WHERE store = ? ORDER BY authorization_model_id DESC LIMIT 1",
            params![store],
            |r| r.get(0),
        )
        .map_err(|e| {
            not_found_message(
                handle_sql_error(classifier, e, "find_latest_authorization_model")
                    .with_store_id(store),
                "no authorization models in store",
            )
        })?;
    decode(blob)
}
