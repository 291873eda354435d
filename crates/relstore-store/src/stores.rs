//! Store lifecycle persistence
//!
//! Stores are soft-deleted. Every query applies a [`LifecycleFilter`] when it
//! is built, so deleted stores are excluded in one place.

use chrono::{DateTime, Utc};
use relstore_core::errors::ExErrorKind;
use relstore_core::model::LifecycleFilter;
use relstore_core::pagination::split_page;
use relstore_core::{Pagination, Store, StoreLifecycle};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

use crate::classifier::ErrorClassifier;
use crate::dialect::SqlDialect;
use crate::errors::{handle_sql_error, Result};
use crate::rows::{datetime_to_micros, micros_to_datetime};
use crate::sql::{Conditions, Fragment};

const STORE_COLUMNS: &str = "id, name, created_at, updated_at, deleted_at";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListStoresOptions {
    /// Restrict to these ids; empty for all
    pub ids: Vec<String>,
    pub name: Option<String>,
    pub pagination: Pagination,
}

fn lifecycle_fragment(filter: LifecycleFilter) -> Option<Fragment> {
    match filter {
        LifecycleFilter::ActiveOnly => Some(Fragment::new("deleted_at IS NULL", Vec::new())),
        LifecycleFilter::Any => None,
    }
}

struct RawStore {
    id: String,
    name: String,
    created_at: i64,
    updated_at: i64,
    deleted_at: Option<i64>,
}

impl RawStore {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
            deleted_at: row.get(4)?,
        })
    }

    fn into_store(self) -> Result<Store> {
        let deleted_at = self.deleted_at.map(micros_to_datetime).transpose()?;
        Ok(Store {
            id: self.id,
            name: self.name,
            created_at: micros_to_datetime(self.created_at)?,
            updated_at: micros_to_datetime(self.updated_at)?,
            lifecycle: StoreLifecycle::from_deleted_at(deleted_at),
        })
    }
}

/// # Errors
///
/// `Collision` if a store with this id exists, deleted or not.
pub fn insert_store(
    conn: &Connection,
    classifier: &dyn ErrorClassifier,
    id: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Store> {
    let micros = datetime_to_micros(now);
    conn.execute(
        "INSERT INTO store (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
        params![id, name, micros, micros],
    )
    .map_err(|e| handle_sql_error(classifier, e, "create_store").with_store_id(id))?;
    get_store(conn, classifier, id, LifecycleFilter::ActiveOnly)
}

/// # Errors
///
/// `NotFound` if no store with this id is admitted by `filter`.
pub fn get_store(
    conn: &Connection,
    classifier: &dyn ErrorClassifier,
    id: &str,
    filter: LifecycleFilter,
) -> Result<Store> {
    let mut conditions = Conditions::new().and(Fragment::eq("id", id.to_string()));
    if let Some(f) = lifecycle_fragment(filter) {
        conditions = conditions.and(f);
    }
    let sql = format!(
        "SELECT {} FROM store{}",
        STORE_COLUMNS,
        conditions.where_clause()
    );
    conn.query_row(&sql, params_from_iter(conditions.into_params()), RawStore::from_row)
        .map_err(|e| {
            let err = handle_sql_error(classifier, e, "get_store").with_store_id(id);
            if err.kind() == ExErrorKind::NotFound {
                err.with_message("store not found")
            } else {
                err
            }
        })?
        .into_store()
}

/// Stores ordered by id, paged with an inclusive `id >= token` resume
pub fn list_stores(
    conn: &Connection,
    classifier: &dyn ErrorClassifier,
    dialect: &dyn SqlDialect,
    options: &ListStoresOptions,
    filter: LifecycleFilter,
) -> Result<(Vec<Store>, Option<String>)> {
    let resume_from = options.pagination.decoded_from()?;

    let mut conditions = Conditions::new();
    if let Some(f) = lifecycle_fragment(filter) {
        conditions = conditions.and(f);
    }
    if !options.ids.is_empty() {
        conditions = conditions.and(Fragment::in_list("id", &options.ids));
    }
    if let Some(name) = options.name.as_ref().filter(|n| !n.is_empty()) {
        conditions = conditions.and(Fragment::eq("name", name.clone()));
    }
    if let Some(from) = resume_from {
        conditions = conditions.and(Fragment::new("id >= ?", vec![Value::Text(from)]));
    }

    let limit = options
        .pagination
        .fetch_limit()
        .map(|n| dialect.limit(n))
        .unwrap_or_default();
    let sql = format!(
        "SELECT {} FROM store{} ORDER BY id ASC{}",
        STORE_COLUMNS,
        conditions.where_clause(),
        limit
    );

    let classify = |e| handle_sql_error(classifier, e, "list_stores");
    let mut stmt = conn.prepare(&sql).map_err(classify)?;
    let stores = stmt
        .query_map(params_from_iter(conditions.into_params()), RawStore::from_row)
        .map_err(classify)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(classify)?
        .into_iter()
        .map(RawStore::into_store)
        .collect::<Result<Vec<_>>>()?;

    Ok(split_page(stores, options.pagination.page_size, |s| {
        s.id.clone()
    }))
}

/// Mark a store deleted; deleting a deleted or unknown store is a no-op
pub fn soft_delete_store(
    conn: &Connection,
    classifier: &dyn ErrorClassifier,
    id: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let micros = datetime_to_micros(now);
    let affected = conn
        .execute(
            "UPDATE store SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
            params![micros, micros, id],
        )
        .map_err(|e| handle_sql_error(classifier, e, "delete_store").with_store_id(id))?;
    if affected == 0 {
        tracing::debug!(store_id = id, "delete_store matched no active store");
    }
    Ok(())
}
