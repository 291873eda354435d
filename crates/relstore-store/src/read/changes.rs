//! Changelog reader
//!
//! Entries younger than the horizon are withheld so a reader never sees a
//! position that an in-flight transaction could still insert before.
//!
//! Every non-empty page carries a token. Mid-scan tokens hold the first key
//! of the next page and resume inclusively. The tail page's token holds the
//! last delivered key behind an after-marker and resumes strictly past it,
//! so a caught-up reader polls with it and gets `NotFound` until new entries
//! commit.

use std::time::Duration;

use chrono::Utc;
use relstore_core::errors::{ExError, ExErrorKind};
use relstore_core::pagination::{encode_token, split_page};
use relstore_core::{Pagination, TupleChange};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::classifier::ErrorClassifier;
use crate::dialect::SqlDialect;
use crate::errors::{handle_sql_error, Result};
use crate::rows::{datetime_to_micros, RawChange, CHANGE_COLUMNS};
use crate::sql::{Conditions, Fragment};

pub const OP_READ_CHANGES: &str = "read_changes";

/// Leading marker of a tail token's key
const AFTER_MARKER: char = '>';

/// Where a changelog scan resumes
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resume {
    /// At this key, inclusively
    At(String),
    /// Strictly past this key
    After(String),
}

impl Resume {
    fn parse(store: &str, key: String) -> Result<Self> {
        match key.strip_prefix(AFTER_MARKER) {
            Some("") => Err(ExError::new(ExErrorKind::InvalidContinuationToken)
                .with_op(OP_READ_CHANGES)
                .with_store_id(store)
                .with_message("continuation token has no position")),
            Some(after) => Ok(Resume::After(after.to_string())),
            None => Ok(Resume::At(key)),
        }
    }

    fn fragment(self, sort_desc: bool) -> Fragment {
        let (cmp, key) = match (self, sort_desc) {
            (Resume::At(k), false) => ("ulid >= ?", k),
            (Resume::At(k), true) => ("ulid <= ?", k),
            (Resume::After(k), false) => ("ulid > ?", k),
            (Resume::After(k), true) => ("ulid < ?", k),
        };
        Fragment::new(cmp, vec![Value::Text(key)])
    }
}

/// Token that resumes strictly past `ulid`
fn tail_token(ulid: &str) -> String {
    encode_token(&format!("{}{}", AFTER_MARKER, ulid))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadChangesFilter {
    pub object_type: Option<String>,
    /// Overrides the configured horizon offset
    pub horizon_offset: Option<Duration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadChangesOptions {
    pub pagination: Pagination,
    pub sort_desc: bool,
}

pub struct ChangelogReader<'a> {
    pub dialect: &'a dyn SqlDialect,
    pub classifier: &'a dyn ErrorClassifier,
    pub default_horizon_offset: Duration,
}

impl ChangelogReader<'_> {
    /// # Errors
    ///
    /// `NotFound` when no entry matches; `InvalidContinuationToken` for a bad token.
    pub fn read(
        &self,
        conn: &Connection,
        store: &str,
        filter: &ReadChangesFilter,
        options: &ReadChangesOptions,
    ) -> Result<(Vec<TupleChange>, Option<String>)> {
        let resume = options
            .pagination
            .decoded_from()?
            .map(|key| Resume::parse(store, key))
            .transpose()?;
        let offset = filter.horizon_offset.unwrap_or(self.default_horizon_offset);
        let offset_micros = i64::try_from(offset.as_micros()).unwrap_or(i64::MAX);
        let horizon = datetime_to_micros(Utc::now()).saturating_sub(offset_micros);

        let mut conditions = Conditions::new()
            .and(Fragment::eq("store", store.to_string()))
            .and(Fragment::new("inserted_at <= ?", vec![Value::Integer(horizon)]));
        if let Some(object_type) = filter.object_type.as_ref().filter(|t| !t.is_empty()) {
            conditions = conditions.and(Fragment::eq("object_type", object_type.clone()));
        }
        if let Some(resume) = resume {
            conditions = conditions.and(resume.fragment(options.sort_desc));
        }

        let direction = if options.sort_desc { "DESC" } else { "ASC" };
        let limit = options
            .pagination
            .fetch_limit()
            .map(|n| self.dialect.limit(n))
            .unwrap_or_default();
        let sql = format!(
            "SELECT {} FROM changelog{} ORDER BY ulid {}{}",
            CHANGE_COLUMNS,
            conditions.where_clause(),
            direction,
            limit
        );

        let classify = |e| handle_sql_error(self.classifier, e, OP_READ_CHANGES);
        let mut stmt = conn.prepare(&sql).map_err(classify)?;
        let raw = stmt
            .query_map(params_from_iter(conditions.into_params()), RawChange::from_row)
            .map_err(classify)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(classify)?;

        if raw.is_empty() {
            return Err(ExError::new(ExErrorKind::NotFound)
                .with_op(OP_READ_CHANGES)
                .with_store_id(store)
                .with_message("no changes found"));
        }

        let changes = raw
            .into_iter()
            .map(|r| r.into_change(store))
            .collect::<Result<Vec<_>>>()?;
        let (page, token) = split_page(changes, options.pagination.page_size, |c| {
            c.ulid.clone()
        });
        let token = token.or_else(|| page.last().map(|c| tail_token(&c.ulid)));
        Ok((page, token))
    }
}
