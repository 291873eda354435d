//! Cursor pager
//!
//! Builds filtered tuple scans and pages them by overfetching one row. The
//! token of a page is the ordering key of that extra row and the next page
//! resumes at it inclusively.

use relstore_core::pagination::split_page;
use relstore_core::tuple_utils::split_object;
use relstore_core::{Pagination, Tuple, UserType};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use crate::classifier::ErrorClassifier;
use crate::dialect::SqlDialect;
use crate::errors::Result;
use crate::rows::{RawTuple, TUPLE_COLUMNS};
use crate::sql::{Conditions, Fragment};

/// A relation reference allowed to appear as the user of a userset tuple
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsersetRestriction {
    /// `type#relation`, matching users `type:<any id>#relation`
    Relation { type_name: String, relation: String },
    /// `type:*`
    Wildcard { type_name: String },
}

impl UsersetRestriction {
    pub fn relation(type_name: impl Into<String>, relation: impl Into<String>) -> Self {
        UsersetRestriction::Relation {
            type_name: type_name.into(),
            relation: relation.into(),
        }
    }

    pub fn wildcard(type_name: impl Into<String>) -> Self {
        UsersetRestriction::Wildcard {
            type_name: type_name.into(),
        }
    }

    fn fragment(&self) -> Fragment {
        match self {
            UsersetRestriction::Relation {
                type_name,
                relation,
            } => Fragment::new(
                "_user LIKE ?",
                vec![Value::Text(format!("{}:%#{}", type_name, relation))],
            ),
            UsersetRestriction::Wildcard { type_name } => {
                Fragment::eq("_user", format!("{}:*", type_name))
            }
        }
    }
}

/// How the user column is constrained
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UserPredicate {
    #[default]
    Any,
    Exact(String),
    /// Userset-scoped read, optionally narrowed to allowed relation references
    ///
    /// Typed wildcards (`type:*`) are stored as plain users but are admitted
    /// here so that wildcard restrictions can match them.
    Usersets(Vec<UsersetRestriction>),
    /// Any of these fully-qualified users
    AnyOf(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanOrder {
    /// Ascending by monotonic id; supports cursors
    #[default]
    Ulid,
    /// Ascending by object id, ties by id
    ObjectId,
}

/// Conjunctive tuple filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TupleFilter {
    /// `type:id`, `type:` or `type`; empty for no object constraint
    pub object: String,
    pub relation: Option<String>,
    pub user: UserPredicate,
    pub object_ids: Option<Vec<String>>,
}

impl TupleFilter {
    fn conditions(&self, store: &str) -> Conditions {
        let (object_type, object_id) = if self.object.contains(':') {
            split_object(&self.object)
        } else {
            (self.object.as_str(), "")
        };

        let mut conditions = Conditions::new()
            .and(Fragment::eq("store", store.to_string()))
            .and_if(!object_type.is_empty(), || {
                Fragment::eq("object_type", object_type.to_string())
            })
            .and_if(!object_id.is_empty(), || {
                Fragment::eq("object_id", object_id.to_string())
            });

        if let Some(relation) = self.relation.as_ref().filter(|r| !r.is_empty()) {
            conditions = conditions.and(Fragment::eq("relation", relation.clone()));
        }

        conditions = match &self.user {
            UserPredicate::Any => conditions,
            UserPredicate::Exact(user) => conditions.and(Fragment::eq("_user", user.clone())),
            UserPredicate::Usersets(restrictions) => {
                let scoped = conditions.and(Fragment::eq(
                    "user_type",
                    UserType::UserSet.as_str().to_string(),
                ));
                if restrictions.is_empty() {
                    scoped
                } else {
                    scoped.and(Fragment::any_of(
                        restrictions.iter().map(UsersetRestriction::fragment).collect(),
                    ))
                }
            }
            UserPredicate::AnyOf(users) => conditions.and(Fragment::in_list("_user", users)),
        };

        if let Some(ids) = &self.object_ids {
            conditions = conditions.and(Fragment::in_list("object_id", ids));
        }
        conditions
    }
}

pub struct Pager<'a> {
    pub dialect: &'a dyn SqlDialect,
    pub classifier: &'a dyn ErrorClassifier,
}

impl Pager<'_> {
    /// One page of `filter` in `order`
    ///
    /// Only [`ScanOrder::Ulid`] scans are paged; object-id ordered scans
    /// always return every match in one page.
    pub fn page(
        &self,
        conn: &Connection,
        store: &str,
        filter: &TupleFilter,
        order: ScanOrder,
        pagination: &Pagination,
        op: &str,
    ) -> Result<(Vec<Tuple>, Option<String>)> {
        let resume_from = pagination.decoded_from()?;

        let mut conditions = filter.conditions(store);
        if let (Some(from), ScanOrder::Ulid) = (resume_from, order) {
            conditions = conditions.and(Fragment::new("ulid >= ?", vec![Value::Text(from)]));
        }

        let order_by = match order {
            ScanOrder::Ulid => " ORDER BY ulid ASC",
            ScanOrder::ObjectId => " ORDER BY object_id ASC, ulid ASC",
        };
        let (fetch_limit, page_size) = match order {
            ScanOrder::Ulid => (pagination.fetch_limit(), pagination.page_size),
            ScanOrder::ObjectId => (None, 0),
        };
        let limit = fetch_limit
            .map(|n| self.dialect.limit(n))
            .unwrap_or_default();
        let sql = format!(
            "SELECT {} FROM tuple{}{}{}",
            TUPLE_COLUMNS,
            conditions.where_clause(),
            order_by,
            limit
        );

        let classify = |e| crate::errors::handle_sql_error(self.classifier, e, op);
        let mut stmt = conn.prepare(&sql).map_err(classify)?;
        let raw = stmt
            .query_map(params_from_iter(conditions.into_params()), RawTuple::from_row)
            .map_err(classify)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(classify)?;
        let rows = raw
            .into_iter()
            .map(|r| r.into_tuple(store))
            .collect::<Result<Vec<_>>>()?;

        Ok(split_page(rows, page_size, |t| t.ulid.clone()))
    }
}
