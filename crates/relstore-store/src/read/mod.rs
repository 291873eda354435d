//! Read path: filtered tuple scans and the changelog
//!
//! Reads take no locks. Each page is read from the last committed state.

pub mod changes;
pub mod pager;

use std::collections::VecDeque;

use relstore_core::{Pagination, Tuple};

use crate::errors::Result;

pub use changes::{ChangelogReader, ReadChangesFilter, ReadChangesOptions};
pub use pager::{Pager, ScanOrder, TupleFilter, UserPredicate, UsersetRestriction};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadPageOptions {
    pub pagination: Pagination,
}

/// Userset tuples on an object and relation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadUsersetTuplesFilter {
    pub object: String,
    pub relation: String,
    pub allowed_user_type_restrictions: Vec<UsersetRestriction>,
}

/// `object` with an optional relation, e.g. `group:eng` + `member`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRelation {
    pub object: String,
    pub relation: Option<String>,
}

impl ObjectRelation {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            relation: None,
        }
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// `object` or `object#relation`
    pub fn as_user(&self) -> String {
        match self.relation.as_deref().filter(|r| !r.is_empty()) {
            Some(relation) => format!("{}#{}", self.object, relation),
            None => self.object.clone(),
        }
    }
}

/// Tuples of one object type and relation whose user is one of `user_filter`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadStartingWithUserFilter {
    pub object_type: String,
    pub relation: String,
    pub user_filter: Vec<ObjectRelation>,
    pub object_ids: Option<Vec<String>>,
}

type PageFetch = Box<dyn FnMut(&Pagination) -> Result<(Vec<Tuple>, Option<String>)> + Send + Sync>;

/// Lazily paged tuple scan
///
/// Pages are fetched as the iterator is drained. A failed fetch yields one
/// `Err` and ends the iteration.
pub struct TupleIterator {
    fetch: PageFetch,
    buffer: VecDeque<Tuple>,
    next: Option<Pagination>,
}

impl TupleIterator {
    pub(crate) fn new(page_size: usize, fetch: PageFetch) -> Self {
        Self {
            fetch,
            buffer: VecDeque::new(),
            next: Some(Pagination::new(page_size)),
        }
    }

    /// Release the scan; later calls to `next` return `None`
    pub fn stop(&mut self) {
        self.buffer.clear();
        self.next = None;
    }
}

impl Iterator for TupleIterator {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(tuple) = self.buffer.pop_front() {
                return Some(Ok(tuple));
            }
            let pagination = self.next.take()?;
            match (self.fetch)(&pagination) {
                Ok((rows, token)) => {
                    self.buffer.extend(rows);
                    self.next = token.map(|t| Pagination::new(pagination.page_size).from_token(t));
                }
                Err(err) => {
                    self.stop();
                    return Some(Err(err));
                }
            }
        }
    }
}

impl std::fmt::Debug for TupleIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TupleIterator")
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.next.is_none())
            .finish()
    }
}
