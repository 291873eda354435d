use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a store
///
/// Stores are never hard-deleted; deleting one stamps the time of deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreLifecycle {
    Active,
    Deleted(DateTime<Utc>),
}

impl StoreLifecycle {
    /// Build the lifecycle from the persisted nullable `deleted_at` column
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            Some(at) => StoreLifecycle::Deleted(at),
            None => StoreLifecycle::Active,
        }
    }

    /// The persisted form: `None` while active
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            StoreLifecycle::Active => None,
            StoreLifecycle::Deleted(at) => Some(*at),
        }
    }
}

/// Which lifecycle states a store query should see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleFilter {
    /// Only stores that have not been deleted
    #[default]
    ActiveOnly,
    /// Active and deleted stores alike
    Any,
}

impl LifecycleFilter {
    pub fn admits(&self, lifecycle: &StoreLifecycle) -> bool {
        match self {
            LifecycleFilter::ActiveOnly => matches!(lifecycle, StoreLifecycle::Active),
            LifecycleFilter::Any => true,
        }
    }
}

/// A tenant namespace holding tuples, models and assertions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lifecycle: StoreLifecycle,
}

impl Store {
    /// Create a new active store with current timestamps
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            lifecycle: StoreLifecycle::Active,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.lifecycle, StoreLifecycle::Deleted(_))
    }
}
