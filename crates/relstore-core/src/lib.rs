//! relstore core - domain kernel of the relationship-tuple store
//!
//! This crate holds everything about the write protocol and pagination that
//! does not touch a database:
//! - Tuple, changelog, store, authorization-model and assertion types
//! - Tuple-string helpers and write-request validation
//! - Lock-key ordering (deadlock avoidance for overlapping writers)
//! - Conflict resolution of deletes/writes against a locked snapshot
//! - Monotonic id generation
//! - Continuation tokens and overfetch paging
//! - The error and logging facilities shared with the store crate

pub mod errors;
pub mod ids;
pub mod lock_keys;
pub mod logging_facility;
pub mod model;
pub mod pagination;
pub mod resolver;
pub mod tuple_utils;

// Used by the logging macros so that callers need no direct dependency.
#[doc(hidden)]
pub use relstore_core_types;
#[doc(hidden)]
pub use tracing;

pub use errors::{ExError, ExErrorKind, Result, TupleError};
pub use ids::{IdGenerator, UlidLikeGenerator};
pub use lock_keys::{make_tuple_lock_keys, TupleLockKey};
pub use model::{
    Assertion, AuthorizationModel, RelationshipCondition, Store, StoreLifecycle, Tuple,
    TupleChange, TupleKey, TupleOperation, TypeDefinition, UserType,
};
pub use pagination::Pagination;
pub use resolver::{resolve, OnDuplicateInsert, OnMissingDelete, ResolvedWrite, WriteOptions};
