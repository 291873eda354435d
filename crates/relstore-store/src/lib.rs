//! Relstore Store - SQLite persistence for the relationship-tuple store
//!
//! Provides:
//! - Schema migrations with checksum drift detection
//! - The transactional write protocol (ordered locking, conflict resolution,
//!   batched delete/insert/changelog, deadline-bounded rollback)
//! - Cursor-paginated tuple reads and the changelog
//! - Stores, authorization models and assertions
//!
//! [`Datastore`] is the entry point; the modules below it are usable on a
//! bare [`rusqlite::Connection`].

pub mod assertions;
pub mod classifier;
pub mod config;
pub mod datastore;
pub mod db;
pub mod dialect;
pub mod errors;
pub mod migrations;
pub mod models;
pub mod read;
pub mod rows;
pub mod sql;
pub mod stores;
pub mod write;

pub use config::StoreConfig;
pub use datastore::{Datastore, ReadinessStatus};
pub use errors::Result;
pub use read::{
    ObjectRelation, ReadChangesFilter, ReadChangesOptions, ReadPageOptions,
    ReadStartingWithUserFilter, ReadUsersetTuplesFilter, TupleIterator, UsersetRestriction,
};
pub use stores::ListStoresOptions;
