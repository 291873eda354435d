// Shared fixtures for datastore integration tests

#![allow(dead_code)]

use relstore_core::TupleKey;
use relstore_store::{Datastore, StoreConfig};
use tempfile::TempDir;

/// A datastore on a fresh file database
///
/// File-backed so that several connections (and threads) see one database.
/// Keep the `TempDir` alive for the duration of the test.
pub fn setup() -> (TempDir, Datastore) {
    setup_with(|config| config)
}

pub fn setup_with(adjust: impl FnOnce(StoreConfig) -> StoreConfig) -> (TempDir, Datastore) {
    let dir = TempDir::new().unwrap();
    let config = adjust(StoreConfig::for_path(dir.path().join("relstore.db")));
    let datastore = Datastore::open(config).unwrap();
    (dir, datastore)
}

/// Create a store with a generated id and return the id
pub fn new_store(datastore: &Datastore) -> String {
    let id = datastore.generate_id();
    datastore.create_store(&id, "test-store").unwrap();
    id
}

pub fn tk(object: &str, relation: &str, user: &str) -> TupleKey {
    TupleKey::new(object, relation, user)
}

/// Every tuple in the store, as `object#relation@user`, in read order
pub fn all_keys(datastore: &Datastore, store: &str) -> Vec<String> {
    datastore
        .read(store, &tk("", "", ""))
        .unwrap()
        .map(|t| t.unwrap().key.to_string())
        .collect()
}
