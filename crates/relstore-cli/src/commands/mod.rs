pub mod changes;
pub mod init;
pub mod store;
pub mod tuple;

use relstore_store::{Datastore, StoreConfig};

use crate::GlobalArgs;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

const DEFAULT_DB_PATH: &str = ".relstore/store.db";

/// Open the datastore described by the global flags
pub fn open_datastore(global: &GlobalArgs) -> Result<Datastore, Box<dyn std::error::Error>> {
    let mut config = match &global.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::for_path(DEFAULT_DB_PATH),
    };
    if let Some(db) = &global.db {
        config.database_path = db.clone();
    }
    if let Some(parent) = config
        .database_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Datastore::open(config)?)
}

/// Pretty-print a JSON value on stdout
pub fn print_json(value: &serde_json::Value) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
