//! Database initialization
//!
//! Usage: relstore init [--db <PATH>]

use serde_json::json;

use super::{open_datastore, print_json, CliResult};
use crate::GlobalArgs;

pub fn execute(global: &GlobalArgs) -> CliResult {
    let datastore = open_datastore(global)?;
    let status = datastore.is_ready()?;
    print_json(&json!({
        "database_path": datastore.config().database_path,
        "ready": status.ready,
        "revision": status.revision,
    }))
}
