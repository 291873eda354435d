//! Changelog command
//!
//! Usage: relstore changes --store <ID> [--type <TYPE>] [--page-size N] [--token T] [--desc]

use std::time::Duration;

use clap::Args;
use relstore_core::errors::ExErrorKind;
use relstore_core::Pagination;
use relstore_store::{ReadChangesFilter, ReadChangesOptions};
use serde_json::json;

use super::{open_datastore, print_json, CliResult};
use crate::GlobalArgs;

#[derive(Debug, Args)]
pub struct ChangesArgs {
    #[arg(long)]
    pub store: String,

    /// Only changes to objects of this type
    #[arg(long = "type")]
    pub object_type: Option<String>,

    /// 0 reads everything
    #[arg(long, default_value_t = 50)]
    pub page_size: usize,

    #[arg(long)]
    pub token: Option<String>,

    /// Newest first
    #[arg(long)]
    pub desc: bool,

    /// Override the configured horizon offset
    #[arg(long)]
    pub horizon_ms: Option<u64>,
}

pub fn execute(global: &GlobalArgs, args: ChangesArgs) -> CliResult {
    let datastore = open_datastore(global)?;
    let mut pagination = Pagination::new(args.page_size);
    if let Some(token) = &args.token {
        pagination = pagination.from_token(token.clone());
    }
    let filter = ReadChangesFilter {
        object_type: args.object_type,
        horizon_offset: args.horizon_ms.map(Duration::from_millis),
    };
    let options = ReadChangesOptions {
        pagination,
        sort_desc: args.desc,
    };

    // nothing new is not an error for a listing; hand the cursor back for the next poll
    let (changes, token) = match datastore.read_changes(&args.store, filter, options) {
        Ok(page) => page,
        Err(e) if e.kind() == ExErrorKind::NotFound => (Vec::new(), args.token),
        Err(e) => return Err(e.into()),
    };
    print_json(&json!({ "changes": changes, "continuation_token": token }))
}
