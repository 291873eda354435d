//! Tuple commands
//!
//! Usage:
//!   relstore tuple write  --store <ID> <object#relation@user>... [--condition NAME [--context JSON]]
//!   relstore tuple delete --store <ID> <object#relation@user>... [--ignore-missing]
//!   relstore tuple read   --store <ID> [--object O] [--relation R] [--user U]

use std::time::{Duration, Instant};

use clap::{Args, Subcommand};
use relstore_core::{Pagination, RelationshipCondition, TupleKey, WriteOptions};
use relstore_store::ReadPageOptions;
use serde_json::json;

use super::{open_datastore, print_json, CliResult};
use crate::GlobalArgs;

#[derive(Debug, Args)]
pub struct TupleArgs {
    #[command(subcommand)]
    pub command: TupleCommand,
}

#[derive(Debug, Subcommand)]
pub enum TupleCommand {
    /// Write tuples in one atomic call
    Write(WriteArgs),
    /// Delete tuples in one atomic call
    Delete(DeleteArgs),
    /// Read one page of tuples
    Read(ReadArgs),
}

#[derive(Debug, Args)]
pub struct WriteArgs {
    #[arg(long)]
    pub store: String,

    #[arg(required = true, value_parser = parse_tuple_key)]
    pub tuples: Vec<TupleKey>,

    /// Condition attached to every written tuple
    #[arg(long)]
    pub condition: Option<String>,

    /// JSON object used as the condition context
    #[arg(long, requires = "condition")]
    pub context: Option<String>,

    /// Skip tuples that already exist with the same condition
    #[arg(long)]
    pub ignore_duplicates: bool,

    /// Give up and roll back after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[arg(long)]
    pub store: String,

    #[arg(required = true, value_parser = parse_tuple_key)]
    pub tuples: Vec<TupleKey>,

    /// Skip tuples that do not exist
    #[arg(long)]
    pub ignore_missing: bool,

    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    #[arg(long)]
    pub store: String,

    /// `type:id`, or `type:` for every object of a type
    #[arg(long, default_value = "")]
    pub object: String,

    #[arg(long, default_value = "")]
    pub relation: String,

    #[arg(long, default_value = "")]
    pub user: String,

    /// 0 reads everything
    #[arg(long, default_value_t = 50)]
    pub page_size: usize,

    #[arg(long)]
    pub token: Option<String>,
}

/// Parse `object#relation@user`
///
/// The user keeps any `#relation` of its own: `doc:1#viewer@group:eng#member`.
pub fn parse_tuple_key(s: &str) -> Result<TupleKey, String> {
    let malformed = || format!("expected object#relation@user, got '{}'", s);
    let (object, rest) = s.split_once('#').ok_or_else(malformed)?;
    let (relation, user) = rest.split_once('@').ok_or_else(malformed)?;
    if object.is_empty() || relation.is_empty() || user.is_empty() {
        return Err(malformed());
    }
    Ok(TupleKey::new(object, relation, user))
}

fn deadline(timeout_ms: Option<u64>) -> Option<Instant> {
    timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms))
}

pub fn execute(global: &GlobalArgs, args: TupleArgs) -> CliResult {
    let datastore = open_datastore(global)?;
    match args.command {
        TupleCommand::Write(write) => {
            let condition = match write.condition {
                Some(name) => {
                    let mut condition = RelationshipCondition::new(name);
                    if let Some(context) = write.context {
                        condition = condition.with_context(serde_json::from_str(&context)?);
                    }
                    Some(condition)
                }
                None => None,
            };
            let writes: Vec<TupleKey> = write
                .tuples
                .into_iter()
                .map(|key| match &condition {
                    Some(c) => key.with_condition(c.clone()),
                    None => key,
                })
                .collect();

            let mut options = WriteOptions {
                deadline: deadline(write.timeout_ms),
                ..Default::default()
            };
            if write.ignore_duplicates {
                options = options.ignore_duplicate_inserts();
            }
            datastore.write(&write.store, &[], &writes, options)?;
            print_json(&json!({ "written": writes.len() }))
        }
        TupleCommand::Delete(delete) => {
            let mut options = WriteOptions {
                deadline: deadline(delete.timeout_ms),
                ..Default::default()
            };
            if delete.ignore_missing {
                options = options.ignore_missing_deletes();
            }
            datastore.write(&delete.store, &delete.tuples, &[], options)?;
            print_json(&json!({ "deleted": delete.tuples.len() }))
        }
        TupleCommand::Read(read) => {
            let mut pagination = Pagination::new(read.page_size);
            if let Some(token) = read.token {
                pagination = pagination.from_token(token);
            }
            let key = TupleKey::new(read.object, read.relation, read.user);
            let (tuples, token) =
                datastore.read_page(&read.store, &key, ReadPageOptions { pagination })?;
            print_json(&json!({ "tuples": tuples, "continuation_token": token }))
        }
    }
}
