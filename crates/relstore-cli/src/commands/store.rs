//! Store management commands
//!
//! Usage: relstore store <create|get|list|delete> ...

use clap::{Args, Subcommand};
use relstore_core::Pagination;
use relstore_store::ListStoresOptions;
use serde_json::json;

use super::{open_datastore, print_json, CliResult};
use crate::GlobalArgs;

#[derive(Debug, Args)]
pub struct StoreArgs {
    #[command(subcommand)]
    pub command: StoreCommand,
}

#[derive(Debug, Subcommand)]
pub enum StoreCommand {
    /// Create a store
    Create(CreateArgs),
    /// Show one store
    Get { id: String },
    /// List active stores
    List(ListArgs),
    /// Soft-delete a store
    Delete { id: String },
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub name: String,

    /// Store id (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(long)]
    pub name: Option<String>,

    /// 0 lists everything
    #[arg(long, default_value_t = 50)]
    pub page_size: usize,

    /// Continuation token from a previous page
    #[arg(long)]
    pub token: Option<String>,
}

pub fn execute(global: &GlobalArgs, args: StoreArgs) -> CliResult {
    let datastore = open_datastore(global)?;
    match args.command {
        StoreCommand::Create(create) => {
            let id = create.id.unwrap_or_else(|| datastore.generate_id());
            let store = datastore.create_store(&id, &create.name)?;
            print_json(&serde_json::to_value(store)?)
        }
        StoreCommand::Get { id } => {
            let store = datastore.get_store(&id)?;
            print_json(&serde_json::to_value(store)?)
        }
        StoreCommand::List(list) => {
            let mut pagination = Pagination::new(list.page_size);
            if let Some(token) = list.token {
                pagination = pagination.from_token(token);
            }
            let (stores, token) = datastore.list_stores(ListStoresOptions {
                name: list.name,
                pagination,
                ..Default::default()
            })?;
            print_json(&json!({ "stores": stores, "continuation_token": token }))
        }
        StoreCommand::Delete { id } => {
            datastore.delete_store(&id)?;
            print_json(&json!({ "deleted": id }))
        }
    }
}
