//! Relstore CLI
//!
//! Command-line harness over the relationship-tuple datastore

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use relstore_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "relstore")]
#[command(about = "Relstore - relationship-tuple store for ReBAC", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// SQLite database file (overrides `database_path` from --config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// TOML file with datastore settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit logs to stderr in this format
    #[arg(long, global = true, value_enum)]
    pub log: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the database and apply migrations
    Init,
    /// Store management
    Store(commands::store::StoreArgs),
    /// Write, delete and read tuples
    Tuple(commands::tuple::TupleArgs),
    /// Read the changelog of a store
    Changes(commands::changes::ChangesArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.global.log {
        Some(LogFormat::Pretty) => init(Profile::Development),
        Some(LogFormat::Json) => init(Profile::Production),
        None => {}
    }

    let result = match cli.command {
        Commands::Init => commands::init::execute(&cli.global),
        Commands::Store(args) => commands::store::execute(&cli.global, args),
        Commands::Tuple(args) => commands::tuple::execute(&cli.global, args),
        Commands::Changes(args) => commands::changes::execute(&cli.global, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
