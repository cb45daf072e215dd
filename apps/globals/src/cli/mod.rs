//! # Globals CLI Module
//!
//! This module implements the command-line interface over a configured store.
//!
//! Nodes are addressed with global references such as `^patient("123","name")`
//! (canonical numeric subscripts may be written unquoted: `^patient(123)`).
//!
//! ## Available Commands
//!
//! - `get` - Print the value at a reference
//! - `set` - Store a value at a reference
//! - `delete` - Remove the value at a reference, keeping its children
//! - `kill` - Remove a reference and everything below it
//! - `data` - Show whether a reference holds a value and/or children
//! - `children` - List the value-bearing descendants of a reference
//! - `subscripts` - List the immediate child subscripts of a reference
//! - `count` - Count the value-bearing descendants of a reference
//! - `zwrite` - Dump a subtree as ZWRITE text
//! - `load` - Load ZWRITE text from a file
//! - `export` - Write a subtree to a binary snapshot
//! - `import` - Restore a binary snapshot below a reference
//! - `status` - Show store status

mod commands;

use crate::config::{FileConfig, Settings};
use clap::{Parser, Subcommand};
use globals_core::{GlobalsError, Store};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Globals - hierarchical key/value storage from the command line
#[derive(Parser, Debug)]
#[command(name = "globals")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress confirmation messages of writing commands
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the database [default: globals.redb]
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend: "redb" (persistent) or "memory" (volatile) [default: redb]
    #[arg(short = 'B', long, global = true)]
    pub backend: Option<String>,

    /// Lock timeout in milliseconds for writing commands [default: 5000]
    #[arg(long, global = true)]
    pub lock_timeout_ms: Option<u64>,

    /// TOML file supplying defaults for the flags above
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the value at a reference
    Get {
        /// Global reference, e.g. ^patient("123","name")
        reference: String,
    },

    /// Store a value at a reference
    Set {
        /// Global reference
        reference: String,

        /// Value to store
        value: String,
    },

    /// Remove the value at a reference, keeping its children
    Delete {
        /// Global reference
        reference: String,
    },

    /// Remove a reference and its whole subtree
    Kill {
        /// Global reference
        reference: String,
    },

    /// Show the $DATA status of a reference
    Data {
        /// Global reference
        reference: String,
    },

    /// List value-bearing descendants in collation order
    Children {
        /// Global reference
        reference: String,
    },

    /// List immediate child subscripts in collation order
    Subscripts {
        /// Global reference
        reference: String,
    },

    /// Count value-bearing descendants
    Count {
        /// Global reference
        reference: String,
    },

    /// Dump a subtree as ZWRITE lines
    Zwrite {
        /// Global reference
        reference: String,
    },

    /// Load ZWRITE lines from a file
    Load {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Export a subtree to a binary snapshot
    Export {
        /// Global reference
        reference: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import a binary snapshot below a reference
    Import {
        /// Global reference to restore under
        reference: String,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show store status
    Status,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Merge flags with the optional config file.
pub fn resolve_settings(cli: &Cli) -> Result<Settings, GlobalsError> {
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    Ok(Settings::resolve(
        cli.database.clone(),
        cli.backend.clone(),
        cli.lock_timeout_ms,
        &file,
    ))
}

/// Run one command against an open store and return what it prints.
pub fn run(ctx: &Context<'_>, command: Commands) -> Result<String, GlobalsError> {
    match command {
        Commands::Get { reference } => cmd_get(ctx, &reference),
        Commands::Set { reference, value } => cmd_set(ctx, &reference, &value),
        Commands::Delete { reference } => cmd_delete(ctx, &reference),
        Commands::Kill { reference } => cmd_kill(ctx, &reference),
        Commands::Data { reference } => cmd_data(ctx, &reference),
        Commands::Children { reference } => cmd_children(ctx, &reference),
        Commands::Subscripts { reference } => cmd_subscripts(ctx, &reference),
        Commands::Count { reference } => cmd_count(ctx, &reference),
        Commands::Zwrite { reference } => cmd_zwrite(ctx, &reference),
        Commands::Load { input } => cmd_load(ctx, &input),
        Commands::Export { reference, output } => cmd_export(ctx, &reference, &output),
        Commands::Import { reference, input } => cmd_import(ctx, &reference, &input),
        Commands::Status => cmd_status(ctx),
    }
}

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), GlobalsError> {
    let settings = resolve_settings(&cli)?;
    tracing::debug!(
        database = %settings.database.display(),
        backend = %settings.backend,
        lock_timeout_ms = settings.lock_timeout.as_millis() as u64,
        "resolved settings"
    );

    let store = Store::open(&settings.backend, &settings.database)?;
    let ctx = Context {
        store: &store,
        settings: &settings,
        json_mode: cli.json_mode,
        quiet: cli.quiet,
    };

    let output = run(&ctx, cli.command.unwrap_or(Commands::Status))?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
