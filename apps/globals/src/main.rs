//! # Globals
//!
//! Command-line access to hierarchical globals.
//!
//! ## Usage
//!
//! ```bash
//! globals set '^patient("123","name")' "Jane Doe"
//! globals get '^patient("123","name")'
//! globals children '^patient("123")'
//! globals zwrite '^patient' > patients.zwr
//! globals --backend redb --database hospital.redb status
//! ```

use clap::Parser;
use globals::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // GLOBALS_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("GLOBALS_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "globals=debug"
    } else {
        "globals=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    // Logs go to stderr; stdout carries command output.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
