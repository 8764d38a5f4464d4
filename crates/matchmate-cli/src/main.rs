//! MatchMate CLI - sales ledger vs PSU report reconciliation
//!
//! Usage:
//!   matchmate run --internal sales.csv --external ontario=on.csv \
//!       --from 2024-03-01 --to 2024-03-31
//!   matchmate regions          List configured regions
//!   matchmate catalog          Show the product catalog

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Run {
            internal,
            external,
            from,
            to,
            output,
            format,
        } => commands::cmd_run(
            &internal,
            &external,
            from,
            to,
            output.as_deref(),
            &format,
            cli.regions.as_deref(),
            cli.catalog.as_deref(),
        ),
        Commands::Regions => commands::cmd_regions(cli.regions.as_deref()),
        Commands::Catalog => commands::cmd_catalog(cli.catalog.as_deref()),
    }
}
