//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// MatchMate - Reconcile internal sales against the provider PSU report
#[derive(Parser)]
#[command(name = "matchmate")]
#[command(about = "Compare an internal sales ledger against per-region PSU reports", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Region book override (defaults to the embedded configuration)
    #[arg(long, global = true)]
    pub regions: Option<PathBuf>,

    /// Product catalog override (defaults to the embedded configuration)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a reconciliation and report mismatched accounts
    Run {
        /// Internal sales ledger CSV
        #[arg(short, long)]
        internal: PathBuf,

        /// Per-region PSU report export as REGION=FILE (repeatable)
        #[arg(short, long = "external", value_name = "REGION=FILE", value_parser = parse_region_source, required = true)]
        external: Vec<(String, PathBuf)>,

        /// Window start date (inclusive), YYYY-MM-DD
        #[arg(long)]
        from: NaiveDate,

        /// Window end date (inclusive), YYYY-MM-DD
        #[arg(long)]
        to: NaiveDate,

        /// Write the mismatch export here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export format: csv, json
        #[arg(long, default_value = "csv")]
        format: String,
    },

    /// List the configured regions and their column mappings
    Regions,

    /// Show the product catalog used for classification
    Catalog,
}

/// Parse a `REGION=FILE` source argument.
fn parse_region_source(s: &str) -> Result<(String, PathBuf), String> {
    let (region, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected REGION=FILE, got '{}'", s))?;
    if region.trim().is_empty() {
        return Err(format!("empty region name in '{}'", s));
    }
    Ok((region.trim().to_string(), PathBuf::from(path)))
}
