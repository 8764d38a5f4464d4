//! Error types for MatchMate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Row-level: an account identifier that is empty after trimming.
    /// Callers drop the row and count it; never fatal to a run.
    #[error("Invalid account key: empty after normalization")]
    InvalidKey,

    /// Row-level: an account identifier that matches no configured region's
    /// prefix/length shape. The row is excluded with a diagnostic count.
    #[error("Account key '{key}' matches no configured region (checked prefix and exact length)")]
    UnresolvedRegion { key: String },

    /// Fatal: the pipeline cannot proceed without this column. The message
    /// states what was expected and what was actually present so the caller
    /// can correct the input.
    #[error("Missing required column '{column}' (accepted names: {}; found columns: {})",
            expected.join(", "), found.join(", "))]
    MissingRequiredColumn {
        column: &'static str,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Fatal: the collaborator that supplies a dataset failed. Surfaced
    /// verbatim to the caller.
    #[error("Ingestion failure: {0}")]
    Ingestion(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Invalid region config: {0}")]
    InvalidRegionConfig(String),

    #[error("Invalid product catalog: {0}")]
    InvalidCatalog(String),
}

pub type Result<T> = std::result::Result<T, Error>;
