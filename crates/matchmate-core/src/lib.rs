//! MatchMate Core Library
//!
//! Shared functionality for the MatchMate sales reconciliation tool:
//! - Canonical record model shared by both data sides
//! - Account key normalization (float-artifact stripping)
//! - Exact-match product classifier driven by a TOML catalog
//! - Region schema resolver for per-region report layouts
//! - Temporal aggregation of the internal ledger
//! - The reconciliation engine and its mismatch-reason decision procedure
//! - CSV/JSON export of the mismatch set

pub mod catalog;
pub mod error;
pub mod export;
pub mod internal;
pub mod key;
pub mod models;
pub mod reconcile;
pub mod regions;
pub mod table;

pub use catalog::ProductCatalog;
pub use error::{Error, Result};
pub use export::{outcome_rows, render_outcomes, ExportFormat, OutcomeRow};
pub use models::{
    AccountKey, CategoryFlags, DateWindow, DiagnosticEvent, ExternalRecord, InternalRecord,
    MismatchReason, ReconciliationOutcome, RunDiagnostics, SummarizedInternalRecord,
};
pub use reconcile::{reconcile_tables, ReconciliationReport, Reconciler};
pub use regions::{ColumnMap, RegionBook, RegionConfig};
pub use table::Table;
