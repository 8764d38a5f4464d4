//! Domain models for MatchMate

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Normalized account identifier, the sole join key between the internal
/// ledger and the external report. Equality is exact string equality after
/// normalization (see [`crate::key::normalize`]).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountKey(pub String);

impl AccountKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Boolean triple describing subscribed product categories.
///
/// Internal flags are derived by the product classifier; external flags are
/// coerced from report cells ("non-empty trimmed string" means subscribed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryFlags {
    pub internet: bool,
    pub tv: bool,
    pub phone: bool,
}

impl CategoryFlags {
    pub fn new(internet: bool, tv: bool, phone: bool) -> Self {
        Self {
            internet,
            tv,
            phone,
        }
    }

    /// Logical OR per category, used when aggregating multiple rows for the
    /// same account.
    pub fn or(self, other: Self) -> Self {
        Self {
            internet: self.internet || other.internet,
            tv: self.tv || other.tv,
            phone: self.phone || other.phone,
        }
    }

    /// True if any category is set.
    pub fn any(self) -> bool {
        self.internet || self.tv || self.phone
    }
}

/// One row of the internal sales ledger, after classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalRecord {
    pub key: AccountKey,
    /// Free-text product label as it appeared in the ledger.
    pub product: String,
    /// Sale date; `None` when the source cell was malformed.
    pub sale_date: Option<NaiveDate>,
    /// Category flags classified from the product label.
    pub flags: CategoryFlags,
}

/// One row of the external PSU report, canonicalized from a region-specific
/// schema. Multiple records may share an account key (repeated provisioning
/// attempts or status transitions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalRecord {
    pub key: AccountKey,
    pub flags: CategoryFlags,
    /// Submission/open date; `None` when absent or malformed.
    pub observed_date: Option<NaiveDate>,
    pub status: Option<String>,
    /// Name of the region whose schema this record arrived under.
    pub region: String,
}

/// One summarized internal account: flags OR-reduced across all of the
/// account's ledger rows inside the reconciliation window, sale dates kept
/// as a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizedInternalRecord {
    pub key: AccountKey,
    pub flags: CategoryFlags,
    pub sale_dates: BTreeSet<NaiveDate>,
}

/// Discriminated mismatch reason assigned by the reconciliation engine.
///
/// The rendered strings are load-bearing output consumed downstream; do not
/// reword them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchReason {
    /// No external record exists for the account, or every matched record
    /// carries all-false category flags.
    MissingFromReport,
    /// The external category flags differ from the internal flags.
    PsuNoMatch,
    /// External records exist with matching flags, but every observed date
    /// falls outside the reconciliation window.
    WrongDate,
}

impl MismatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingFromReport => "Missing from report",
            Self::PsuNoMatch => "PSU - no match",
            Self::WrongDate => "Missing from report - wrong date",
        }
    }
}

impl std::fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One reported discrepancy. Matched accounts are never surfaced; only
/// mismatching outcomes appear in a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub key: AccountKey,
    pub reason: MismatchReason,
    /// Set when the account produced more than one outcome row ("addon"
    /// account). Annotation only; composes with any base reason.
    pub addon: bool,
    pub internal: CategoryFlags,
    /// Flags of the matched external row, absent when no record matched.
    pub external: Option<CategoryFlags>,
    pub region: Option<String>,
    pub observed_date: Option<NaiveDate>,
}

impl ReconciliationOutcome {
    /// Rendered reason string, with the `" (addon)"` suffix applied for
    /// duplicate accounts.
    pub fn reason_label(&self) -> String {
        if self.addon {
            format!("{} (addon)", self.reason)
        } else {
            self.reason.to_string()
        }
    }
}

/// Inclusive calendar-date reconciliation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Calendar-date containment; time-of-day never participates.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A single recoverable anomaly observed during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    /// Pipeline stage that observed the anomaly (e.g. "internal", "regionA").
    pub stage: String,
    pub message: String,
}

/// Structured per-run diagnostics returned alongside the outcome set.
/// Replaces ambient debug state: callers decide what to log or render.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Internal rows dropped for an unnormalizable account key.
    pub internal_rows_dropped: usize,
    /// External rows dropped for an unnormalizable account key.
    pub external_rows_dropped: usize,
    /// External rows dropped because the key shape matched no region, or
    /// matched a region other than the source it arrived in.
    pub unresolved_region_rows: usize,
    /// Date cells that failed to parse and were coerced to absent.
    pub malformed_dates: usize,
    /// External cells containing the literal string "0" that coerced to true
    /// under the non-empty-string rule. Surfaced so the known surprising edge
    /// case is visible per run rather than silently applied.
    pub zero_coerced_true: usize,
    pub events: Vec<DiagnosticEvent>,
}

impl RunDiagnostics {
    pub fn note(&mut self, stage: &str, message: impl Into<String>) {
        self.events.push(DiagnosticEvent {
            stage: stage.to_string(),
            message: message.into(),
        });
    }

    /// Fold another stage's diagnostics into this run's totals.
    pub fn absorb(&mut self, other: RunDiagnostics) {
        self.internal_rows_dropped += other.internal_rows_dropped;
        self.external_rows_dropped += other.external_rows_dropped;
        self.unresolved_region_rows += other.unresolved_region_rows;
        self.malformed_dates += other.malformed_dates;
        self.zero_coerced_true += other.zero_coerced_true;
        self.events.extend(other.events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_or() {
        let a = CategoryFlags::new(true, false, false);
        let b = CategoryFlags::new(false, true, false);
        assert_eq!(a.or(b), CategoryFlags::new(true, true, false));
        assert!(!CategoryFlags::default().any());
        assert!(a.any());
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(
            MismatchReason::MissingFromReport.as_str(),
            "Missing from report"
        );
        assert_eq!(MismatchReason::PsuNoMatch.as_str(), "PSU - no match");
        assert_eq!(
            MismatchReason::WrongDate.as_str(),
            "Missing from report - wrong date"
        );
    }

    #[test]
    fn test_addon_suffix_rendering() {
        let outcome = ReconciliationOutcome {
            key: AccountKey("5001234567".into()),
            reason: MismatchReason::PsuNoMatch,
            addon: true,
            internal: CategoryFlags::new(true, false, false),
            external: Some(CategoryFlags::new(false, true, false)),
            region: Some("quebec".into()),
            observed_date: None,
        };
        assert_eq!(outcome.reason_label(), "PSU - no match (addon)");
    }

    #[test]
    fn test_window_inclusive() {
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
        )
        .unwrap();
        assert!(window.contains(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
        assert!(window.contains(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()));
        assert!(!window.contains(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()));
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        let result = DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        );
        assert!(result.is_err());
    }
}
