//! Reconciliation engine
//!
//! Joins the summarized internal accounts against the full external record
//! set by account key and assigns each account a discriminated mismatch
//! reason via an ordered decision procedure (first matching rule wins):
//!
//! 1. No external record, or every matched record all-false: "Missing from
//!    report".
//! 2. External flags differ from internal flags: "PSU - no match".
//! 3. Every matched record is dated and every date falls outside the
//!    window: "Missing from report - wrong date".
//! 4. Otherwise matched; matched accounts are never surfaced.
//!
//! When an account has several external records, the latest-dated record's
//! flags represent it for rule 2 (most recent provisioning state wins);
//! records without dates fall back to OR-combination. Date filtering happens
//! inside this procedure, never before it: the engine must see the full,
//! unfiltered external set.
//!
//! Accounts that emit more than one outcome row are "addon" accounts; the
//! duplicate pass annotates every one of their rows rather than deduplicating.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::ProductCatalog;
use crate::models::{
    AccountKey, CategoryFlags, DateWindow, ExternalRecord, MismatchReason, ReconciliationOutcome,
    RunDiagnostics, SummarizedInternalRecord,
};
use crate::regions::RegionBook;
use crate::table::Table;

/// The result of one reconciliation run: the mismatch set plus run metrics
/// and structured diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub outcomes: Vec<ReconciliationOutcome>,
    /// Internal accounts evaluated (matched ones included).
    pub total_checked: usize,
    pub diagnostics: RunDiagnostics,
}

impl ReconciliationReport {
    /// Number of distinct mismatching accounts (outcome rows can repeat a
    /// key for addon accounts).
    pub fn mismatched_accounts(&self) -> usize {
        let mut keys: Vec<_> = self.outcomes.iter().map(|o| &o.key).collect();
        keys.dedup();
        keys.len()
    }
}

/// The core engine. Borrows fully materialized inputs; performs pure
/// synchronous transformation, no I/O.
pub struct Reconciler<'a> {
    internal: &'a [SummarizedInternalRecord],
    external: &'a [ExternalRecord],
    window: DateWindow,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        internal: &'a [SummarizedInternalRecord],
        external: &'a [ExternalRecord],
        window: DateWindow,
    ) -> Self {
        Self {
            internal,
            external,
            window,
        }
    }

    /// Run the decision procedure over every internal account.
    ///
    /// Deterministic: identical inputs and window produce an identical
    /// outcome sequence.
    pub fn run(&self) -> ReconciliationReport {
        let mut by_key: HashMap<&AccountKey, Vec<&ExternalRecord>> = HashMap::new();
        for record in self.external {
            by_key.entry(&record.key).or_default().push(record);
        }

        let mut outcomes = Vec::new();
        for summary in self.internal {
            let matched = by_key.get(&summary.key).map(Vec::as_slice).unwrap_or(&[]);
            if let Some(reason) = self.decide(summary, matched) {
                self.emit(&mut outcomes, summary, matched, reason);
            }
        }

        annotate_addons(&mut outcomes);

        info!(
            "Reconciliation complete: {} accounts checked, {} mismatch rows",
            self.internal.len(),
            outcomes.len()
        );

        ReconciliationReport {
            outcomes,
            total_checked: self.internal.len(),
            diagnostics: RunDiagnostics::default(),
        }
    }

    /// The ordered decision procedure. Returns `None` for a matched account.
    fn decide(
        &self,
        summary: &SummarizedInternalRecord,
        matched: &[&ExternalRecord],
    ) -> Option<MismatchReason> {
        // Rule 1: nothing on the report side carries this account
        if matched.is_empty() || matched.iter().all(|r| !r.flags.any()) {
            return Some(MismatchReason::MissingFromReport);
        }

        // Rule 2: provisioned categories disagree
        if representative_flags(matched) != summary.flags {
            return Some(MismatchReason::PsuNoMatch);
        }

        // Rule 3: flags agree but every dated record sits outside the window.
        // A single in-window date, or any dateless record, suppresses this.
        let all_dated = matched.iter().all(|r| r.observed_date.is_some());
        let none_in_window = !matched
            .iter()
            .filter_map(|r| r.observed_date)
            .any(|d| self.window.contains(d));
        if all_dated && none_in_window {
            return Some(MismatchReason::WrongDate);
        }

        None
    }

    /// Emit one outcome row per matched external record, or a single row
    /// with an absent external side when nothing matched. Multi-row keys are
    /// what the addon pass later annotates.
    fn emit(
        &self,
        outcomes: &mut Vec<ReconciliationOutcome>,
        summary: &SummarizedInternalRecord,
        matched: &[&ExternalRecord],
        reason: MismatchReason,
    ) {
        if matched.is_empty() {
            outcomes.push(ReconciliationOutcome {
                key: summary.key.clone(),
                reason,
                addon: false,
                internal: summary.flags,
                external: None,
                region: None,
                observed_date: None,
            });
            return;
        }

        for record in matched {
            outcomes.push(ReconciliationOutcome {
                key: summary.key.clone(),
                reason,
                addon: false,
                internal: summary.flags,
                external: Some(record.flags),
                region: Some(record.region.clone()),
                observed_date: record.observed_date,
            });
        }
    }
}

/// Run the whole pipeline over already-parsed tables: classify and
/// summarize the internal ledger, canonicalize every region source, then
/// reconcile. Stage diagnostics are folded into the report.
///
/// Fatal schema errors abort the run with no partial result.
pub fn reconcile_tables<'a, I>(
    internal: &Table,
    region_sources: I,
    catalog: &ProductCatalog,
    book: &RegionBook,
    window: DateWindow,
) -> crate::error::Result<ReconciliationReport>
where
    I: IntoIterator<Item = (&'a str, &'a Table)>,
{
    let (records, internal_diags) = crate::internal::collect_records(internal, catalog)?;
    let summarized = crate::internal::summarize(&records, window);
    let (external, external_diags) = book.canonicalize_all(region_sources)?;

    let mut report = Reconciler::new(&summarized, &external, window).run();
    report.diagnostics.absorb(internal_diags);
    report.diagnostics.absorb(external_diags);
    Ok(report)
}

/// The external flags that represent an account for the mismatch rule.
///
/// Latest-by-date when any record carries a date (the most recent
/// provisioning state, never an average or majority vote); OR-combined when
/// none do.
fn representative_flags(matched: &[&ExternalRecord]) -> CategoryFlags {
    let latest = matched
        .iter()
        .filter(|r| r.observed_date.is_some())
        .max_by_key(|r| r.observed_date);
    match latest {
        Some(record) => record.flags,
        None => matched
            .iter()
            .fold(CategoryFlags::default(), |acc, r| acc.or(r.flags)),
    }
}

/// Duplicate pass: every key that produced more than one outcome row gets
/// the addon marker on each of its rows. Annotation only; the base reason
/// is untouched.
fn annotate_addons(outcomes: &mut [ReconciliationOutcome]) {
    let mut counts: HashMap<AccountKey, usize> = HashMap::new();
    for outcome in outcomes.iter() {
        *counts.entry(outcome.key.clone()).or_insert(0) += 1;
    }
    for outcome in outcomes.iter_mut() {
        if counts[&outcome.key] > 1 {
            outcome.addon = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::new(date(2024, 2, 1), date(2024, 2, 28)).unwrap()
    }

    fn summary(key: &str, internet: bool, tv: bool, phone: bool) -> SummarizedInternalRecord {
        SummarizedInternalRecord {
            key: AccountKey(key.to_string()),
            flags: CategoryFlags::new(internet, tv, phone),
            sale_dates: BTreeSet::from([date(2024, 2, 10)]),
        }
    }

    fn external(
        key: &str,
        flags: (bool, bool, bool),
        observed: Option<NaiveDate>,
    ) -> ExternalRecord {
        ExternalRecord {
            key: AccountKey(key.to_string()),
            flags: CategoryFlags::new(flags.0, flags.1, flags.2),
            observed_date: observed,
            status: None,
            region: "ontario".to_string(),
        }
    }

    #[test]
    fn test_missing_from_report_when_absent() {
        let internal = vec![summary("5001234567", true, false, false)];
        let report = Reconciler::new(&internal, &[], window()).run();

        assert_eq!(report.total_checked, 1);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].reason, MismatchReason::MissingFromReport);
        assert!(report.outcomes[0].external.is_none());
    }

    #[test]
    fn test_missing_from_report_when_all_flags_false() {
        let internal = vec![summary("A1", true, false, false)];
        let ext = vec![external("A1", (false, false, false), Some(date(2024, 2, 10)))];
        let report = Reconciler::new(&internal, &ext, window()).run();

        assert_eq!(report.outcomes[0].reason, MismatchReason::MissingFromReport);
    }

    #[test]
    fn test_psu_no_match_on_flag_difference() {
        let internal = vec![summary("A1", true, false, false)];
        let ext = vec![external("A1", (false, true, false), Some(date(2024, 2, 10)))];
        let report = Reconciler::new(&internal, &ext, window()).run();

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].reason, MismatchReason::PsuNoMatch);
    }

    #[test]
    fn test_wrong_date_when_all_dates_outside_window() {
        let internal = vec![summary("A2", true, true, true)];
        let ext = vec![external("A2", (true, true, true), Some(date(2024, 1, 10)))];
        let report = Reconciler::new(&internal, &ext, window()).run();

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].reason, MismatchReason::WrongDate);
        assert_eq!(
            report.outcomes[0].reason_label(),
            "Missing from report - wrong date"
        );
    }

    #[test]
    fn test_in_window_date_suppresses_wrong_date() {
        let internal = vec![summary("A3", true, true, false)];
        let ext = vec![
            external("A3", (true, true, false), Some(date(2024, 1, 10))),
            external("A3", (true, true, false), Some(date(2024, 2, 15))),
        ];
        let report = Reconciler::new(&internal, &ext, window()).run();

        // Matched: excluded entirely, no addon row either
        assert!(report.outcomes.is_empty());
        assert_eq!(report.total_checked, 1);
    }

    #[test]
    fn test_dateless_record_suppresses_wrong_date() {
        let internal = vec![summary("A4", true, false, false)];
        let ext = vec![external("A4", (true, false, false), None)];
        let report = Reconciler::new(&internal, &ext, window()).run();

        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn test_latest_record_represents_account() {
        // Older record disagrees, newest agrees: latest provisioning state
        // wins and the account matches (in-window date present)
        let internal = vec![summary("A5", true, false, false)];
        let ext = vec![
            external("A5", (false, true, false), Some(date(2024, 2, 5))),
            external("A5", (true, false, false), Some(date(2024, 2, 20))),
        ];
        let report = Reconciler::new(&internal, &ext, window()).run();
        assert!(report.outcomes.is_empty());

        // And in reverse: newest disagrees, account mismatches
        let ext = vec![
            external("A5", (true, false, false), Some(date(2024, 2, 5))),
            external("A5", (false, true, false), Some(date(2024, 2, 20))),
        ];
        let report = Reconciler::new(&internal, &ext, window()).run();
        assert_eq!(report.outcomes[0].reason, MismatchReason::PsuNoMatch);
    }

    #[test]
    fn test_or_combination_when_no_dates() {
        // Two dateless partial records OR-combine into the internal flags
        let internal = vec![summary("A6", true, true, false)];
        let ext = vec![
            external("A6", (true, false, false), None),
            external("A6", (false, true, false), None),
        ];
        let report = Reconciler::new(&internal, &ext, window()).run();
        assert!(report.outcomes.is_empty());
    }

    #[test]
    fn test_addon_suffix_on_every_duplicate_row() {
        let internal = vec![summary("A7", true, false, false)];
        let ext = vec![
            external("A7", (false, true, false), Some(date(2024, 2, 10))),
            external("A7", (false, true, false), Some(date(2024, 2, 12))),
        ];
        let report = Reconciler::new(&internal, &ext, window()).run();

        assert_eq!(report.outcomes.len(), 2);
        for outcome in &report.outcomes {
            assert!(outcome.addon);
            assert_eq!(outcome.reason_label(), "PSU - no match (addon)");
        }
        assert_eq!(report.mismatched_accounts(), 1);
    }

    #[test]
    fn test_single_row_never_gets_addon() {
        let internal = vec![summary("A8", true, false, false)];
        let report = Reconciler::new(&internal, &[], window()).run();

        assert_eq!(report.outcomes.len(), 1);
        assert!(!report.outcomes[0].addon);
        assert_eq!(report.outcomes[0].reason_label(), "Missing from report");
    }

    #[test]
    fn test_exactly_one_base_reason_per_account() {
        // A record that is both flag-mismatched and out of window must only
        // ever produce the earlier rule's reason
        let internal = vec![summary("A9", true, false, false)];
        let ext = vec![external("A9", (false, true, false), Some(date(2024, 1, 1)))];
        let report = Reconciler::new(&internal, &ext, window()).run();

        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].reason, MismatchReason::PsuNoMatch);
    }

    #[test]
    fn test_run_is_deterministic() {
        let internal = vec![
            summary("A1", true, false, false),
            summary("A2", false, true, false),
        ];
        let ext = vec![
            external("A1", (false, true, false), Some(date(2024, 2, 10))),
            external("A2", (false, false, false), None),
        ];
        let first = Reconciler::new(&internal, &ext, window()).run();
        let second = Reconciler::new(&internal, &ext, window()).run();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
