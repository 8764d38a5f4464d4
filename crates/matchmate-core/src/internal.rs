//! Internal ledger ingestion and temporal aggregation
//!
//! Turns the uploaded sales table into classified [`InternalRecord`]s, then
//! summarizes them per account for the reconciliation window: flags are
//! OR-reduced across an account's rows, sale dates are kept as a set.

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::ProductCatalog;
use crate::error::Result;
use crate::key;
use crate::models::{DateWindow, InternalRecord, RunDiagnostics, SummarizedInternalRecord};
use crate::table::{parse_date_lenient, Table};

/// Accepted header names for the internal ledger's required columns.
/// Exports from different ledger versions disagree on naming.
const ACCOUNT_ALIASES: &[&str] = &["Account Number", "Account #", "Account"];
const PRODUCT_ALIASES: &[&str] = &["Product Name", "Product"];
const DATE_ALIASES: &[&str] = &["Date of Sale", "Sale Date"];

/// Read the internal sales table into classified records.
///
/// All three columns are required; a missing one is fatal and the error
/// lists the accepted names against the headers actually present. Rows with
/// an unnormalizable account number are dropped and counted; malformed sale
/// dates coerce to absent.
pub fn collect_records(
    table: &Table,
    catalog: &ProductCatalog,
) -> Result<(Vec<InternalRecord>, RunDiagnostics)> {
    let account_idx = table.require_column("account", ACCOUNT_ALIASES)?;
    let product_idx = table.require_column("product", PRODUCT_ALIASES)?;
    let date_idx = table.require_column("sale date", DATE_ALIASES)?;

    let mut diags = RunDiagnostics::default();
    let mut records = Vec::new();

    for row in table.rows() {
        let key = match key::normalize(table.cell(row, account_idx)) {
            Ok(k) => k,
            Err(_) => {
                diags.internal_rows_dropped += 1;
                diags.note("internal", "row dropped: empty account number");
                continue;
            }
        };

        let product = table.cell(row, product_idx).trim().to_string();
        let flags = catalog.classify(&product);

        let date_cell = table.cell(row, date_idx).trim();
        let sale_date = parse_date_lenient(date_cell);
        if sale_date.is_none() && !date_cell.is_empty() {
            diags.malformed_dates += 1;
            diags.note(
                "internal",
                format!("account {}: unparseable sale date '{}'", key, date_cell),
            );
        }

        records.push(InternalRecord {
            key,
            product,
            sale_date,
            flags,
        });
    }

    debug!(
        "Collected {} internal records ({} dropped)",
        records.len(),
        diags.internal_rows_dropped
    );
    Ok((records, diags))
}

/// Summarize internal records for the window: discard records whose sale
/// date falls outside (or is absent), group by account, OR-reduce flags.
///
/// Accounts whose every record is filtered out produce no row at all; they
/// are absent from the internal side, not present with all-false flags.
pub fn summarize(records: &[InternalRecord], window: DateWindow) -> Vec<SummarizedInternalRecord> {
    let mut groups: BTreeMap<_, SummarizedInternalRecord> = BTreeMap::new();

    for record in records {
        let date = match record.sale_date {
            Some(d) if window.contains(d) => d,
            _ => continue,
        };

        groups
            .entry(record.key.clone())
            .and_modify(|summary| {
                summary.flags = summary.flags.or(record.flags);
                summary.sale_dates.insert(date);
            })
            .or_insert_with(|| SummarizedInternalRecord {
                key: record.key.clone(),
                flags: record.flags,
                sale_dates: [date].into_iter().collect(),
            });
    }

    let summarized: Vec<_> = groups.into_values().collect();
    debug!(
        "Summarized {} internal accounts from {} records",
        summarized.len(),
        records.len()
    );
    summarized
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::new(date(2024, 3, 1), date(2024, 3, 31)).unwrap()
    }

    fn catalog() -> ProductCatalog {
        ProductCatalog::embedded().unwrap()
    }

    fn ledger(csv: &str) -> Table {
        Table::from_csv_reader(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_collect_classifies_and_normalizes() {
        let table = ledger(
            "Account Number,Product Name,Date of Sale\n\
             5001234567.0,1 Gig,2024-03-01\n\
             5001234567,Stream Box,2024-03-02\n",
        );
        let (records, diags) = collect_records(&table, &catalog()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key.as_str(), "5001234567");
        assert!(records[0].flags.internet);
        assert!(records[1].flags.tv);
        assert_eq!(diags.internal_rows_dropped, 0);
    }

    #[test]
    fn test_collect_accepts_header_aliases() {
        let table = ledger("Account #,Product,Sale Date\nA1,1 Gig,2024-03-01\n");
        let (records, _) = collect_records(&table, &catalog()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_collect_missing_column_is_fatal() {
        let table = ledger("Account Number,Product Name\n5001234567,1 Gig\n");
        let err = collect_records(&table, &catalog()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Date of Sale"));
        assert!(msg.contains("Product Name"));
    }

    #[test]
    fn test_collect_drops_empty_keys() {
        let table = ledger(
            "Account Number,Product Name,Date of Sale\n\
             ,1 Gig,2024-03-01\n\
             5001234567,1 Gig,2024-03-01\n",
        );
        let (records, diags) = collect_records(&table, &catalog()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(diags.internal_rows_dropped, 1);
    }

    #[test]
    fn test_summarize_or_reduces_flags() {
        let table = ledger(
            "Account Number,Product Name,Date of Sale\n\
             5001234567,1 Gig,2024-03-01\n\
             5001234567,Stream Box,2024-03-05\n\
             5009999999,Freedom,2024-03-10\n",
        );
        let (records, _) = collect_records(&table, &catalog()).unwrap();
        let summarized = summarize(&records, window());

        assert_eq!(summarized.len(), 2);
        let first = summarized.iter().find(|s| s.key.as_str() == "5001234567").unwrap();
        assert!(first.flags.internet);
        assert!(first.flags.tv);
        assert!(!first.flags.phone);
        assert_eq!(first.sale_dates.len(), 2);
    }

    #[test]
    fn test_summarize_window_is_inclusive() {
        let table = ledger(
            "Account Number,Product Name,Date of Sale\n\
             5001111111,1 Gig,2024-03-01\n\
             5002222222,1 Gig,2024-03-31\n\
             5003333333,1 Gig,2024-04-01\n",
        );
        let (records, _) = collect_records(&table, &catalog()).unwrap();
        let summarized = summarize(&records, window());
        assert_eq!(summarized.len(), 2);
    }

    #[test]
    fn test_fully_filtered_account_emits_nothing() {
        let table = ledger(
            "Account Number,Product Name,Date of Sale\n\
             5001234567,1 Gig,2024-01-10\n\
             5001234567,Stream Box,bad date\n",
        );
        let (records, diags) = collect_records(&table, &catalog()).unwrap();
        assert_eq!(diags.malformed_dates, 1);
        let summarized = summarize(&records, window());
        assert!(summarized.is_empty());
    }
}
