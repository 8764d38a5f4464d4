//! The `run` command: one full reconciliation pass

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use matchmate_core::{
    reconcile_tables, render_outcomes, DateWindow, ExportFormat, ReconciliationReport, Table,
};
use tracing::warn;

use super::{load_catalog, load_region_book};

#[allow(clippy::too_many_arguments)]
pub fn cmd_run(
    internal_path: &Path,
    external_sources: &[(String, PathBuf)],
    from: NaiveDate,
    to: NaiveDate,
    output: Option<&Path>,
    format_str: &str,
    regions_override: Option<&Path>,
    catalog_override: Option<&Path>,
) -> Result<()> {
    let format: ExportFormat = format_str
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Use --format csv or --format json")?;

    let window = DateWindow::new(from, to)?;
    let catalog = load_catalog(catalog_override)?;
    let book = load_region_book(regions_override)?;

    // Reject unknown region names before touching any file
    for (region, _) in external_sources {
        if book.get(region).is_none() {
            let known: Vec<_> = book.regions().iter().map(|r| r.name.as_str()).collect();
            anyhow::bail!(
                "Unknown region '{}'. Configured regions: {}",
                region,
                known.join(", ")
            );
        }
    }

    println!(
        "📥 Reconciling {} against {} region report(s), window {} to {}...",
        internal_path.display(),
        external_sources.len(),
        from,
        to
    );

    let internal = read_table(internal_path).context("Failed to read internal sales ledger")?;

    // A region report we cannot read is an ingestion failure of the external
    // collaborator; surface it verbatim and abort the run
    let mut region_tables = Vec::new();
    for (region, path) in external_sources {
        let table = read_table(path).map_err(|e| {
            matchmate_core::Error::Ingestion(format!(
                "region '{}' ({}): {:#}",
                region,
                path.display(),
                e
            ))
        })?;
        region_tables.push((region.as_str(), table));
    }

    let report = reconcile_tables(
        &internal,
        region_tables.iter().map(|(r, t)| (*r, t)),
        &catalog,
        &book,
        window,
    )?;

    print_summary(&report);

    let rendered = render_outcomes(&report.outcomes, format)?;
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("⬇️  Mismatch export written to {}", path.display());
        }
        None if !report.outcomes.is_empty() => {
            println!();
            print!("{}", rendered);
        }
        None => {}
    }

    Ok(())
}

fn read_table(path: &Path) -> Result<Table> {
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    Ok(Table::from_csv_reader(file)?)
}

fn print_summary(report: &ReconciliationReport) {
    println!("✅ Comparison complete!");
    println!("   Accounts checked: {}", report.total_checked);
    println!("   Mismatched accounts: {}", report.mismatched_accounts());
    println!("   Mismatch rows: {}", report.outcomes.len());

    let diags = &report.diagnostics;
    if diags.internal_rows_dropped > 0 {
        warn!(
            "{} internal rows dropped (empty account number)",
            diags.internal_rows_dropped
        );
    }
    if diags.external_rows_dropped > 0 {
        warn!(
            "{} external rows dropped (empty account number)",
            diags.external_rows_dropped
        );
    }
    if diags.unresolved_region_rows > 0 {
        warn!(
            "{} external rows matched no configured region shape",
            diags.unresolved_region_rows
        );
    }
    if diags.malformed_dates > 0 {
        warn!("{} date cells were unparseable", diags.malformed_dates);
    }
    if diags.zero_coerced_true > 0 {
        // Preserved quirk of the report format: "0" is a non-empty cell
        warn!(
            "{} report cells contained literal \"0\" and were treated as subscribed",
            diags.zero_coerced_true
        );
    }
}
