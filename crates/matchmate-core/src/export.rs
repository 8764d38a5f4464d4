//! Export of reconciliation outcomes
//!
//! Renders the mismatch set for download or piping: CSV with the column
//! layout analysts expect from the comparison sheet, or JSON rows for
//! programmatic consumers. Flags render as 1/0; absent external sides render
//! as empty cells.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{CategoryFlags, ReconciliationOutcome};

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

/// One flattened outcome row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRow {
    #[serde(rename = "Account Number")]
    pub account: String,
    #[serde(rename = "Reason")]
    pub reason: String,
    #[serde(rename = "Internet_Internal")]
    pub internet_internal: u8,
    #[serde(rename = "TV_Internal")]
    pub tv_internal: u8,
    #[serde(rename = "Phone_Internal")]
    pub phone_internal: u8,
    #[serde(rename = "Internet_Report")]
    pub internet_report: Option<u8>,
    #[serde(rename = "TV_Report")]
    pub tv_report: Option<u8>,
    #[serde(rename = "Phone_Report")]
    pub phone_report: Option<u8>,
    #[serde(rename = "Region")]
    pub region: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<String>,
}

fn bit(b: bool) -> u8 {
    u8::from(b)
}

impl OutcomeRow {
    fn from_outcome(outcome: &ReconciliationOutcome) -> Self {
        let ext = |f: fn(&CategoryFlags) -> bool| outcome.external.as_ref().map(|e| bit(f(e)));
        Self {
            account: outcome.key.to_string(),
            reason: outcome.reason_label(),
            internet_internal: bit(outcome.internal.internet),
            tv_internal: bit(outcome.internal.tv),
            phone_internal: bit(outcome.internal.phone),
            internet_report: ext(|e| e.internet),
            tv_report: ext(|e| e.tv),
            phone_report: ext(|e| e.phone),
            region: outcome.region.clone(),
            date: outcome.observed_date.map(|d| d.to_string()),
        }
    }
}

/// Flatten outcomes into export rows.
pub fn outcome_rows(outcomes: &[ReconciliationOutcome]) -> Vec<OutcomeRow> {
    outcomes.iter().map(OutcomeRow::from_outcome).collect()
}

/// Render outcomes in the requested format.
pub fn render_outcomes(outcomes: &[ReconciliationOutcome], format: ExportFormat) -> Result<String> {
    let rows = outcome_rows(outcomes);
    match format {
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for row in &rows {
                writer.serialize(row)?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| crate::error::Error::Io(e.into_error()))?;
            // csv::Writer only writes valid UTF-8
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        ExportFormat::Json => Ok(serde_json::to_string_pretty(&rows)?),
    }
}
