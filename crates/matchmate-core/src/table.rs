//! In-memory tabular data
//!
//! The engine never parses file bytes itself; collaborators hand it
//! already-parsed tables. [`Table`] is that contract boundary: a header row
//! plus string cells. The CSV constructor exists for collaborators that read
//! local exports.

use std::io::Read;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{Error, Result};

/// A parsed tabular dataset: one header row and zero or more data rows.
/// All cells are kept as raw strings; typing happens downstream.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Read a table from CSV data. Flexible row widths are tolerated; short
    /// rows read as empty cells downstream.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(record.iter().map(|c| c.to_string()).collect());
        }

        debug!("Parsed table with {} rows", rows.len());
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Cell at (row, column index); absent cells in short rows read as "".
    pub fn cell<'a>(&'a self, row: &'a [String], idx: usize) -> &'a str {
        row.get(idx).map(String::as_str).unwrap_or("")
    }

    /// Find a column by exact header name (trimmed comparison).
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// Find a column by any of several accepted header names.
    pub fn column_any(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|n| self.column(n))
    }

    /// Like [`Self::column_any`], but the column is required: failure is the
    /// fatal [`Error::MissingRequiredColumn`], listing accepted names versus
    /// the headers actually present.
    pub fn require_column(&self, canonical: &'static str, names: &[&str]) -> Result<usize> {
        self.column_any(names)
            .ok_or_else(|| Error::MissingRequiredColumn {
                column: canonical,
                expected: names.iter().map(|n| n.to_string()).collect(),
                found: self.headers.clone(),
            })
    }
}

/// Parse a date cell in the formats the source systems actually emit.
///
/// Returns `None` for empty or malformed cells: a bad date coerces to the
/// absent-date sentinel rather than rejecting the row.
pub fn parse_date_lenient(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let formats = [
        "%Y-%m-%d", // 2024-03-01
        "%m/%d/%Y", // 03/01/2024
        "%m/%d/%y", // 03/01/24
        "%d/%m/%Y", // 01/03/2024 (Quebec exports)
        "%m-%d-%Y", // 03-01-2024
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    // Timestamp forms: keep the calendar date, drop the time of day
    if let Some((date_part, _)) = s.split_once(' ') {
        return parse_date_lenient(date_part);
    }

    None
}
