//! Region schema resolver
//!
//! The external PSU report arrives as one export per region, and every
//! region names its columns differently (the account column, the submission
//! date column, the status column). A [`RegionBook`] maps each region's raw
//! headers onto the canonical schema {account, internet, tv, phone, date,
//! status} and determines the originating region of an account number from
//! its literal shape: a required prefix plus a required exact length.
//!
//! The book is validated when loaded, so a misconfigured region fails at
//! startup instead of surfacing as unmatched rows mid-run.
//!
//! ## Configuration Resolution
//!
//! 1. Caller-supplied override file (CLI `--regions`)
//! 2. Embedded defaults (compiled into the binary)

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::key;
use crate::models::{CategoryFlags, ExternalRecord, RunDiagnostics};
use crate::table::{parse_date_lenient, Table};

/// Embedded default region book (compiled into binary)
const DEFAULT_REGIONS: &str = include_str!("../../../config/regions.toml");

/// Region-specific header names for the canonical fields. Optional fields
/// absent from a region's raw schema canonicalize as empty values.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMap {
    pub account: String,
    pub internet: Option<String>,
    pub tv: Option<String>,
    pub phone: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

/// One configured region: its key shape and its column mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    /// Account numbers from this region start with this prefix...
    pub prefix: String,
    /// ...and have exactly this many characters. Both must hold.
    pub key_length: usize,
    /// Source tab/sheet name in the provider's spreadsheet.
    pub sheet: String,
    pub columns: ColumnMap,
}

impl RegionConfig {
    /// True iff a normalized key has this region's shape.
    pub fn matches(&self, key: &str) -> bool {
        key.len() == self.key_length && key.starts_with(&self.prefix)
    }
}

#[derive(Debug, Deserialize)]
struct RegionFile {
    regions: Vec<RegionConfig>,
}

/// The validated, closed set of configured regions.
#[derive(Debug, Clone)]
pub struct RegionBook {
    regions: Vec<RegionConfig>,
}

impl RegionBook {
    /// Load the embedded default region book.
    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_REGIONS)
    }

    /// Load a region book from a TOML override file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        debug!("Loaded region book override from {}", path.display());
        Self::from_toml(&content)
    }

    /// Parse and validate region book TOML.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: RegionFile = toml::from_str(content)?;
        let book = Self {
            regions: file.regions,
        };
        book.validate()?;
        Ok(book)
    }

    fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(Error::InvalidRegionConfig(
                "no regions configured".to_string(),
            ));
        }
        for region in &self.regions {
            if region.name.trim().is_empty() {
                return Err(Error::InvalidRegionConfig(
                    "region with empty name".to_string(),
                ));
            }
            if region.prefix.is_empty() {
                return Err(Error::InvalidRegionConfig(format!(
                    "region '{}' has an empty prefix",
                    region.name
                )));
            }
            if region.key_length < region.prefix.len() {
                return Err(Error::InvalidRegionConfig(format!(
                    "region '{}': key_length {} is shorter than prefix '{}'",
                    region.name, region.key_length, region.prefix
                )));
            }
        }
        for (i, a) in self.regions.iter().enumerate() {
            for b in &self.regions[i + 1..] {
                if a.name == b.name {
                    return Err(Error::InvalidRegionConfig(format!(
                        "duplicate region name '{}'",
                        a.name
                    )));
                }
                if a.prefix == b.prefix && a.key_length == b.key_length {
                    return Err(Error::InvalidRegionConfig(format!(
                        "regions '{}' and '{}' share the shape {}/{} and cannot be told apart",
                        a.name, b.name, a.prefix, a.key_length
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn regions(&self) -> &[RegionConfig] {
        &self.regions
    }

    pub fn get(&self, name: &str) -> Option<&RegionConfig> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// Determine the originating region of a normalized account key from its
    /// shape. Prefix and exact length both must match.
    pub fn resolve(&self, key: &str) -> Result<&RegionConfig> {
        self.regions
            .iter()
            .find(|r| r.matches(key))
            .ok_or_else(|| Error::UnresolvedRegion {
                key: key.to_string(),
            })
    }

    /// Canonicalize one region's raw export into [`ExternalRecord`]s.
    ///
    /// The account column is mandatory ([`Error::MissingRequiredColumn`],
    /// fatal). Flag, date and status columns are tolerated absent. Rows whose
    /// key is unnormalizable, or whose shape resolves to a region other than
    /// `region_name`, are dropped with diagnostic counts: a row from another
    /// region's tab never canonicalizes under this region's mapping.
    pub fn canonicalize(
        &self,
        region_name: &str,
        table: &Table,
    ) -> Result<(Vec<ExternalRecord>, RunDiagnostics)> {
        let region = self
            .get(region_name)
            .ok_or_else(|| Error::InvalidRegionConfig(format!("unknown region '{}'", region_name)))?;

        let account_idx =
            table.require_column("account", &[region.columns.account.as_str()])?;
        let col = |name: &Option<String>| name.as_deref().and_then(|n| table.column(n));
        let internet_idx = col(&region.columns.internet);
        let tv_idx = col(&region.columns.tv);
        let phone_idx = col(&region.columns.phone);
        let date_idx = col(&region.columns.date);
        let status_idx = col(&region.columns.status);

        let mut diags = RunDiagnostics::default();
        let mut records = Vec::new();

        for row in table.rows() {
            let raw_key = table.cell(row, account_idx);
            let key = match key::normalize(raw_key) {
                Ok(k) => k,
                Err(_) => {
                    diags.external_rows_dropped += 1;
                    diags.note(&region.name, "row dropped: empty account number");
                    continue;
                }
            };

            match self.resolve(key.as_str()) {
                Ok(resolved) if resolved.name == region.name => {}
                Ok(resolved) => {
                    diags.unresolved_region_rows += 1;
                    diags.note(
                        &region.name,
                        format!(
                            "row dropped: account {} has the shape of region '{}'",
                            key, resolved.name
                        ),
                    );
                    continue;
                }
                Err(_) => {
                    diags.unresolved_region_rows += 1;
                    diags.note(
                        &region.name,
                        format!("row dropped: account {} matches no configured region", key),
                    );
                    continue;
                }
            }

            let mut coerce = |idx: Option<usize>| {
                idx.map(|i| {
                    let cell = table.cell(row, i).trim();
                    if cell == "0" {
                        diags.zero_coerced_true += 1;
                    }
                    !cell.is_empty()
                })
                .unwrap_or(false)
            };
            let flags = CategoryFlags {
                internet: coerce(internet_idx),
                tv: coerce(tv_idx),
                phone: coerce(phone_idx),
            };

            let observed_date = match date_idx {
                Some(i) => {
                    let cell = table.cell(row, i).trim();
                    let parsed = parse_date_lenient(cell);
                    if parsed.is_none() && !cell.is_empty() {
                        diags.malformed_dates += 1;
                        diags.note(
                            &region.name,
                            format!("account {}: unparseable date '{}'", key, cell),
                        );
                    }
                    parsed
                }
                None => None,
            };

            let status = status_idx
                .map(|i| table.cell(row, i).trim().to_string())
                .filter(|s| !s.is_empty());

            records.push(ExternalRecord {
                key,
                flags,
                observed_date,
                status,
                region: region.name.clone(),
            });
        }

        debug!(
            "Canonicalized {} rows for region '{}' ({} dropped)",
            records.len(),
            region.name,
            diags.external_rows_dropped + diags.unresolved_region_rows
        );
        Ok((records, diags))
    }

    /// Canonicalize every configured region's source independently and
    /// concatenate the results. Overlapping regions are never reconciled
    /// against each other.
    pub fn canonicalize_all<'a, I>(
        &self,
        sources: I,
    ) -> Result<(Vec<ExternalRecord>, RunDiagnostics)>
    where
        I: IntoIterator<Item = (&'a str, &'a Table)>,
    {
        let mut records = Vec::new();
        let mut diags = RunDiagnostics::default();
        for (region_name, table) in sources {
            let (mut region_records, region_diags) = self.canonicalize(region_name, table)?;
            records.append(&mut region_records);
            diags.absorb(region_diags);
        }
        if diags.unresolved_region_rows > 0 {
            warn!(
                "{} external rows matched no configured region shape",
                diags.unresolved_region_rows
            );
        }
        Ok((records, diags))
    }
}
