//! Product classifier
//!
//! Maps free-text product labels from the internal ledger onto category
//! flags (Internet/TV/Phone) using configured lists of canonical label
//! strings.
//!
//! Matching is exact and case-sensitive by design. Product catalogs contain
//! overlapping substrings across categories ("epico plus" vs "plus",
//! TV bundles containing "Phone"), so substring matching produces false
//! positives. The catalog is maintained as an explicit enumeration of exact
//! product names.
//!
//! ## Configuration Resolution
//!
//! 1. Caller-supplied override file (CLI `--catalog`)
//! 2. Embedded defaults (compiled into the binary)

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::CategoryFlags;

/// Embedded default catalog (compiled into binary)
const DEFAULT_CATALOG: &str = include_str!("../../../config/catalog.toml");

#[derive(Debug, Clone, Deserialize)]
struct CategorySection {
    labels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    internet: CategorySection,
    tv: CategorySection,
    phone: CategorySection,
}

/// Configured product label lists, one per category.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    internet: Vec<String>,
    tv: Vec<String>,
    phone: Vec<String>,
}

impl ProductCatalog {
    /// Load the embedded default catalog.
    pub fn embedded() -> Result<Self> {
        Self::from_toml(DEFAULT_CATALOG)
    }

    /// Load a catalog from a TOML override file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        debug!("Loaded catalog override from {}", path.display());
        Self::from_toml(&content)
    }

    /// Parse and validate catalog TOML.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        let catalog = Self {
            internet: file.internet.labels,
            tv: file.tv.labels,
            phone: file.phone.labels,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        for (category, labels) in [
            ("internet", &self.internet),
            ("tv", &self.tv),
            ("phone", &self.phone),
        ] {
            if labels.is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "category '{}' has no configured labels",
                    category
                )));
            }
            if let Some(label) = labels.iter().find(|l| l.trim().is_empty()) {
                return Err(Error::InvalidCatalog(format!(
                    "category '{}' contains a blank label ({:?})",
                    category, label
                )));
            }
        }
        Ok(())
    }

    /// Classify a product label into category flags.
    ///
    /// A flag is set iff the trimmed label is an exact match to one entry in
    /// that category's list. Never a substring match.
    pub fn classify(&self, label: &str) -> CategoryFlags {
        let label = label.trim();
        CategoryFlags {
            internet: Self::matches(&self.internet, label),
            tv: Self::matches(&self.tv, label),
            phone: Self::matches(&self.phone, label),
        }
    }

    fn matches(labels: &[String], label: &str) -> bool {
        labels.iter().any(|l| l == label)
    }

    pub fn internet_labels(&self) -> &[String] {
        &self.internet
    }

    pub fn tv_labels(&self) -> &[String] {
        &self.tv
    }

    pub fn phone_labels(&self) -> &[String] {
        &self.phone
    }
}
