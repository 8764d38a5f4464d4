//! Command implementations

mod config;
mod run;

pub use config::{cmd_catalog, cmd_regions};
pub use run::cmd_run;

use std::path::Path;

use anyhow::{Context, Result};
use matchmate_core::{ProductCatalog, RegionBook};

/// Load the region book: override file if given, embedded defaults otherwise.
pub fn load_region_book(path: Option<&Path>) -> Result<RegionBook> {
    match path {
        Some(p) => RegionBook::from_path(p)
            .with_context(|| format!("Failed to load region book: {}", p.display())),
        None => RegionBook::embedded().context("Embedded region book is invalid"),
    }
}

/// Load the product catalog: override file if given, embedded defaults
/// otherwise.
pub fn load_catalog(path: Option<&Path>) -> Result<ProductCatalog> {
    match path {
        Some(p) => ProductCatalog::from_path(p)
            .with_context(|| format!("Failed to load product catalog: {}", p.display())),
        None => ProductCatalog::embedded().context("Embedded product catalog is invalid"),
    }
}
