//! Config inspection commands (`regions`, `catalog`)

use std::path::Path;

use anyhow::Result;

use super::{load_catalog, load_region_book};

pub fn cmd_regions(regions_override: Option<&Path>) -> Result<()> {
    let book = load_region_book(regions_override)?;

    println!("Configured regions:");
    for region in book.regions() {
        println!();
        println!(
            "  {} (prefix '{}', key length {}, sheet '{}')",
            region.name, region.prefix, region.key_length, region.sheet
        );
        let col = |label: &str, name: &Option<String>| match name {
            Some(n) => println!("    {:<10} <- {}", label, n),
            None => println!("    {:<10} <- (absent)", label),
        };
        println!("    {:<10} <- {}", "account", region.columns.account);
        col("internet", &region.columns.internet);
        col("tv", &region.columns.tv);
        col("phone", &region.columns.phone);
        col("date", &region.columns.date);
        col("status", &region.columns.status);
    }

    Ok(())
}

pub fn cmd_catalog(catalog_override: Option<&Path>) -> Result<()> {
    let catalog = load_catalog(catalog_override)?;

    let section = |name: &str, labels: &[String]| {
        println!("{} ({} products):", name, labels.len());
        for label in labels {
            println!("  {}", label);
        }
        println!();
    };

    section("Internet", catalog.internet_labels());
    section("TV", catalog.tv_labels());
    section("Phone", catalog.phone_labels());

    println!("Matching is exact and case-sensitive.");
    Ok(())
}
