//! Corpus statistics.
//!
//! Provides a quick summary of what's ingested: document, chunk, and tag
//! counts plus a per-facet breakdown. Used by `sred stats` to confirm that
//! an archive was ingested and tagged as expected.

use anyhow::Result;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;
use crate::store::Store;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let counts = store.counts().await;
    store.close().await;
    let counts = counts?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("SR&ED Harness - Database Stats");
    println!("==============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", counts.documents);
    println!("  Chunks:      {}", counts.chunks);
    println!(
        "  Tagged:      {} tag{}",
        counts.tags,
        if counts.tags == 1 { "" } else { "s" }
    );

    if !counts.facets.is_empty() {
        println!();
        println!("  By facet:");
        println!("  {:<32} {:>8}", "FACET", "CHUNKS");
        println!("  {}", "-".repeat(41));
        for (facet, n) in &counts.facets {
            println!("  {:<32} {:>8}", facet, n);
        }
    }

    println!();
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
