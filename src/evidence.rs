//! Evidence listing: every chunk with its source location, optionally
//! restricted to one facet.

use anyhow::Result;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;
use crate::store::Store;

/// CLI entry point for `sred evidence`.
pub async fn run_evidence(config: &Config, facet: Option<&str>, json: bool) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let evidence = store.list_evidence(facet).await;
    store.close().await;
    let evidence = evidence?;

    if json {
        println!("{}", serde_json::to_string_pretty(&evidence)?);
        return Ok(());
    }

    if evidence.is_empty() {
        match facet {
            Some(f) => println!("No evidence tagged {}.", f),
            None => println!("No evidence."),
        }
        return Ok(());
    }

    for c in &evidence {
        let flat = c.text.split_whitespace().collect::<Vec<_>>().join(" ");
        println!("{}:{}-{}  {}", c.source_path, c.char_start, c.char_end, flat);
    }
    println!();
    println!("{} chunk(s)", evidence.len());
    Ok(())
}
