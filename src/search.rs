//! Query-facing search: ranked chunk ids resolved to printable records.
//!
//! Shared by `sred search` and `POST /search`. Ranking itself lives in
//! [`crate::retrieval`]; this module resolves each hit to its document
//! path, offsets, text, and facets.

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::retrieval::{self, SearchRequest};
use crate::sqlite_store::SqliteStore;
use crate::store::Store;

/// A single search result with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub chunk_id: i64,
    pub path: String,
    pub start: i64,
    pub end: i64,
    pub score: f64,
    pub text: String,
    pub facets: Vec<String>,
}

/// Rank chunks for `query` and resolve them to [`SearchHit`]s.
///
/// Hits whose chunk or document vanished after ranking are dropped.
pub async fn search_chunks<S: Store + ?Sized>(
    store: &S,
    req: &SearchRequest<'_>,
) -> crate::error::Result<Vec<SearchHit>> {
    let ranked = retrieval::search(store, req).await?;
    let mut hits = Vec::with_capacity(ranked.len());

    for r in ranked {
        let Some(chunk) = store.get_chunk(r.chunk_id).await? else {
            debug!(chunk_id = r.chunk_id, "ranked chunk disappeared");
            continue;
        };
        let Some(doc) = store.get_document(chunk.document_id).await? else {
            debug!(document_id = chunk.document_id, "document disappeared");
            continue;
        };
        hits.push(SearchHit {
            chunk_id: chunk.id,
            path: doc.path,
            start: chunk.start,
            end: chunk.end,
            score: r.score,
            facets: store.chunk_facets(chunk.id).await?,
            text: chunk.text,
        });
    }

    Ok(hits)
}

/// CLI entry point for `sred search`.
pub async fn run_search(
    config: &Config,
    query: &str,
    facets: &[String],
    limit: Option<i64>,
    json: bool,
) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let req = SearchRequest {
        query,
        facets: if facets.is_empty() { None } else { Some(facets) },
        top_k: limit.unwrap_or(config.retrieval.top_k),
        max_candidates: config.retrieval.max_candidates,
    };
    let hits = search_chunks(&store, &req).await;
    store.close().await;
    let hits = hits?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{}. [{:.3}] {}:{}-{}",
            i + 1,
            hit.score,
            hit.path,
            hit.start,
            hit.end
        );
        if !hit.facets.is_empty() {
            println!("   facets: {}", hit.facets.join(", "));
        }
        println!("   {}", preview(&hit.text, 160));
        println!();
    }

    Ok(())
}

/// First `max_chars` characters of `text` on one line.
fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut)
}
