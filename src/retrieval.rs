//! TF-IDF retrieval over a candidate chunk set.
//!
//! Retrieval is corpus-relative: every call fits a fresh
//! [`VectorSpace`](crate::tfidf::VectorSpace) on the texts of its candidate
//! chunks, so vocabulary and IDF weights depend on which chunks were
//! considered. Restricting the candidates by facet therefore changes both
//! the ranking and the vocabulary used to compute it.
//!
//! # Ranking
//!
//! 1. No candidates → no results (no space is fit on zero documents).
//! 2. Fit the space on the candidate texts.
//! 3. Project the query into it; unknown query terms weigh nothing.
//! 4. Score each candidate by cosine similarity with the query.
//! 5. Sort by descending score. The sort is stable: equal scores keep the
//!    candidates' input order (ascending chunk id when read from a store).
//! 6. Drop every score `<= 0`.
//! 7. Keep at most `top_k`; `top_k <= 0` asks for nothing.
//!
//! Because the space is rebuilt per call, concurrent searches against a
//! stable corpus are independent. A search running alongside ingestion may
//! see either the old or the new candidate set.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::Chunk;
use crate::store::Store;
use crate::tfidf::VectorSpace;

/// A chunk id with its relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedChunk {
    pub chunk_id: i64,
    pub score: f64,
}

/// Rank `candidates` against `query` and return at most `top_k` hits with
/// strictly positive scores, best first.
pub fn rank(query: &str, candidates: &[Chunk], top_k: i64) -> Vec<RankedChunk> {
    if candidates.is_empty() || top_k <= 0 {
        return Vec::new();
    }

    let space = VectorSpace::fit(candidates.iter().map(|c| c.text.as_str()));
    let query_vec = space.transform(query);
    if query_vec.is_zero() {
        return Vec::new();
    }

    let mut scored: Vec<RankedChunk> = candidates
        .iter()
        .map(|c| RankedChunk {
            chunk_id: c.id,
            score: space.transform(&c.text).dot(&query_vec),
        })
        .collect();

    // Stable: ties keep candidate order.
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.retain(|r| r.score > 0.0);
    scored.truncate(top_k as usize);
    scored
}

/// Parameters for one store-backed search.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    /// Restrict candidates to chunks tagged with any of these facets.
    pub facets: Option<&'a [String]>,
    pub top_k: i64,
    /// Keep at most this many candidates (in store order) before ranking.
    pub max_candidates: Option<usize>,
}

/// Load the candidate set from `store` and rank it.
///
/// Every candidate's offsets are checked first; a malformed chunk aborts
/// the search with a validation error.
pub async fn search<S: Store + ?Sized>(
    store: &S,
    req: &SearchRequest<'_>,
) -> Result<Vec<RankedChunk>> {
    if req.top_k <= 0 {
        return Ok(Vec::new());
    }

    let mut candidates = store.list_chunks(req.facets).await?;
    for chunk in &candidates {
        chunk.validate()?;
    }

    if let Some(cap) = req.max_candidates {
        if candidates.len() > cap {
            warn!(
                candidates = candidates.len(),
                cap, "candidate set truncated before ranking"
            );
            candidates.truncate(cap);
        }
    }

    let ranked = rank(req.query, &candidates, req.top_k);
    debug!(
        query = req.query,
        facets = ?req.facets,
        candidates = candidates.len(),
        hits = ranked.len(),
        "search complete"
    );
    Ok(ranked)
}
