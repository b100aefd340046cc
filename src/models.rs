//! Core data models used throughout the evidence pipeline.
//!
//! These types represent the documents, chunks, and tags written during
//! ingestion, and the citations handed to report rendering.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{Error, Result};

/// A document stored in the record store. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub id: i64,
    pub project_id: String,
    pub path: String,
    pub text: String,
    /// Ingestion fingerprint, see [`crate::ingest::fingerprint`].
    pub content_hash: String,
    pub ingested_at: i64,
}

/// A document about to be written; the store assigns its id.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub project_id: String,
    pub path: String,
    pub text: String,
    pub content_hash: String,
    pub ingested_at: i64,
}

/// An offset-addressable span of a document's text.
///
/// `start` and `end` are half-open character offsets (Unicode scalar
/// values, not bytes) into the owning document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub id: i64,
    pub document_id: i64,
    pub start: i64,
    pub end: i64,
    pub text: String,
}

impl Chunk {
    /// Reject chunks whose offsets are out of order.
    pub fn validate(&self) -> Result<()> {
        if self.start < 0 || self.start >= self.end {
            return Err(Error::Validation(format!(
                "chunk {} has malformed offsets [{}, {})",
                self.id, self.start, self.end
            )));
        }
        Ok(())
    }

    /// Check that this chunk's offsets reconstruct its text from `document`.
    pub fn validate_against(&self, document: &Document) -> Result<()> {
        self.validate()?;
        if self.document_id != document.id {
            return Err(Error::Validation(format!(
                "chunk {} belongs to document {}, not {}",
                self.id, self.document_id, document.id
            )));
        }
        let slice = char_slice(&document.text, self.start as usize, self.end as usize);
        match slice {
            Some(s) if s == self.text => Ok(()),
            _ => Err(Error::Validation(format!(
                "chunk {} text does not match {}[{}..{})",
                self.id, document.path, self.start, self.end
            ))),
        }
    }
}

/// A chunk about to be written, with the facets the tagger assigned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedChunk {
    pub start: i64,
    pub end: i64,
    pub text: String,
    pub facets: BTreeSet<String>,
}

/// A resolved pointer from a chunk back to its source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citation {
    pub chunk_id: i64,
    pub source_path: String,
    pub char_start: i64,
    pub char_end: i64,
    pub text: String,
}

impl Citation {
    pub fn new(chunk: &Chunk, document: &Document) -> Self {
        Self {
            chunk_id: chunk.id,
            source_path: document.path.clone(),
            char_start: chunk.start,
            char_end: chunk.end,
            text: chunk.text.clone(),
        }
    }
}

/// Row counts for the whole corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub documents: i64,
    pub chunks: i64,
    pub tags: i64,
    /// `(facet, tagged chunk count)`, ordered by facet name.
    pub facets: Vec<(String, i64)>,
}

/// Slice `text` by character offsets. `None` if the range is out of bounds.
pub fn char_slice(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let mut indices = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));
    let from = indices.nth(start)?;
    let to = if end == start {
        from
    } else {
        indices.nth(end - start - 1)?
    };
    Some(&text[from..to])
}
