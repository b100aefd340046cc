//! Record-store abstraction for documents, chunks, and tags.
//!
//! The [`Store`] trait is the only way the pipeline touches persisted
//! records, so the retrieval and assembly logic can run against SQLite
//! ([`crate::sqlite_store::SqliteStore`]) or the in-memory backend used in
//! tests ([`memory::InMemoryStore`]).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Chunk, Citation, Document, NewDocument, StoreCounts, TaggedChunk};

/// Ids assigned by [`Store::write_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenDocument {
    pub document_id: i64,
    pub chunk_ids: Vec<i64>,
    pub tags_written: usize,
    /// True when an existing document with the same path was replaced.
    pub replaced: bool,
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`write_document`](Store::write_document) | Create a document with its chunks and tags, atomically |
/// | [`find_document_by_path`](Store::find_document_by_path) | Look up a document by its unique path |
/// | [`get_document`](Store::get_document) | Fetch a document by id |
/// | [`get_chunk`](Store::get_chunk) | Fetch a chunk by id |
/// | [`list_chunks`](Store::list_chunks) | Candidate chunks, optionally filtered by facet |
/// | [`chunk_facets`](Store::chunk_facets) | Facets stored for one chunk |
/// | [`list_evidence`](Store::list_evidence) | Chunks joined with their document path |
/// | [`delete_document`](Store::delete_document) | Remove a document and everything under it |
/// | [`counts`](Store::counts) | Corpus statistics |
#[async_trait]
pub trait Store: Send + Sync {
    /// Write a document, its chunks, and their tags as one unit.
    ///
    /// If a document with the same `path` exists it is replaced together
    /// with its chunks and tags. Either everything is written or nothing is.
    async fn write_document(
        &self,
        doc: &NewDocument,
        chunks: &[TaggedChunk],
    ) -> Result<WrittenDocument>;

    async fn find_document_by_path(&self, path: &str) -> Result<Option<Document>>;

    async fn get_document(&self, id: i64) -> Result<Option<Document>>;

    async fn get_chunk(&self, id: i64) -> Result<Option<Chunk>>;

    /// All chunks in ascending id order. With `facets`, only chunks that
    /// carry at least one of the given facets are returned, each once.
    /// An empty facet list is the same as no filter.
    async fn list_chunks(&self, facets: Option<&[String]>) -> Result<Vec<Chunk>>;

    async fn chunk_facets(&self, chunk_id: i64) -> Result<Vec<String>>;

    /// Chunks with their source path, optionally restricted to one facet,
    /// ordered by path then offset.
    async fn list_evidence(&self, facet: Option<&str>) -> Result<Vec<Citation>>;

    /// Returns `false` if no document had that id.
    async fn delete_document(&self, id: i64) -> Result<bool>;

    async fn counts(&self) -> Result<StoreCounts>;
}
