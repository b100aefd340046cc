//! In-memory [`Store`] implementation for tests and dry runs.
//!
//! All records live behind a single `std::sync::RwLock`, so every write is
//! trivially atomic. Ids are assigned from monotonically increasing
//! counters, mirroring SQLite `AUTOINCREMENT`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{Chunk, Citation, Document, NewDocument, StoreCounts, TaggedChunk};

use super::{Store, WrittenDocument};

#[derive(Default)]
struct State {
    documents: BTreeMap<i64, Document>,
    chunks: BTreeMap<i64, Chunk>,
    tags: BTreeMap<i64, BTreeSet<String>>,
    next_document_id: i64,
    next_chunk_id: i64,
}

impl State {
    fn remove_document(&mut self, id: i64) -> bool {
        if self.documents.remove(&id).is_none() {
            return false;
        }
        let chunk_ids: Vec<i64> = self
            .chunks
            .values()
            .filter(|c| c.document_id == id)
            .map(|c| c.id)
            .collect();
        for chunk_id in chunk_ids {
            self.chunks.remove(&chunk_id);
            self.tags.remove(&chunk_id);
        }
        true
    }
}

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| Error::Store("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| Error::Store("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn write_document(
        &self,
        doc: &NewDocument,
        chunks: &[TaggedChunk],
    ) -> Result<WrittenDocument> {
        // Same constraint the SQLite schema enforces, checked before mutating.
        if let Some(bad) = chunks.iter().find(|c| c.start < 0 || c.start >= c.end) {
            return Err(Error::Validation(format!(
                "{} has malformed chunk offsets [{}, {})",
                doc.path, bad.start, bad.end
            )));
        }

        let mut state = self.write()?;

        let existing = state
            .documents
            .values()
            .find(|d| d.path == doc.path)
            .map(|d| d.id);
        let replaced = match existing {
            Some(id) => state.remove_document(id),
            None => false,
        };

        state.next_document_id += 1;
        let document_id = state.next_document_id;
        state.documents.insert(
            document_id,
            Document {
                id: document_id,
                project_id: doc.project_id.clone(),
                path: doc.path.clone(),
                text: doc.text.clone(),
                content_hash: doc.content_hash.clone(),
                ingested_at: doc.ingested_at,
            },
        );

        let mut chunk_ids = Vec::with_capacity(chunks.len());
        let mut tags_written = 0;
        for tc in chunks {
            state.next_chunk_id += 1;
            let chunk_id = state.next_chunk_id;
            state.chunks.insert(
                chunk_id,
                Chunk {
                    id: chunk_id,
                    document_id,
                    start: tc.start,
                    end: tc.end,
                    text: tc.text.clone(),
                },
            );
            if !tc.facets.is_empty() {
                tags_written += tc.facets.len();
                state.tags.insert(chunk_id, tc.facets.clone());
            }
            chunk_ids.push(chunk_id);
        }

        Ok(WrittenDocument {
            document_id,
            chunk_ids,
            tags_written,
            replaced,
        })
    }

    async fn find_document_by_path(&self, path: &str) -> Result<Option<Document>> {
        let state = self.read()?;
        Ok(state.documents.values().find(|d| d.path == path).cloned())
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        Ok(self.read()?.documents.get(&id).cloned())
    }

    async fn get_chunk(&self, id: i64) -> Result<Option<Chunk>> {
        Ok(self.read()?.chunks.get(&id).cloned())
    }

    async fn list_chunks(&self, facets: Option<&[String]>) -> Result<Vec<Chunk>> {
        let state = self.read()?;
        let chunks = state
            .chunks
            .values()
            .filter(|c| match facets {
                None => true,
                Some(wanted) if wanted.is_empty() => true,
                Some(wanted) => state
                    .tags
                    .get(&c.id)
                    .is_some_and(|tags| wanted.iter().any(|f| tags.contains(f))),
            })
            .cloned()
            .collect();
        Ok(chunks)
    }

    async fn chunk_facets(&self, chunk_id: i64) -> Result<Vec<String>> {
        let state = self.read()?;
        Ok(state
            .tags
            .get(&chunk_id)
            .map(|tags| tags.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_evidence(&self, facet: Option<&str>) -> Result<Vec<Citation>> {
        let state = self.read()?;
        let mut evidence: Vec<Citation> = state
            .chunks
            .values()
            .filter(|c| match facet {
                None => true,
                Some(f) => state.tags.get(&c.id).is_some_and(|tags| tags.contains(f)),
            })
            .filter_map(|c| {
                state
                    .documents
                    .get(&c.document_id)
                    .map(|d| Citation::new(c, d))
            })
            .collect();
        evidence.sort_by(|a, b| {
            a.source_path
                .cmp(&b.source_path)
                .then(a.char_start.cmp(&b.char_start))
        });
        Ok(evidence)
    }

    async fn delete_document(&self, id: i64) -> Result<bool> {
        Ok(self.write()?.remove_document(id))
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let state = self.read()?;
        let mut per_facet: BTreeMap<String, i64> = BTreeMap::new();
        for tags in state.tags.values() {
            for facet in tags {
                *per_facet.entry(facet.clone()).or_insert(0) += 1;
            }
        }
        Ok(StoreCounts {
            documents: state.documents.len() as i64,
            chunks: state.chunks.len() as i64,
            tags: per_facet.values().sum(),
            facets: per_facet.into_iter().collect(),
        })
    }
}
