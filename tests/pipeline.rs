//! End-to-end pipeline tests against the library API: ingestion into a
//! store, facet-filtered retrieval, and draft assembly.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use async_trait::async_trait;
use sred_harness::draft::{assemble, Category, MarkdownSectionRenderer};
use sred_harness::error::{Error, Result};
use sred_harness::ingest::{ingest_archive, IngestOptions};
use sred_harness::models::{Chunk, Citation, Document, NewDocument, StoreCounts, TaggedChunk};
use sred_harness::ontology::Ontology;
use sred_harness::retrieval::{search, SearchRequest};
use sred_harness::sqlite_store::SqliteStore;
use sred_harness::store::memory::InMemoryStore;
use sred_harness::store::{Store, WrittenDocument};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer
            .start_file(name.to_string(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn ontology() -> Ontology {
    Ontology::from_yaml_str(
        r#"
facets:
  Uncertainty:
    any: [unknown, unstable, failed]
  Investigation:
    any: [experiment, measured]
  Evidence:
    any: [logs, dataset]
"#,
    )
    .unwrap()
}

fn opts() -> IngestOptions {
    IngestOptions {
        project_id: "default".to_string(),
        chunk_size: 60,
        chunk_overlap: 10,
        extensions: vec!["md".to_string(), "txt".to_string()],
    }
}

fn corpus() -> Vec<u8> {
    build_zip(&[
        (
            "a.md",
            "The solver failed to converge. An experiment measured the residual error after each step.",
        ),
        (
            "b.md",
            "Residual error logs from the solver are stored with the dataset snapshot.",
        ),
        ("c.txt", "Meeting notes about office parking."),
        ("commits.json", "[]"),
    ])
}

async fn sqlite_store(tmp: &TempDir) -> SqliteStore {
    let pool = sred_harness::db::connect_path(&tmp.path().join("sred.sqlite"))
        .await
        .unwrap();
    sred_harness::migrate::apply_schema(&pool).await.unwrap();
    SqliteStore::new(pool)
}

async fn assert_filtering_law<S: Store + ?Sized>(store: &S) {
    for facet in ["Uncertainty", "Investigation", "Evidence"] {
        let facets = vec![facet.to_string()];
        let ranked = search(
            store,
            &SearchRequest {
                query: "residual error solver",
                facets: Some(facets.as_slice()),
                top_k: 10,
                max_candidates: None,
            },
        )
        .await
        .unwrap();
        for hit in ranked {
            let tags = store.chunk_facets(hit.chunk_id).await.unwrap();
            assert!(
                tags.iter().any(|t| t == facet),
                "chunk {} returned for {} but tagged {:?}",
                hit.chunk_id,
                facet,
                tags
            );
        }
    }
}

async fn assert_offsets_consistent<S: Store + ?Sized>(store: &S) {
    for chunk in store.list_chunks(None).await.unwrap() {
        let doc = store.get_document(chunk.document_id).await.unwrap().unwrap();
        chunk.validate_against(&doc).unwrap();
    }
}

#[tokio::test]
async fn test_memory_pipeline_properties() {
    let store = InMemoryStore::new();
    let report = ingest_archive(&store, &ontology(), &corpus(), &opts())
        .await
        .unwrap();
    assert_eq!(report.documents, 3);
    assert_eq!(report.skipped_entries, 1);

    assert_offsets_consistent(&store).await;
    assert_filtering_law(&store).await;
}

#[tokio::test]
async fn test_sqlite_pipeline_properties() {
    let tmp = TempDir::new().unwrap();
    let store = sqlite_store(&tmp).await;
    let report = ingest_archive(&store, &ontology(), &corpus(), &opts())
        .await
        .unwrap();
    assert_eq!(report.documents, 3);

    assert_offsets_consistent(&store).await;
    assert_filtering_law(&store).await;
}

#[tokio::test]
async fn test_memory_and_sqlite_rank_identically() {
    let tmp = TempDir::new().unwrap();
    let sqlite = sqlite_store(&tmp).await;
    let memory = InMemoryStore::new();
    ingest_archive(&sqlite, &ontology(), &corpus(), &opts())
        .await
        .unwrap();
    ingest_archive(&memory, &ontology(), &corpus(), &opts())
        .await
        .unwrap();

    let req = SearchRequest {
        query: "solver residual error",
        top_k: 5,
        ..Default::default()
    };
    let a = search(&sqlite, &req).await.unwrap();
    let b = search(&memory, &req).await.unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_candidate_cap_limits_ranking() {
    let store = InMemoryStore::new();
    ingest_archive(&store, &ontology(), &corpus(), &opts())
        .await
        .unwrap();
    let first = store.list_chunks(None).await.unwrap()[0].id;

    let ranked = search(
        &store,
        &SearchRequest {
            query: "solver",
            top_k: 10,
            max_candidates: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].chunk_id, first);
}

#[tokio::test]
async fn test_unknown_facet_yields_no_candidates() {
    let store = InMemoryStore::new();
    ingest_archive(&store, &ontology(), &corpus(), &opts())
        .await
        .unwrap();
    let facets = vec!["Nonexistent".to_string()];
    let ranked = search(
        &store,
        &SearchRequest {
            query: "solver",
            facets: Some(facets.as_slice()),
            top_k: 5,
            max_candidates: None,
        },
    )
    .await
    .unwrap();
    assert!(ranked.is_empty());
}

/// Delegating store that can hide chunks, corrupt chunk text, or fail.
struct FlakyStore {
    inner: InMemoryStore,
    hidden: HashSet<i64>,
    corrupt: HashSet<i64>,
    unavailable: bool,
}

impl FlakyStore {
    fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            hidden: HashSet::new(),
            corrupt: HashSet::new(),
            unavailable: false,
        }
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn write_document(
        &self,
        doc: &NewDocument,
        chunks: &[TaggedChunk],
    ) -> Result<WrittenDocument> {
        self.inner.write_document(doc, chunks).await
    }

    async fn find_document_by_path(&self, path: &str) -> Result<Option<Document>> {
        self.inner.find_document_by_path(path).await
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        self.inner.get_document(id).await
    }

    async fn get_chunk(&self, id: i64) -> Result<Option<Chunk>> {
        if self.hidden.contains(&id) {
            return Ok(None);
        }
        let chunk = self.inner.get_chunk(id).await?;
        Ok(chunk.map(|mut c| {
            if self.corrupt.contains(&id) {
                c.text.push('!');
            }
            c
        }))
    }

    async fn list_chunks(&self, facets: Option<&[String]>) -> Result<Vec<Chunk>> {
        if self.unavailable {
            return Err(Error::Store("database is locked".to_string()));
        }
        self.inner.list_chunks(facets).await
    }

    async fn chunk_facets(&self, chunk_id: i64) -> Result<Vec<String>> {
        self.inner.chunk_facets(chunk_id).await
    }

    async fn list_evidence(&self, facet: Option<&str>) -> Result<Vec<Citation>> {
        self.inner.list_evidence(facet).await
    }

    async fn delete_document(&self, id: i64) -> Result<bool> {
        self.inner.delete_document(id).await
    }

    async fn counts(&self) -> Result<StoreCounts> {
        self.inner.counts().await
    }
}

fn whole(text: &str) -> TaggedChunk {
    TaggedChunk {
        start: 0,
        end: text.chars().count() as i64,
        text: text.to_string(),
        facets: Default::default(),
    }
}

async fn two_doc_store() -> (FlakyStore, i64, i64) {
    let inner = InMemoryStore::new();
    let mut ids = Vec::new();
    for (path, text) in [("a.md", "the run failed"), ("b.md", "the run failed again")] {
        let written = inner
            .write_document(
                &NewDocument {
                    project_id: "default".to_string(),
                    path: path.to_string(),
                    text: text.to_string(),
                    content_hash: String::new(),
                    ingested_at: 0,
                },
                &[whole(text)],
            )
            .await
            .unwrap();
        ids.push(written.chunk_ids[0]);
    }
    (FlakyStore::new(inner), ids[0], ids[1])
}

fn uncertainty() -> Vec<Category> {
    vec![Category {
        label: "Uncertainty".to_string(),
        query: "failed".to_string(),
    }]
}

#[tokio::test]
async fn test_draft_skips_unresolvable_chunks() {
    let (mut store, hidden, kept) = two_doc_store().await;
    store.hidden.insert(hidden);

    let draft = assemble(&store, &uncertainty(), 3, &MarkdownSectionRenderer, false)
        .await
        .unwrap();
    assert_eq!(draft.sections.len(), 1);
    let cited: Vec<i64> = draft.citations.iter().map(|c| c.chunk_id).collect();
    assert_eq!(cited, vec![kept]);
}

#[tokio::test]
async fn test_draft_rejects_inconsistent_offsets() {
    let (mut store, corrupt, _) = two_doc_store().await;
    store.corrupt.insert(corrupt);

    let err = assemble(&store, &uncertainty(), 3, &MarkdownSectionRenderer, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_unavailable_store_is_not_an_empty_result() {
    let (mut store, _, _) = two_doc_store().await;
    store.unavailable = true;

    let err = search(
        &store,
        &SearchRequest {
            query: "failed",
            top_k: 3,
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Store(_)));
}

#[tokio::test]
async fn test_draft_after_document_deleted() {
    let (store, _, _) = two_doc_store().await;
    let doc = store.find_document_by_path("a.md").await.unwrap().unwrap();
    assert!(store.delete_document(doc.id).await.unwrap());

    let draft = assemble(&store, &uncertainty(), 3, &MarkdownSectionRenderer, false)
        .await
        .unwrap();
    let paths: Vec<&str> = draft
        .citations
        .iter()
        .map(|c| c.source_path.as_str())
        .collect();
    assert_eq!(paths, vec!["b.md"]);
}
