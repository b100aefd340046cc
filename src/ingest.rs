//! Archive ingestion pipeline.
//!
//! Coordinates the full ingestion flow: zip archive → text entries →
//! chunking → tagging → storage.
//!
//! - Only entries whose extension is listed in `ingest.extensions` are
//!   ingested (case-insensitive). Other entries such as `commits.json` and
//!   directories are skipped without error.
//! - The whole archive is read and decoded before anything is written, so
//!   a corrupt archive or a non-UTF-8 text entry fails with
//!   [`Error::Archive`] and leaves the store untouched.
//! - Each document is written with its chunks and tags in one
//!   [`Store::write_document`] call, which is atomic.
//! - Re-ingesting a path is a no-op when its [`fingerprint`] is unchanged.
//!   The fingerprint covers the text and everything that shapes its chunks
//!   and tags, so an ontology edit re-tags identical text. Any other
//!   re-ingest replaces the previous document, chunks, and tags.

use std::io::{Cursor, Read};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{NewDocument, TaggedChunk};
use crate::ontology::Ontology;
use crate::sqlite_store::SqliteStore;
use crate::store::Store;
use crate::tagger::tag;

/// Knobs for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub project_id: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Lower-case extensions without the leading dot.
    pub extensions: Vec<String>,
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            project_id: config.ingest.project_id.clone(),
            chunk_size: config.chunking.size,
            chunk_overlap: config.chunking.overlap,
            extensions: config
                .ingest
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Suffix match on the entry name, so `.md` and `notes/.txt` count.
    fn accepts(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.extensions.iter().any(|ext| {
            name.strip_suffix(ext.as_str())
                .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

/// Counts reported after an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Text entries found in the archive (written or unchanged).
    pub documents: usize,
    /// Chunks written.
    pub chunks: usize,
    /// Tags written.
    pub tags: usize,
    /// Documents whose path already held identical content.
    pub unchanged: usize,
    /// Documents that replaced an earlier version at the same path.
    pub replaced: usize,
    /// Archive entries ignored because of their extension.
    pub skipped_entries: usize,
}

/// A decoded text entry from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub text: String,
}

/// Read the text entries of a zip archive held in memory.
///
/// Returns the accepted entries in archive order and the number of entries
/// skipped for their extension.
pub fn read_archive(bytes: &[u8], opts: &IngestOptions) -> Result<(Vec<ArchiveEntry>, usize)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::new();
    let mut skipped = 0;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        if !opts.accepts(&name) {
            debug!(entry = %name, "ignoring archive entry");
            skipped += 1;
            continue;
        }

        let mut raw = Vec::new();
        file.read_to_end(&mut raw)
            .map_err(|e| Error::Archive(format!("failed to read {}: {}", name, e)))?;
        let text = String::from_utf8(raw)
            .map_err(|_| Error::Archive(format!("{} is not valid UTF-8", name)))?;
        entries.push(ArchiveEntry { path: name, text });
    }

    Ok((entries, skipped))
}

/// Chunk and tag one document's text.
pub fn prepare_chunks(
    text: &str,
    ontology: &Ontology,
    opts: &IngestOptions,
) -> Result<Vec<TaggedChunk>> {
    let spans = chunk_text(text, opts.chunk_size, opts.chunk_overlap)?;
    Ok(spans
        .map(|span| TaggedChunk {
            start: span.start as i64,
            end: span.end as i64,
            text: span.text.to_string(),
            facets: tag(span.text, ontology),
        })
        .collect())
}

/// SHA-256 hex fingerprint of a document as it would be ingested.
///
/// Hashes the project id, chunk size and overlap, each facet with its
/// keywords in order, and finally the text. Fields are length-prefixed so
/// adjacent values cannot run together.
pub fn fingerprint(text: &str, ontology: &Ontology, opts: &IngestOptions) -> String {
    let mut hasher = Sha256::new();
    let mut field = |bytes: &[u8]| {
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    };

    field(opts.project_id.as_bytes());
    field(&(opts.chunk_size as u64).to_le_bytes()[..]);
    field(&(opts.chunk_overlap as u64).to_le_bytes()[..]);
    for (facet, keywords) in ontology.iter() {
        field(facet.as_bytes());
        field(&(keywords.len() as u64).to_le_bytes()[..]);
        for keyword in keywords {
            field(keyword.as_bytes());
        }
    }
    field(text.as_bytes());

    format!("{:x}", hasher.finalize())
}

/// Ingest every text entry of a zip archive into `store`.
pub async fn ingest_archive<S: Store + ?Sized>(
    store: &S,
    ontology: &Ontology,
    bytes: &[u8],
    opts: &IngestOptions,
) -> Result<IngestReport> {
    let (entries, skipped) = read_archive(bytes, opts)?;
    let mut report = IngestReport {
        skipped_entries: skipped,
        ..Default::default()
    };

    for entry in &entries {
        report.documents += 1;
        let hash = fingerprint(&entry.text, ontology, opts);

        if let Some(existing) = store.find_document_by_path(&entry.path).await? {
            if existing.content_hash == hash {
                debug!(path = %entry.path, "fingerprint unchanged, skipping");
                report.unchanged += 1;
                continue;
            }
        }

        let chunks = prepare_chunks(&entry.text, ontology, opts)?;
        let doc = NewDocument {
            project_id: opts.project_id.clone(),
            path: entry.path.clone(),
            text: entry.text.clone(),
            content_hash: hash,
            ingested_at: chrono::Utc::now().timestamp(),
        };
        let written = store.write_document(&doc, &chunks).await?;

        debug!(
            path = %entry.path,
            document_id = written.document_id,
            chunks = written.chunk_ids.len(),
            tags = written.tags_written,
            "document written"
        );
        report.chunks += written.chunk_ids.len();
        report.tags += written.tags_written;
        if written.replaced {
            report.replaced += 1;
        }
    }

    info!(
        documents = report.documents,
        chunks = report.chunks,
        unchanged = report.unchanged,
        skipped = report.skipped_entries,
        "archive ingested"
    );
    Ok(report)
}

/// Load the ontology named in `config` and ingest `bytes` into SQLite.
pub async fn ingest_bytes(
    config: &Config,
    bytes: &[u8],
    project_id: Option<&str>,
) -> Result<IngestReport> {
    let ontology = Ontology::load(&config.ontology.path)?;
    let mut opts = IngestOptions::from_config(config);
    if let Some(project) = project_id {
        opts.project_id = project.to_string();
    }

    let store = SqliteStore::open(config).await?;
    let result = ingest_archive(&store, &ontology, bytes, &opts).await;
    store.close().await;
    result
}

/// CLI entry point for `sred ingest <zip>`.
pub async fn run_ingest(
    config: &Config,
    archive: &Path,
    project_id: Option<&str>,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(archive)
        .map_err(|e| Error::Archive(format!("failed to read {}: {}", archive.display(), e)))?;
    let report = ingest_bytes(config, &bytes, project_id).await?;

    println!("ingest {}", archive.display());
    println!("  documents: {}", report.documents);
    println!("  chunks written: {}", report.chunks);
    println!("  tags written: {}", report.tags);
    println!("  unchanged: {}", report.unchanged);
    println!("  replaced: {}", report.replaced);
    println!("  ignored entries: {}", report.skipped_entries);
    println!("ok");
    Ok(())
}
