//! TOML configuration parsing and validation.
//!
//! Only `[db]` is required. Every other section falls back to defaults
//! matching the reference deployment: 1000-character chunks with a
//! 150-character overlap, `.md`/`.txt` archive entries, and the four
//! standard draft categories with three citations each.
//!
//! ```toml
//! [db]
//! path = "./data/sred.sqlite"
//!
//! [ontology]
//! path = "./config/ontology.yaml"
//!
//! [chunking]
//! size = 1000
//! overlap = 150
//! ```

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ontology: OntologyConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub draft: DraftConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ip_scout: IpScoutConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OntologyConfig {
    #[serde(default = "default_ontology_path")]
    pub path: PathBuf,
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            path: default_ontology_path(),
        }
    }
}

fn default_ontology_path() -> PathBuf {
    PathBuf::from("./config/ontology.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: default_chunk_size(),
            overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    150
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_project_id")]
    pub project_id: String,
    /// File extensions (without the dot) treated as text evidence.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            extensions: default_extensions(),
        }
    }
}

fn default_project_id() -> String {
    "default".to_string()
}
fn default_extensions() -> Vec<String> {
    vec!["md".to_string(), "txt".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    /// Upper bound on the candidate set of one retrieval call.
    #[serde(default)]
    pub max_candidates: Option<usize>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_candidates: None,
        }
    }
}

fn default_top_k() -> i64 {
    5
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CategoryConfig {
    pub label: String,
    pub query: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DraftConfig {
    #[serde(default = "default_draft_top_k")]
    pub top_k: i64,
    #[serde(default)]
    pub dedup_citations: bool,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            top_k: default_draft_top_k(),
            dedup_citations: false,
            categories: default_categories(),
        }
    }
}

fn default_draft_top_k() -> i64 {
    3
}

/// The standard SR&ED draft sections and their canned queries.
pub fn default_categories() -> Vec<CategoryConfig> {
    [
        ("Advancement", "novel architecture OR improve accuracy"),
        ("Uncertainty", "unknown OR unstable OR failed"),
        (
            "Systematic Investigation",
            "hypothesis OR experiment OR measured",
        ),
        ("Evidence", "logs OR dataset OR appendix"),
    ]
    .into_iter()
    .map(|(label, query)| CategoryConfig {
        label: label.to_string(),
        query: query.to_string(),
    })
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct IpScoutConfig {
    /// CSV file with `number` and `abstract` columns.
    #[serde(default = "default_patents_path")]
    pub patents_path: PathBuf,
    #[serde(default = "default_ip_scout_top_k")]
    pub top_k: i64,
}

impl Default for IpScoutConfig {
    fn default() -> Self {
        Self {
            patents_path: default_patents_path(),
            top_k: default_ip_scout_top_k(),
        }
    }
}

fn default_patents_path() -> PathBuf {
    PathBuf::from("./config/seed_patents.csv")
}
fn default_ip_scout_top_k() -> i64 {
    3
}

/// Read and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content)
        .map_err(|e| Error::Config(format!("failed to parse config file: {}", e)))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.size == 0 {
        return Err(Error::Config("chunking.size must be > 0".to_string()));
    }
    if config.chunking.overlap >= config.chunking.size {
        return Err(Error::Config(format!(
            "chunking.overlap ({}) must be smaller than chunking.size ({})",
            config.chunking.overlap, config.chunking.size
        )));
    }

    if config.ingest.extensions.is_empty() {
        return Err(Error::Config(
            "ingest.extensions must list at least one extension".to_string(),
        ));
    }

    if config.retrieval.top_k < 1 {
        return Err(Error::Config("retrieval.top_k must be >= 1".to_string()));
    }
    if config.retrieval.max_candidates == Some(0) {
        return Err(Error::Config(
            "retrieval.max_candidates must be > 0 when set".to_string(),
        ));
    }

    if config.draft.top_k < 1 {
        return Err(Error::Config("draft.top_k must be >= 1".to_string()));
    }
    if config.ip_scout.top_k < 1 {
        return Err(Error::Config("ip_scout.top_k must be >= 1".to_string()));
    }

    let mut labels = HashSet::new();
    for category in &config.draft.categories {
        if category.label.trim().is_empty() {
            return Err(Error::Config(
                "draft.categories labels must not be empty".to_string(),
            ));
        }
        if !labels.insert(category.label.as_str()) {
            return Err(Error::Config(format!(
                "duplicate draft category label: '{}'",
                category.label
            )));
        }
    }

    Ok(())
}
