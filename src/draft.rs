//! Draft assembly: category queries → ranked chunks → labelled sections.
//!
//! For each category, in order, the assembler runs a full-corpus
//! [`search`](crate::retrieval::search) with the category's canned query,
//! resolves every hit to its chunk and document, renders the section body
//! through a [`SectionRenderer`], and appends the resolved records to one
//! flat citation list.
//!
//! - A chunk or document that cannot be resolved (deleted between retrieval
//!   and resolution) is skipped. The draft is still produced.
//! - A resolved chunk whose offsets do not reproduce its text from the
//!   document fails the whole assembly with [`Error::Validation`].
//! - Citations keep duplicates (a chunk cited by two categories appears
//!   twice) unless `dedup` is set, which keeps each chunk's first citation.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::config::{CategoryConfig, Config};
use crate::error::{Error, Result};
use crate::models::Citation;
use crate::retrieval::{search, SearchRequest};
use crate::sqlite_store::SqliteStore;
use crate::store::Store;

/// One named draft category and the query that gathers its evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub label: String,
    pub query: String,
}

impl From<&CategoryConfig> for Category {
    fn from(c: &CategoryConfig) -> Self {
        Self {
            label: c.label.clone(),
            query: c.query.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub section: String,
    pub text: String,
}

/// Assembled sections plus the flat citation list behind them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draft {
    pub sections: Vec<Section>,
    pub citations: Vec<Citation>,
}

/// Turns a section label and its resolved citations into section text.
pub trait SectionRenderer: Send + Sync {
    fn render_section(&self, label: &str, citations: &[Citation]) -> String;
}

/// Renders each citation as a quoted snippet with its source location.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownSectionRenderer;

impl SectionRenderer for MarkdownSectionRenderer {
    fn render_section(&self, label: &str, citations: &[Citation]) -> String {
        if citations.is_empty() {
            return format!("No supporting evidence found for {}.", label);
        }

        let mut out = format!("Evidence supporting {}:\n", label);
        for c in citations {
            out.push_str(&format!(
                "\n> {}\n> ({}:{}-{})\n",
                snippet(&c.text),
                c.source_path,
                c.char_start,
                c.char_end
            ));
        }
        out
    }
}

/// Collapse whitespace so multi-line chunks fit on one quoted line.
fn snippet(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build a draft from `categories` against `store`.
pub async fn assemble<S: Store + ?Sized>(
    store: &S,
    categories: &[Category],
    top_k: i64,
    renderer: &dyn SectionRenderer,
    dedup: bool,
) -> Result<Draft> {
    let mut sections = Vec::with_capacity(categories.len());
    let mut citations = Vec::new();
    let mut cited = HashSet::new();

    for category in categories {
        let hits = search(
            store,
            &SearchRequest {
                query: &category.query,
                facets: None,
                top_k,
                max_candidates: None,
            },
        )
        .await?;

        let mut resolved = Vec::with_capacity(hits.len());
        for hit in hits {
            match resolve(store, hit.chunk_id).await {
                Ok(citation) => resolved.push(citation),
                Err(Error::NotFound { kind, id }) => {
                    debug!(section = %category.label, kind, id, "skipping unresolved citation");
                }
                Err(e) => return Err(e),
            }
        }

        sections.push(Section {
            section: category.label.clone(),
            text: renderer.render_section(&category.label, &resolved),
        });

        for citation in resolved {
            if dedup && !cited.insert(citation.chunk_id) {
                continue;
            }
            citations.push(citation);
        }
    }

    Ok(Draft {
        sections,
        citations,
    })
}

/// Resolve a chunk id to a citation, checking offset integrity.
async fn resolve<S: Store + ?Sized>(store: &S, chunk_id: i64) -> Result<Citation> {
    let chunk = store.get_chunk(chunk_id).await?.ok_or(Error::NotFound {
        kind: "chunk",
        id: chunk_id,
    })?;
    let document = store
        .get_document(chunk.document_id)
        .await?
        .ok_or(Error::NotFound {
            kind: "document",
            id: chunk.document_id,
        })?;
    chunk.validate_against(&document)?;
    Ok(Citation::new(&chunk, &document))
}

/// Assemble the configured draft from the SQLite store.
pub async fn generate_draft(config: &Config) -> Result<Draft> {
    let categories: Vec<Category> = config.draft.categories.iter().map(Category::from).collect();
    let store = SqliteStore::open(config).await?;
    let draft = assemble(
        &store,
        &categories,
        config.draft.top_k,
        &MarkdownSectionRenderer,
        config.draft.dedup_citations,
    )
    .await;
    store.close().await;
    draft
}

/// CLI entry point for `sred draft`.
pub async fn run_draft(config: &Config, json: bool) -> anyhow::Result<()> {
    let draft = generate_draft(config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&draft)?);
        return Ok(());
    }

    for section in &draft.sections {
        println!("== {} ==", section.section);
        println!("{}", section.text);
        println!();
    }
    println!("citations: {}", draft.citations.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewDocument, TaggedChunk};
    use crate::store::memory::InMemoryStore;

    fn new_doc(path: &str, text: &str) -> NewDocument {
        NewDocument {
            project_id: "default".to_string(),
            path: path.to_string(),
            text: text.to_string(),
            content_hash: String::new(),
            ingested_at: 0,
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

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        for (path, text) in [
            ("a.md", "the experiment failed twice"),
            ("b.md", "training logs and dataset"),
            ("c.md", "lunch menu"),
        ] {
            store
                .write_document(&new_doc(path, text), &[whole(text)])
                .await
                .unwrap();
        }
        store
    }

    fn categories() -> Vec<Category> {
        vec![
            Category {
                label: "Uncertainty".to_string(),
                query: "failed".to_string(),
            },
            Category {
                label: "Systematic Investigation".to_string(),
                query: "experiment".to_string(),
            },
            Category {
                label: "Advancement".to_string(),
                query: "quantum".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_sections_follow_category_order() {
        let store = seeded().await;
        let draft = assemble(&store, &categories(), 3, &MarkdownSectionRenderer, false)
            .await
            .unwrap();

        let labels: Vec<&str> = draft.sections.iter().map(|s| s.section.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Uncertainty", "Systematic Investigation", "Advancement"]
        );
        assert!(draft.sections[0].text.contains("a.md:0-27"));
        assert!(draft.sections[2].text.starts_with("No supporting evidence"));
    }

    #[tokio::test]
    async fn test_duplicate_citations_kept_by_default() {
        let store = seeded().await;
        let draft = assemble(&store, &categories(), 3, &MarkdownSectionRenderer, false)
            .await
            .unwrap();
        let paths: Vec<&str> = draft
            .citations
            .iter()
            .map(|c| c.source_path.as_str())
            .collect();
        assert_eq!(paths, vec!["a.md", "a.md"]);
    }

    #[tokio::test]
    async fn test_dedup_keeps_first_citation() {
        let store = seeded().await;
        let draft = assemble(&store, &categories(), 3, &MarkdownSectionRenderer, true)
            .await
            .unwrap();
        assert_eq!(draft.citations.len(), 1);
        // Section text is unaffected by citation de-duplication.
        assert!(draft.sections[1].text.contains("a.md"));
    }

    #[test]
    fn test_snippet_collapses_whitespace() {
        assert_eq!(snippet("  one\n two\t\tthree "), "one two three");
    }
}
