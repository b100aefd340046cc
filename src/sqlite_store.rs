//! SQLite-backed [`Store`] implementation.
//!
//! Wraps a [`SqlitePool`] and translates every `Store` method into SQL
//! against the schema created by [`crate::migrate`] (documents, chunks,
//! tags). Document writes run inside a single transaction.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::error::Result;
use crate::migrate::apply_schema;
use crate::models::{Chunk, Citation, Document, NewDocument, StoreCounts, TaggedChunk};
use crate::store::{Store, WrittenDocument};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database, creating the schema if needed.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn document_from_row(row: &SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        project_id: row.get("project_id"),
        path: row.get("path"),
        text: row.get("text"),
        content_hash: row.get("content_hash"),
        ingested_at: row.get("ingested_at"),
    }
}

fn chunk_from_row(row: &SqliteRow) -> Chunk {
    Chunk {
        id: row.get("id"),
        document_id: row.get("document_id"),
        start: row.get("char_start"),
        end: row.get("char_end"),
        text: row.get("text"),
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[async_trait]
impl Store for SqliteStore {
    async fn write_document(
        &self,
        doc: &NewDocument,
        chunks: &[TaggedChunk],
    ) -> Result<WrittenDocument> {
        let mut tx = self.pool.begin().await?;

        // Chunks and tags of the old document go with it (ON DELETE CASCADE).
        let deleted = sqlx::query("DELETE FROM documents WHERE path = ?")
            .bind(&doc.path)
            .execute(&mut *tx)
            .await?;

        let document_id = sqlx::query(
            r#"
            INSERT INTO documents (project_id, path, text, content_hash, ingested_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.project_id)
        .bind(&doc.path)
        .bind(&doc.text)
        .bind(&doc.content_hash)
        .bind(doc.ingested_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let mut chunk_ids = Vec::with_capacity(chunks.len());
        let mut tags_written = 0;
        for chunk in chunks {
            let chunk_id = sqlx::query(
                "INSERT INTO chunks (document_id, char_start, char_end, text) VALUES (?, ?, ?, ?)",
            )
            .bind(document_id)
            .bind(chunk.start)
            .bind(chunk.end)
            .bind(&chunk.text)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            for facet in &chunk.facets {
                let result =
                    sqlx::query("INSERT OR IGNORE INTO tags (chunk_id, facet) VALUES (?, ?)")
                        .bind(chunk_id)
                        .bind(facet)
                        .execute(&mut *tx)
                        .await?;
                tags_written += result.rows_affected() as usize;
            }

            chunk_ids.push(chunk_id);
        }

        tx.commit().await?;

        Ok(WrittenDocument {
            document_id,
            chunk_ids,
            tags_written,
            replaced: deleted.rows_affected() > 0,
        })
    }

    async fn find_document_by_path(&self, path: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, project_id, path, text, content_hash, ingested_at FROM documents WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(document_from_row))
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, project_id, path, text, content_hash, ingested_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(document_from_row))
    }

    async fn get_chunk(&self, id: i64) -> Result<Option<Chunk>> {
        let row = sqlx::query(
            "SELECT id, document_id, char_start, char_end, text FROM chunks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(chunk_from_row))
    }

    async fn list_chunks(&self, facets: Option<&[String]>) -> Result<Vec<Chunk>> {
        let rows = match facets {
            Some(facets) if !facets.is_empty() => {
                let sql = format!(
                    r#"
                    SELECT id, document_id, char_start, char_end, text
                    FROM chunks
                    WHERE id IN (SELECT chunk_id FROM tags WHERE facet IN ({}))
                    ORDER BY id
                    "#,
                    placeholders(facets.len())
                );
                let mut query = sqlx::query(&sql);
                for facet in facets {
                    query = query.bind(facet);
                }
                query.fetch_all(&self.pool).await?
            }
            _ => {
                sqlx::query(
                    "SELECT id, document_id, char_start, char_end, text FROM chunks ORDER BY id",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.iter().map(chunk_from_row).collect())
    }

    async fn chunk_facets(&self, chunk_id: i64) -> Result<Vec<String>> {
        let facets = sqlx::query_scalar("SELECT facet FROM tags WHERE chunk_id = ? ORDER BY facet")
            .bind(chunk_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(facets)
    }

    async fn list_evidence(&self, facet: Option<&str>) -> Result<Vec<Citation>> {
        let rows = match facet {
            Some(facet) => {
                sqlx::query(
                    r#"
                    SELECT c.id, c.char_start, c.char_end, c.text, d.path
                    FROM chunks c
                    JOIN documents d ON d.id = c.document_id
                    JOIN tags t ON t.chunk_id = c.id
                    WHERE t.facet = ?
                    ORDER BY d.path, c.char_start
                    "#,
                )
                .bind(facet)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT c.id, c.char_start, c.char_end, c.text, d.path
                    FROM chunks c
                    JOIN documents d ON d.id = c.document_id
                    ORDER BY d.path, c.char_start
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .iter()
            .map(|row| Citation {
                chunk_id: row.get("id"),
                source_path: row.get("path"),
                char_start: row.get("char_start"),
                char_end: row.get("char_end"),
                text: row.get("text"),
            })
            .collect())
    }

    async fn delete_document(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        let chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let tags: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(&self.pool)
            .await?;

        let facet_rows =
            sqlx::query("SELECT facet, COUNT(*) AS n FROM tags GROUP BY facet ORDER BY facet")
                .fetch_all(&self.pool)
                .await?;
        let facets = facet_rows
            .iter()
            .map(|row| (row.get("facet"), row.get("n")))
            .collect();

        Ok(StoreCounts {
            documents,
            chunks,
            tags,
            facets,
        })
    }
}
