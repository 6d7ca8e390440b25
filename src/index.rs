//! Semantic index construction and retrieval.
//!
//! [`IndexBuilder::build`] always rebuilds from scratch: the collection's
//! previous rows are dropped, every text file in the working directory is
//! chunked and embedded, and the new rows are written under a fresh build id.
//! The returned [`SemanticIndex`] reads only rows of its own build, so a handle
//! that outlives a rebuild sees an empty collection rather than a different
//! document set.
//!
//! Raw PDF/DOCX files are not read directly; their text lives in the `.txt`
//! sibling written at upload time.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::{Config, RetrievalConfig};
use crate::embedding::{blob_to_vec, cosine_similarity, embed_one, vec_to_blob, Embedder};
use crate::error::PipelineError;
use crate::extract::DocumentKind;
use crate::generation::Generator;
use crate::models::{Chunk, RetrievedPassage};

/// A working-directory file read as text.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub file_name: String,
    pub text: String,
}

pub struct IndexBuilder {
    pool: SqlitePool,
    collection: String,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    max_tokens: usize,
    batch_size: usize,
    retrieval: RetrievalConfig,
}

impl IndexBuilder {
    pub fn new(
        pool: SqlitePool,
        config: &Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            pool,
            collection: config.index.collection.clone(),
            embedder,
            generator,
            max_tokens: config.chunking.max_tokens,
            batch_size: config.embedding.batch_size.max(1),
            retrieval: config.retrieval.clone(),
        }
    }

    /// Builds a new index over `dir`, replacing whatever the collection held.
    pub async fn build(&self, dir: &Path) -> Result<SemanticIndex, PipelineError> {
        let dir_owned: PathBuf = dir.to_path_buf();
        let documents = tokio::task::spawn_blocking(move || read_documents(&dir_owned))
            .await
            .map_err(PipelineError::index_build)?
            .map_err(|e| {
                PipelineError::index_build(format!("cannot read {}: {}", dir.display(), e))
            })?;
        if documents.is_empty() {
            return Err(PipelineError::index_build(format!(
                "no indexable documents in {}",
                dir.display()
            )));
        }

        self.drop_collection()
            .await
            .map_err(PipelineError::index_build)?;

        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|doc| chunk_text(&doc.file_name, &doc.text, self.max_tokens))
            .collect();
        if chunks.is_empty() {
            return Err(PipelineError::index_build(
                "uploaded documents contain no text to index",
            ));
        }

        let vectors = self
            .embed_chunks(&chunks)
            .await
            .map_err(PipelineError::index_build)?;

        let build_id = Uuid::new_v4().to_string();
        let files: Vec<String> = chunks
            .iter()
            .map(|c| c.file_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let created_at = Utc::now();

        self.write_collection(&build_id, &chunks, &vectors, files.len(), created_at)
            .await
            .map_err(PipelineError::index_build)?;

        tracing::info!(
            collection = %self.collection,
            build_id = %build_id,
            files = files.len(),
            chunks = chunks.len(),
            model = self.embedder.model_name(),
            "index built"
        );

        Ok(SemanticIndex {
            pool: self.pool.clone(),
            collection: self.collection.clone(),
            build_id,
            embedder: Arc::clone(&self.embedder),
            generator: Arc::clone(&self.generator),
            retrieval: self.retrieval.clone(),
            files,
            chunk_count: chunks.len(),
            created_at,
        })
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let inputs: Vec<String> = batch.iter().map(embedding_input).collect();
            let embedded = self.embedder.embed(&inputs).await?;
            if embedded.len() != batch.len() {
                anyhow::bail!(
                    "embedding backend returned {} vectors for {} inputs",
                    embedded.len(),
                    batch.len()
                );
            }
            if let Some(bad) = embedded.iter().find(|v| v.len() != self.embedder.dims()) {
                anyhow::bail!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.embedder.dims(),
                    bad.len()
                );
            }
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    async fn drop_collection(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks WHERE collection = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM collections WHERE name = ?")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn write_collection(
        &self,
        build_id: &str,
        chunks: &[Chunk],
        vectors: &[Vec<f32>],
        document_count: usize,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO collections (name, build_id, model, dims, document_count, chunk_count, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.collection)
        .bind(build_id)
        .bind(self.embedder.model_name())
        .bind(self.embedder.dims() as i64)
        .bind(document_count as i64)
        .bind(chunks.len() as i64)
        .bind(created_at.timestamp())
        .execute(&mut *tx)
        .await?;

        for (chunk, vector) in chunks.iter().zip(vectors) {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, collection, build_id, file_name, chunk_index, text, hash, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&self.collection)
            .bind(build_id)
            .bind(&chunk.file_name)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// The file name is embedded with the passage so questions naming a file match it.
fn embedding_input(chunk: &Chunk) -> String {
    format!("file_name: {}\n\n{}", chunk.file_name, chunk.text)
}

/// Reads every regular file directly inside `dir`, in name order. Binary
/// documents and non-UTF-8 files are skipped.
pub fn read_documents(dir: &Path) -> std::io::Result<Vec<SourceDocument>> {
    let mut documents = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(std::io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if DocumentKind::from_file_name(&file_name).is_some() {
            continue;
        }

        let bytes = std::fs::read(entry.path())?;
        match String::from_utf8(bytes) {
            Ok(text) => documents.push(SourceDocument { file_name, text }),
            Err(_) => {
                tracing::warn!(file = %file_name, "skipping file that is not UTF-8 text");
            }
        }
    }
    Ok(documents)
}

/// A built, queryable index over one working-set snapshot.
pub struct SemanticIndex {
    pool: SqlitePool,
    collection: String,
    build_id: String,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    retrieval: RetrievalConfig,
    files: Vec<String>,
    chunk_count: usize,
    created_at: DateTime<Utc>,
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex")
            .field("collection", &self.collection)
            .field("build_id", &self.build_id)
            .field("files", &self.files)
            .field("chunk_count", &self.chunk_count)
            .finish()
    }
}

impl SemanticIndex {
    pub fn build_id(&self) -> &str {
        &self.build_id
    }

    /// Working-directory files that contributed at least one passage.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Top passages for `question` by cosine similarity.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<RetrievedPassage>> {
        let query_vec = embed_one(self.embedder.as_ref(), question).await?;

        let rows = sqlx::query(
            r#"
            SELECT file_name, chunk_index, text, embedding
            FROM chunks
            WHERE collection = ? AND build_id = ?
            "#,
        )
        .bind(&self.collection)
        .bind(&self.build_id)
        .fetch_all(&self.pool)
        .await?;

        let mut passages: Vec<RetrievedPassage> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                RetrievedPassage {
                    file_name: row.get("file_name"),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    score: cosine_similarity(&query_vec, &blob_to_vec(&blob)),
                }
            })
            .filter(|p| self.retrieval.min_score.map_or(true, |min| p.score >= min))
            .collect();

        passages.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        passages.truncate(self.retrieval.top_k);
        Ok(passages)
    }

    /// Retrieves passages and synthesizes an answer. Returns an empty string
    /// when nothing relevant was retrieved.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let passages = self.retrieve(question).await?;
        if passages.is_empty() {
            return Ok(String::new());
        }
        tracing::debug!(
            build_id = %self.build_id,
            passages = passages.len(),
            top_score = passages[0].score,
            "retrieved passages"
        );
        self.generator.answer(question, &passages).await
    }
}
