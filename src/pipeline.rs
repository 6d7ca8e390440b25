//! Upload-to-index cycle.
//!
//! One cycle: clear the working directory, drop the current index, persist
//! the batch, build a new index, install it. Cycles are serialized by a
//! single mutex; queries never take it and see either the previous index,
//! no index, or the new one.
//!
//! A cycle runs on its own task holding the mutex guard. Dropping the
//! caller's future does not stop it, so the next cycle always starts from a
//! finished one.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{PipelineError, Result};
use crate::index::IndexBuilder;
use crate::models::{IngestReport, UploadFile, UploadedDocument};
use crate::session::SessionState;
use crate::store::FileStore;

pub struct IngestionPipeline {
    cycle: Arc<Cycle>,
    lock: Arc<Mutex<()>>,
}

struct Cycle {
    store: FileStore,
    builder: IndexBuilder,
    session: Arc<SessionState>,
    build_timeout: Duration,
}

impl IngestionPipeline {
    pub fn new(
        store: FileStore,
        builder: IndexBuilder,
        session: Arc<SessionState>,
        build_timeout: Duration,
    ) -> Self {
        Self {
            cycle: Arc::new(Cycle {
                store,
                builder,
                session,
                build_timeout,
            }),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Replaces the working set with `files` and rebuilds the index.
    ///
    /// An empty batch changes nothing. Otherwise the previous index is gone
    /// as soon as the directory has been cleared, and stays gone if any later
    /// step fails.
    pub async fn ingest(&self, files: Vec<UploadFile>) -> Result<IngestReport> {
        if files.is_empty() {
            tracing::info!("empty upload batch; keeping current index");
            return Ok(IngestReport::empty());
        }

        let guard = Arc::clone(&self.lock).lock_owned().await;
        let cycle = Arc::clone(&self.cycle);
        tokio::spawn(async move { cycle.run(files, guard).await })
            .await
            .map_err(|e| PipelineError::index_build(format!("ingestion task failed: {}", e)))?
    }
}

impl Cycle {
    async fn run(
        &self,
        files: Vec<UploadFile>,
        _guard: OwnedMutexGuard<()>,
    ) -> Result<IngestReport> {
        let started = Instant::now();

        let store = self.store.clone();
        let removed = tokio::task::spawn_blocking(move || store.clear())
            .await
            .map_err(|e| PipelineError::io("clear task failed", std::io::Error::other(e)))??;

        if self.session.invalidate().await {
            tracing::info!("previous index invalidated");
        }
        tracing::debug!(removed, "working directory cleared");

        let store = self.store.clone();
        let saved = tokio::task::spawn_blocking(move || save_all(&store, files))
            .await
            .map_err(|e| PipelineError::io("save task failed", std::io::Error::other(e)))??;

        let index = tokio::time::timeout(self.build_timeout, self.builder.build(self.store.root()))
            .await
            .map_err(|_| {
                PipelineError::index_build(format!(
                    "timed out after {}s",
                    self.build_timeout.as_secs()
                ))
            })??;

        let report = IngestReport {
            documents: saved.len(),
            derived_texts: saved.iter().filter(|d| d.derived_text.is_some()).count(),
            indexed_files: index.files().len(),
            chunks: index.chunk_count(),
            files: saved.into_iter().map(|d| d.name).collect(),
            build_id: Some(index.build_id().to_string()),
            indexed_at: Some(index.created_at()),
        };

        self.session.install(index).await;
        tracing::info!(
            documents = report.documents,
            indexed_files = report.indexed_files,
            chunks = report.chunks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ingestion complete"
        );
        Ok(report)
    }
}

/// Saves in batch order and stops at the first failure.
fn save_all(store: &FileStore, files: Vec<UploadFile>) -> Result<Vec<UploadedDocument>> {
    let mut saved = Vec::with_capacity(files.len());
    for file in files {
        saved.push(store.save(&file.name, &file.content)?);
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::embedding::HashEmbedder;
    use crate::generation::ExtractiveGenerator;
    use crate::store::encode_data_url;
    use tempfile::TempDir;

    async fn index_builder(tmp: &TempDir) -> IndexBuilder {
        let pool = crate::db::connect(&tmp.path().join("idx.sqlite"))
            .await
            .unwrap();
        crate::migrate::run_migrations(&pool).await.unwrap();
        IndexBuilder::new(
            pool,
            &Config::default(),
            Arc::new(HashEmbedder::new(256)),
            Arc::new(ExtractiveGenerator),
        )
    }

    #[tokio::test]
    async fn failed_clear_keeps_current_index() {
        let tmp = TempDir::new().unwrap();
        let builder = index_builder(&tmp).await;

        let seed_dir = tmp.path().join("seed");
        std::fs::create_dir(&seed_dir).unwrap();
        std::fs::write(seed_dir.join("a.txt"), "hello").unwrap();
        let session = Arc::new(SessionState::new());
        let installed = session.install(builder.build(&seed_dir).await.unwrap()).await;

        // A regular file where the working directory should be.
        let blocked = tmp.path().join("not-a-dir");
        std::fs::write(&blocked, "x").unwrap();
        let pipeline = IngestionPipeline::new(
            FileStore::new(&blocked),
            builder,
            Arc::clone(&session),
            Duration::from_secs(30),
        );

        let err = pipeline
            .ingest(vec![UploadFile::new(
                "b.txt",
                encode_data_url("text/plain", b"bye"),
            )])
            .await
            .unwrap_err();
        assert_eq!(err.code(), "io_failure");

        let current = session.current().await.unwrap();
        assert_eq!(current.build_id(), installed.build_id());
    }

    #[tokio::test]
    async fn report_carries_index_timestamp() {
        let tmp = TempDir::new().unwrap();
        let session = Arc::new(SessionState::new());
        let pipeline = IngestionPipeline::new(
            FileStore::new(tmp.path().join("uploads")),
            index_builder(&tmp).await,
            Arc::clone(&session),
            Duration::from_secs(30),
        );

        let report = pipeline
            .ingest(vec![UploadFile::new(
                "a.txt",
                encode_data_url("text/plain", b"hello"),
            )])
            .await
            .unwrap();
        let current = session.current().await.unwrap();
        assert_eq!(report.indexed_at, Some(current.created_at()));
        assert_eq!(report.build_id.as_deref(), Some(current.build_id()));
    }
}
