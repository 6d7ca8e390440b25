//! Wiring of the working directory, vector store, providers and session into
//! one shared handle used by both the HTTP server and the CLI.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::{PipelineError, Result};
use crate::generation::{create_generator, Generator};
use crate::index::IndexBuilder;
use crate::models::{Answer, IngestReport, UploadFile};
use crate::pipeline::IngestionPipeline;
use crate::query::QueryResolver;
use crate::session::SessionState;
use crate::store::FileStore;

pub struct DocumentQa {
    pipeline: IngestionPipeline,
    resolver: QueryResolver,
    session: Arc<SessionState>,
}

impl DocumentQa {
    /// Builds the providers named in `config`. Missing credentials and unknown
    /// providers fail here rather than on the first upload.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let generator = create_generator(&config.generation)?;
        Self::with_providers(config, embedder, generator).await
    }

    pub async fn with_providers(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Result<Self> {
        let store = FileStore::new(&config.workspace.upload_dir);
        store.ensure_root()?;

        let pool = crate::db::connect(&config.index.db_path)
            .await
            .map_err(|e| PipelineError::configuration(format!("{:#}", e)))?;
        crate::migrate::run_migrations(&pool)
            .await
            .map_err(|e| PipelineError::configuration(format!("{:#}", e)))?;

        tracing::info!(
            upload_dir = %config.workspace.upload_dir.display(),
            db = %config.index.db_path.display(),
            embedder = embedder.model_name(),
            generator = generator.model_name(),
            "document QA service ready"
        );

        let session = Arc::new(SessionState::new());
        let builder = IndexBuilder::new(pool, config, embedder, generator);
        let pipeline = IngestionPipeline::new(
            store,
            builder,
            Arc::clone(&session),
            Duration::from_secs(config.pipeline.build_timeout_secs),
        );
        let resolver = QueryResolver::new(
            Arc::clone(&session),
            Duration::from_secs(config.pipeline.query_timeout_secs),
        );

        Ok(Self {
            pipeline,
            resolver,
            session,
        })
    }

    pub async fn ingest(&self, files: Vec<UploadFile>) -> Result<IngestReport> {
        self.pipeline.ingest(files).await
    }

    pub async fn query(&self, text: &str) -> Result<Answer> {
        self.resolver.query(text).await
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }
}
