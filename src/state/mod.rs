use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{AppConfig, AppPaths, ConfigService};
use crate::core::logging;
use crate::embedding::{build_embedder, Embedder};
use crate::llm::LlmRouter;
use crate::rag::{ChunkerConfig, Ingestor, RagPipeline, VectorStore};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// The embedder, vector store and LLM router are built once here and shared
/// by the ingestion and query paths.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: AppConfig,
    pub embedder: Arc<dyn Embedder>,
    pub store: Arc<VectorStore>,
    pub router: Arc<LlmRouter>,
    pub ingestor: Ingestor,
    pub pipeline: RagPipeline,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Loads `config.yml`/`secrets.yaml` plus environment overrides, installs
    /// logging from the `logging` section and builds every service.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;
        logging::init(&paths, &settings.logging);
        Self::build(paths, config, settings)
    }

    /// Builds the state from already-resolved settings, skipping config file discovery.
    pub fn with_settings(
        paths: AppPaths,
        settings: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(paths);
        let config = ConfigService::new(paths.clone());
        Self::build(paths, config, settings)
    }

    fn build(
        paths: Arc<AppPaths>,
        config: ConfigService,
        settings: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        for warning in settings.warnings() {
            tracing::warn!("{}", warning);
        }

        let embedder = build_embedder(&settings.embedding)
            .map_err(|e| InitializationError::Embedding(e.into()))?;
        let store = Arc::new(VectorStore::new());
        let router = Arc::new(
            LlmRouter::from_config(&settings.llm)
                .map_err(|e| InitializationError::Llm(e.into()))?,
        );

        let ingestor = Ingestor::new(
            ChunkerConfig::from(&settings.rag),
            embedder.clone(),
            store.clone(),
            paths.uploads_dir.clone(),
        );
        let pipeline = RagPipeline::new(embedder.clone(), store.clone(), router.clone());

        let credentials = router.credentials();
        tracing::info!(
            embedder = embedder.name(),
            groq = credentials.groq,
            gemini = credentials.gemini,
            "Services initialized"
        );

        Ok(Arc::new(AppState {
            paths,
            config,
            settings,
            embedder,
            store,
            router,
            ingestor,
            pipeline,
            started_at: Utc::now(),
        }))
    }
}
