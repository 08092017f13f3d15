use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::embedding::{create_embedder, Embedder};
use crate::extract::Extractors;
use crate::knowledge::{create_backend, KnowledgeStore, VectorBackend};
use crate::llm::{response, GeminiClient, LlmProvider, ResponseGenerator, TitleGenerator};
use crate::search::{WebSearch, WebSearchClient};

pub mod error;

use error::InitializationError;

/// Long-lived service handles shared by every route.
///
/// Each external service (vector database, embedding model, LLM, web search)
/// gets exactly one client, built here at startup and reused for the life of
/// the process.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Arc<Settings>,
    pub knowledge: Arc<KnowledgeStore>,
    pub responder: Arc<ResponseGenerator>,
    pub search: Arc<dyn WebSearch>,
    pub extractors: Extractors,
}

/// The swappable collaborators behind [`AppState`].
pub struct Services {
    pub backend: Arc<dyn VectorBackend>,
    pub embedder: Arc<dyn Embedder>,
    pub llm: Arc<dyn LlmProvider>,
    /// Gemini handle for media extraction; clones share one connection pool.
    pub gemini: GeminiClient,
    pub search: Arc<dyn WebSearch>,
}

impl AppState {
    /// Loads configuration, builds every client and connects to the vector store.
    ///
    /// Any failure here is fatal: the server must not start without a reachable
    /// knowledge base.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        tracing::info!("Loading configuration from {}", config.config_path().display());
        let settings = config
            .load_settings()
            .map_err(|e| InitializationError::Config(e.into()))?;
        tracing::debug!(
            "Effective configuration: {}",
            config.redact_sensitive_values(
                &serde_json::to_value(&settings).unwrap_or_default()
            )
        );

        let embedder = create_embedder(&settings.embedding)
            .map_err(|e| InitializationError::Embedder(e.into()))?;
        let backend = create_backend(&settings.vector_store)
            .map_err(|e| InitializationError::VectorStore(e.into()))?;
        let gemini = GeminiClient::new(&settings.llm)
            .map_err(|e| InitializationError::Llm(e.into()))?;
        if settings.llm.api_key.is_none() {
            tracing::warn!("No LLM API key configured; chat and title generation will fail");
        }
        let search = WebSearchClient::new(&settings.search)
            .map_err(|e| InitializationError::Search(e.into()))?;

        let services = Services {
            backend,
            embedder,
            llm: Arc::new(gemini.clone()),
            gemini,
            search: Arc::new(search),
        };
        let state = Self::from_services(paths, settings, services)?;

        state
            .knowledge
            .initialize()
            .await
            .map_err(|e| InitializationError::VectorStore(e.into()))?;

        Ok(Arc::new(state))
    }

    /// Wires the domain components around already-built collaborators.
    ///
    /// Does not touch the network; call `knowledge.initialize()` to make sure
    /// the collection exists.
    pub fn from_services(
        paths: Arc<AppPaths>,
        settings: Settings,
        services: Services,
    ) -> Result<Self, InitializationError> {
        let titles = TitleGenerator::new(services.llm.clone());
        let knowledge = KnowledgeStore::new(
            services.backend,
            services.embedder,
            titles,
            &settings.vector_store,
        );

        let template = paths.resolve(&settings.llm.prompt_template);
        let instructions = response::load_instructions(&template);
        let responder = ResponseGenerator::new(
            services.llm,
            instructions,
            settings.retrieval.citation_snippet_chars,
        );

        let extractors = Extractors::new(services.gemini)
            .map_err(|e| InitializationError::Extractors(e.into()))?;

        Ok(Self {
            paths,
            settings: Arc::new(settings),
            knowledge: Arc::new(knowledge),
            responder: Arc::new(responder),
            search: services.search,
            extractors,
        })
    }
}
