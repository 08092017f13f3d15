use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize embedding model: {0}")]
    Embedder(#[source] anyhow::Error),

    #[error("Failed to initialize vector store: {0}")]
    VectorStore(#[source] anyhow::Error),

    #[error("Failed to initialize LLM client: {0}")]
    Llm(#[source] anyhow::Error),

    #[error("Failed to initialize web search client: {0}")]
    Search(#[source] anyhow::Error),

    #[error("Failed to initialize content extractors: {0}")]
    Extractors(#[source] anyhow::Error),
}
