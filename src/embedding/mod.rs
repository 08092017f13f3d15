//! Text embedding providers.
//!
//! One embedder handle is built at startup and shared by ingestion and
//! retrieval, so documents and queries are always embedded by the same model.

mod http;
#[cfg(feature = "local-embeddings")]
mod local;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::config::settings::{EmbeddingProviderKind, EmbeddingSettings};
use crate::core::errors::ApiError;

pub use http::HttpEmbedder;
#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the embedding model, as configured.
    fn model(&self) -> &str;

    /// Embeds every input, preserving order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError>;

    async fn embed_one(&self, input: &str) -> Result<Vec<f32>, ApiError> {
        self.embed(&[input.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::BadGateway("Embedding provider returned no vectors".to_string()))
    }
}

pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>, ApiError> {
    match settings.provider {
        EmbeddingProviderKind::Openai => Ok(Arc::new(HttpEmbedder::new(settings)?)),
        #[cfg(feature = "local-embeddings")]
        EmbeddingProviderKind::Local => Ok(Arc::new(LocalEmbedder::new(settings)?)),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProviderKind::Local => Err(ApiError::BadRequest(
            "embedding.provider 'local' requires building with --features local-embeddings"
                .to_string(),
        )),
    }
}
