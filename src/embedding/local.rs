use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::Embedder;
use crate::core::config::settings::EmbeddingSettings;
use crate::core::errors::ApiError;

/// In-process embedder backed by fastembed. The model is downloaded and
/// loaded once, at construction.
pub struct LocalEmbedder {
    model_name: String,
    model: Arc<Mutex<TextEmbedding>>,
}

impl LocalEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, ApiError> {
        let model = resolve_model(&settings.model)?;
        let embedding = TextEmbedding::try_new(InitOptions::new(model)).map_err(|e| {
            ApiError::Internal(format!("Failed to initialize local embedding model: {}", e))
        })?;
        tracing::info!("Loaded local embedding model {}", settings.model);
        Ok(Self {
            model_name: settings.model.clone(),
            model: Arc::new(Mutex::new(embedding)),
        })
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    fn model(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let model = Arc::clone(&self.model);
        let texts = inputs.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|_| ApiError::Internal("Local embedding model lock poisoned".to_string()))?;
            guard
                .embed(texts, None)
                .map_err(|e| ApiError::Internal(format!("Local embedding failed: {}", e)))
        })
        .await
        .map_err(ApiError::internal)?
    }
}

fn resolve_model(name: &str) -> Result<EmbeddingModel, ApiError> {
    match name {
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" | "BAAI/bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        other => Err(ApiError::BadRequest(format!(
            "Unknown local embedding model: '{}'",
            other
        ))),
    }
}
