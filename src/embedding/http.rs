use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::Embedder;
use crate::core::config::settings::EmbeddingSettings;
use crate::core::errors::ApiError;

/// Embedder for any server speaking the OpenAI `/v1/embeddings` protocol
/// (Ollama, LM Studio, text-embeddings-inference, OpenAI itself).
#[derive(Clone)]
pub struct HttpEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            client,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::BadGateway(format!(
                "Embedding request failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        let embeddings = parse_embeddings(&payload)?;
        if embeddings.len() != inputs.len() {
            return Err(ApiError::BadGateway(format!(
                "Embedding provider returned {} vectors for {} inputs",
                embeddings.len(),
                inputs.len()
            )));
        }
        Ok(embeddings)
    }
}

fn parse_embeddings(payload: &Value) -> Result<Vec<Vec<f32>>, ApiError> {
    let data = payload["data"].as_array().ok_or_else(|| {
        ApiError::BadGateway("Invalid embedding response: missing data array".to_string())
    })?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
        let values = item["embedding"].as_array().ok_or_else(|| {
            ApiError::BadGateway("Invalid embedding response: embedding is not an array".to_string())
        })?;
        let vector: Vec<f32> = values
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();
        indexed.push((index, vector));
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_embeddings_orders_by_index() {
        let payload = json!({
            "data": [
                { "index": 1, "embedding": [0.5, 0.5] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        let vectors = parse_embeddings(&payload).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.5, 0.5]]);
    }

    #[test]
    fn parse_embeddings_rejects_missing_data() {
        let err = parse_embeddings(&json!({ "error": "model not loaded" })).unwrap_err();
        assert!(err.message().contains("missing data"));
    }

    #[test]
    fn new_trims_trailing_slash_and_empty_key() {
        let settings = EmbeddingSettings {
            base_url: "http://localhost:11434/".to_string(),
            api_key: Some(String::new()),
            ..EmbeddingSettings::default()
        };
        let embedder = HttpEmbedder::new(&settings).unwrap();
        assert_eq!(embedder.base_url, "http://localhost:11434");
        assert!(embedder.api_key.is_none());
        assert_eq!(embedder.model(), "bge-base-en-v1.5");
    }
}
