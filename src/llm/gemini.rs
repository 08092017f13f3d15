use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use super::provider::LlmProvider;
use crate::core::config::settings::LlmSettings;
use crate::core::errors::ApiError;

/// One element of a Gemini `contents[].parts` array.
#[derive(Debug, Clone)]
pub enum Part {
    Text(String),
    /// Base64-encoded bytes sent inline with the request.
    InlineData { mime_type: String, data: String },
    /// A file previously uploaded through the Files API.
    FileData { mime_type: String, file_uri: String },
}

impl Part {
    fn to_json(&self) -> Value {
        match self {
            Part::Text(text) => json!({ "text": text }),
            Part::InlineData { mime_type, data } => json!({
                "inline_data": { "mime_type": mime_type, "data": data }
            }),
            Part::FileData {
                mime_type,
                file_uri,
            } => json!({
                "file_data": { "mime_type": mime_type, "file_uri": file_uri }
            }),
        }
    }
}

/// REST client for the Gemini `generateContent` and Files APIs.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl GeminiClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            ApiError::Internal("Gemini API key is not configured (GOOGLE_API_KEY)".to_string())
        })?;
        Ok(request.header("x-goog-api-key", key))
    }

    /// Runs `generateContent` with the given parts and returns the joined text
    /// of the first candidate.
    pub async fn generate_content(&self, parts: Vec<Part>) -> Result<String, ApiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{
                "parts": parts.iter().map(Part::to_json).collect::<Vec<_>>()
            }]
        });

        let res = self
            .authorize(self.client.post(&url))?
            .json(&body)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::BadGateway(format!(
                "Gemini request failed ({}): {}",
                status, text
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::upstream)?;
        candidate_text(&payload).ok_or_else(|| {
            ApiError::BadGateway("Gemini response contained no candidate text".to_string())
        })
    }

    /// Uploads a file through the resumable Files API and returns its URI.
    pub async fn upload_file(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<String, ApiError> {
        let start_url = format!("{}/upload/v1beta/files", self.base_url);
        let res = self
            .authorize(self.client.post(&start_url))?
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::BadGateway(format!(
                "Initial upload request failed ({}): {}",
                status, text
            )));
        }

        let upload_url = res
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadGateway("Failed to get upload URL".to_string()))?;

        let res = self
            .client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await
            .map_err(ApiError::upstream)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::BadGateway(format!(
                "File upload failed ({}): {}",
                status, text
            )));
        }

        let info: Value = res.json().await.map_err(ApiError::upstream)?;
        info["file"]["uri"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadGateway("Failed to get file URI".to_string()))
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        self.generate_content(vec![Part::Text(prompt.to_string())])
            .await
    }
}

fn candidate_text(payload: &Value) -> Option<String> {
    let parts = payload["candidates"][0]["content"]["parts"].as_array()?;
    let text = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join(" ");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
