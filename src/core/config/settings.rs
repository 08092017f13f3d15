//! Typed view over the merged YAML configuration.
//!
//! Every section falls back to defaults that match a local development setup
//! (Qdrant on localhost, Ollama-style embeddings endpoint, Gemini for generation).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub vector_store: VectorStoreSettings,
    pub embedding: EmbeddingSettings,
    pub llm: LlmSettings,
    pub search: SearchSettings,
    pub retrieval: RetrievalSettings,
    pub ingestion: IngestionSettings,
    pub uploads: UploadSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// Directory with the browser frontend, served at `/` when present.
    pub static_dir: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_allowed_origins: Vec::new(),
            static_dir: Some("static".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackendKind {
    Qdrant,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub backend: VectorBackendKind,
    pub url: String,
    pub api_key: Option<String>,
    pub collection_name: String,
    /// Name of the single named vector space; doubles as the embedding-model tag.
    pub vector_name: String,
    pub vector_size: usize,
    pub timeout_secs: u64,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            backend: VectorBackendKind::Qdrant,
            url: "http://localhost:6333".to_string(),
            api_key: None,
            collection_name: "knowledge-base".to_string(),
            vector_name: "fast-bge-base-en-v1.5".to_string(),
            vector_size: 768,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Any server exposing `POST /v1/embeddings`.
    Openai,
    /// In-process fastembed model (requires the `local-embeddings` feature).
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Openai,
            base_url: "http://localhost:11434".to_string(),
            model: "bge-base-en-v1.5".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub prompt_template: String,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            prompt_template: "prompts/chat_response.txt".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    Serper,
    Brave,
    Google,
    Duckduckgo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub provider: SearchProviderKind,
    pub num_results: usize,
    pub serper_api_key: Option<String>,
    pub serper_url: String,
    pub brave_search_api_key: Option<String>,
    pub google_search_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::Serper,
            num_results: 3,
            serper_api_key: None,
            serper_url: "https://google.serper.dev/search".to_string(),
            brave_search_api_key: None,
            google_search_api_key: None,
            google_search_engine_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Knowledge-base snippets pulled into each chat prompt.
    pub knowledge_limit: usize,
    /// Documents scanned when summing payload sizes for the stats endpoint.
    pub stats_scan_limit: usize,
    pub citation_snippet_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            knowledge_limit: 3,
            stats_scan_limit: 1000,
            citation_snippet_chars: 150,
        }
    }
}

/// Chunking parameters. Documents are stored whole; these are kept for
/// deployments that share the configuration file with the chunking importer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            chunk_size: 4000,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub max_bytes: usize,
    /// Extension (lowercase, no dot) → accepted MIME types.
    pub allowed_extensions: BTreeMap<String, Vec<String>>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        let allowed_extensions = [
            ("txt", vec!["text/plain"]),
            ("pdf", vec!["application/pdf"]),
            ("mp3", vec!["audio/mpeg"]),
            ("wav", vec!["audio/wav", "audio/x-wav"]),
            ("jpg", vec!["image/jpeg"]),
            ("jpeg", vec!["image/jpeg"]),
            ("png", vec!["image/png"]),
        ]
        .into_iter()
        .map(|(ext, mimes)| {
            (
                ext.to_string(),
                mimes.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        Self {
            max_bytes: 20 * 1024 * 1024,
            allowed_extensions,
        }
    }
}
