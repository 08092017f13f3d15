use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::backend::{PointRecord, VectorBackend, VectorParams};
use super::document::{derive_metadata, fallback_title, has_title, DocumentInput, DocumentRecord};
use crate::core::config::settings::VectorStoreSettings;
use crate::core::errors::ApiError;
use crate::embedding::Embedder;
use crate::llm::TitleGenerator;

const DEFAULT_DISTANCE: &str = "cosine";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub name: String,
    pub vectors_count: u64,
    pub status: String,
    pub vector_size: usize,
    pub distance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Document ingestion and retrieval over one vector collection.
///
/// Steady-state operations favour availability: retrieval and listing degrade
/// to empty results, deletion reports an outcome, stats never fail. Only
/// `add` propagates embedding and database errors.
pub struct KnowledgeStore {
    backend: Arc<dyn VectorBackend>,
    embedder: Arc<dyn Embedder>,
    titles: TitleGenerator,
    collection: String,
    vector_name: String,
    vector_size: usize,
}

impl KnowledgeStore {
    pub fn new(
        backend: Arc<dyn VectorBackend>,
        embedder: Arc<dyn Embedder>,
        titles: TitleGenerator,
        settings: &VectorStoreSettings,
    ) -> Self {
        Self {
            backend,
            embedder,
            titles,
            collection: settings.collection_name.clone(),
            vector_name: settings.vector_name.clone(),
            vector_size: settings.vector_size,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Connects and makes sure the collection exists. Any error here is fatal
    /// for startup.
    pub async fn initialize(&self) -> Result<(), ApiError> {
        self.ensure_collection().await?;
        tracing::info!("Connected to {}", self.backend.describe());
        Ok(())
    }

    pub async fn ensure_collection(&self) -> Result<(), ApiError> {
        let names = self.backend.list_collections().await?;

        if !names.iter().any(|name| name == &self.collection) {
            let created = self
                .backend
                .create_collection(
                    &self.collection,
                    &self.vector_name,
                    VectorParams::cosine(self.vector_size),
                )
                .await;
            match created {
                Ok(()) => tracing::info!("Created collection '{}'", self.collection),
                Err(err) => {
                    // a concurrent initializer may have won the race
                    if !self.collection_exists().await {
                        return Err(err);
                    }
                    tracing::debug!(
                        "Collection '{}' appeared concurrently: {}",
                        self.collection,
                        err
                    );
                }
            }
            return Ok(());
        }

        let info = self.backend.collection_info(&self.collection).await?;
        let configured = info
            .vectors
            .as_ref()
            .and_then(|vectors| vectors.named(&self.vector_name));
        match configured {
            Some(params) if params.size == self.vector_size => {
                tracing::info!(
                    "Collection '{}' already exists with correct vector configuration",
                    self.collection
                );
            }
            Some(params) => tracing::warn!(
                "Collection '{}' vector '{}' has size {} but {} is configured; using it as-is",
                self.collection,
                self.vector_name,
                params.size,
                self.vector_size
            ),
            None => tracing::warn!(
                "Collection '{}' exists but doesn't have the '{}' vector configuration; using it as-is",
                self.collection,
                self.vector_name
            ),
        }
        Ok(())
    }

    async fn collection_exists(&self) -> bool {
        self.backend
            .list_collections()
            .await
            .map(|names| names.iter().any(|name| name == &self.collection))
            .unwrap_or(false)
    }

    pub async fn add(&self, input: DocumentInput) -> Result<String, ApiError> {
        let id = Uuid::new_v4().to_string();
        let (text, mut metadata) = input.into_parts();

        derive_metadata(&text, &mut metadata);

        if !has_title(&metadata) {
            let title = match self.titles.generate(&text).await {
                Ok(title) => {
                    tracing::info!("Generated title: {}", title);
                    title
                }
                Err(err) => {
                    tracing::warn!("Error generating title: {}", err);
                    fallback_title(&text)
                }
            };
            metadata.insert("title".to_string(), Value::String(title));
        }

        let vector = self.embedder.embed_one(&text).await?;
        if vector.len() != self.vector_size {
            return Err(ApiError::BadRequest(format!(
                "Embedding model '{}' produced {} dimensions, collection expects {}",
                self.embedder.model(),
                vector.len(),
                self.vector_size
            )));
        }

        metadata.insert("text".to_string(), Value::String(text));

        self.backend
            .upsert(
                &self.collection,
                &self.vector_name,
                PointRecord {
                    id: id.clone(),
                    vector,
                    payload: metadata,
                },
            )
            .await?;

        tracing::info!("Added document with ID {}", id);
        Ok(id)
    }

    /// Texts of the most similar documents, in database order.
    pub async fn query(&self, text: &str, limit: usize) -> Vec<String> {
        match self.try_query(text, limit).await {
            Ok(documents) => {
                let preview: String = text.chars().take(50).collect();
                tracing::info!(
                    "Retrieved {} documents for query: {}...",
                    documents.len(),
                    preview
                );
                documents
            }
            Err(err) => {
                tracing::error!("Error querying documents: {}", err);
                Vec::new()
            }
        }
    }

    async fn try_query(&self, text: &str, limit: usize) -> Result<Vec<String>, ApiError> {
        let vector = self.embedder.embed_one(text).await?;
        let hits = self
            .backend
            .search(&self.collection, &self.vector_name, &vector, limit)
            .await?;
        Ok(hits
            .into_iter()
            .map(|hit| {
                hit.payload
                    .as_ref()
                    .and_then(|p| p.get("text"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Document {}", hit.id))
            })
            .collect())
    }

    /// One page of documents with full payloads.
    pub async fn list(&self, limit: usize, offset: usize) -> Vec<DocumentRecord> {
        match self.try_list(limit, offset).await {
            Ok(documents) => {
                tracing::info!("Retrieved {} documents from collection", documents.len());
                documents
            }
            Err(err) => {
                tracing::error!("Error listing documents: {}", err);
                Vec::new()
            }
        }
    }

    async fn try_list(&self, limit: usize, offset: usize) -> Result<Vec<DocumentRecord>, ApiError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut cursor = None;
        if offset > 0 {
            let skipped = self
                .backend
                .scroll(&self.collection, offset, None, false)
                .await?;
            if skipped.points.len() < offset || skipped.next.is_none() {
                return Ok(Vec::new());
            }
            cursor = skipped.next;
        }

        let page = self
            .backend
            .scroll(&self.collection, limit, cursor, true)
            .await?;
        Ok(page.points)
    }

    pub async fn delete(&self, id: &str) -> DeleteOutcome {
        if !is_point_id(id) {
            return DeleteOutcome::NotFound;
        }

        let ids = [id.to_string()];
        let existing = match self.backend.retrieve(&self.collection, &ids).await {
            Ok(existing) => existing,
            Err(err) => {
                tracing::error!("Error deleting document with ID {}: {}", id, err);
                return DeleteOutcome::Failed(err.message().to_string());
            }
        };
        if existing.is_empty() {
            return DeleteOutcome::NotFound;
        }

        match self.backend.delete_points(&self.collection, &ids).await {
            Ok(()) => {
                tracing::info!("Deleted document with ID {}", id);
                DeleteOutcome::Deleted
            }
            Err(err) => {
                tracing::error!("Error deleting document with ID {}: {}", id, err);
                DeleteOutcome::Failed(err.message().to_string())
            }
        }
    }

    pub async fn delete_all(&self) -> Result<(), ApiError> {
        self.backend.delete_all(&self.collection).await.map_err(|err| {
            tracing::error!("Error deleting all documents: {}", err);
            err
        })?;
        tracing::info!("Deleted all documents from collection {}", self.collection);
        Ok(())
    }

    pub async fn stats(&self) -> CollectionStats {
        let mut stats = CollectionStats {
            name: self.collection.clone(),
            vectors_count: 0,
            status: "unknown".to_string(),
            vector_size: self.vector_size,
            distance: DEFAULT_DISTANCE.to_string(),
            error: None,
        };

        let info = match self.backend.collection_info(&self.collection).await {
            Ok(info) => info,
            Err(err) => {
                tracing::error!("Error getting collection stats: {}", err);
                stats.status = "error".to_string();
                stats.error = Some(err.message().to_string());
                return stats;
            }
        };
        stats.status = info.status;

        match info
            .vectors
            .as_ref()
            .and_then(|vectors| vectors.primary(&self.vector_name))
        {
            Some(params) => {
                stats.vector_size = params.size;
                stats.distance = params.distance.clone();
            }
            None => {
                tracing::warn!("Could not access vector configuration details, using defaults")
            }
        }

        match self.backend.count(&self.collection).await {
            Ok(count) => stats.vectors_count = count,
            Err(err) => {
                tracing::error!("Error counting documents: {}", err);
                stats.vectors_count = info.points_count.unwrap_or(0);
            }
        }
        stats
    }

    /// Sum of payload `size` over the first `scan_limit` documents.
    pub async fn total_size(&self, scan_limit: usize) -> u64 {
        self.list(scan_limit, 0)
            .await
            .iter()
            .map(DocumentRecord::size)
            .sum()
    }
}

/// Qdrant point ids are UUIDs or unsigned integers.
fn is_point_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok() || id.parse::<u64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ApiError;
    use crate::knowledge::memory::MemoryBackend;
    use crate::llm::LlmProvider;
    use async_trait::async_trait;
    use serde_json::{json, Map};

    /// Bag-of-letters embedding: similar strings get similar vectors.
    struct LetterEmbedder;

    #[async_trait]
    impl Embedder for LetterEmbedder {
        fn model(&self) -> &str {
            "letters"
        }

        async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
            Ok(inputs
                .iter()
                .map(|input| {
                    let mut v = vec![0.0f32; 26];
                    for c in input.to_ascii_lowercase().bytes() {
                        if c.is_ascii_lowercase() {
                            v[(c - b'a') as usize] += 1.0;
                        }
                    }
                    v
                })
                .collect())
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        fn name(&self) -> &str {
            "failing"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ApiError> {
            Err(ApiError::BadGateway("quota exceeded".to_string()))
        }
    }

    struct TitleLlm;

    #[async_trait]
    impl LlmProvider for TitleLlm {
        fn name(&self) -> &str {
            "title"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ApiError> {
            Ok("Generated Title".to_string())
        }
    }

    fn settings() -> VectorStoreSettings {
        VectorStoreSettings {
            collection_name: "test-kb".to_string(),
            vector_size: 26,
            ..VectorStoreSettings::default()
        }
    }

    async fn store_with(llm: Arc<dyn LlmProvider>) -> (KnowledgeStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = KnowledgeStore::new(
            backend.clone(),
            Arc::new(LetterEmbedder),
            TitleGenerator::new(llm),
            &settings(),
        );
        store.initialize().await.unwrap();
        (store, backend)
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let (store, backend) = store_with(Arc::new(TitleLlm)).await;
        store.ensure_collection().await.unwrap();
        assert_eq!(backend.list_collections().await.unwrap(), ["test-kb"]);
    }

    #[tokio::test]
    async fn add_then_query_finds_document() {
        let (store, _) = store_with(Arc::new(TitleLlm)).await;
        let id = store
            .add(DocumentInput::Text("zebra zoo zigzag".to_string()))
            .await
            .unwrap();
        store
            .add(DocumentInput::Text("apple banana".to_string()))
            .await
            .unwrap();
        assert!(!id.is_empty());

        let results = store.query("zebra zoo", 1).await;
        assert_eq!(results, ["zebra zoo zigzag"]);
    }

    #[tokio::test]
    async fn add_generates_title_and_derived_fields() {
        let (store, _) = store_with(Arc::new(TitleLlm)).await;
        store
            .add(DocumentInput::Text("a b\nc".to_string()))
            .await
            .unwrap();

        let docs = store.list(10, 0).await;
        let payload = &docs[0].payload;
        assert_eq!(payload["title"], json!("Generated Title"));
        assert_eq!(payload["size"], json!(5));
        assert_eq!(payload["words"], json!(2));
        assert_eq!(payload["lines"], json!(2));
        assert_eq!(payload["text"], json!("a b\nc"));
        assert!(payload["timestamp"].is_string());
    }

    #[tokio::test]
    async fn title_failure_falls_back_to_first_line() {
        let (store, _) = store_with(Arc::new(FailingLlm)).await;
        store
            .add(DocumentInput::Text(
                "Quarterly planning notes for the platform team\nbody".to_string(),
            ))
            .await
            .unwrap();

        let docs = store.list(10, 0).await;
        assert_eq!(docs[0].payload["title"], json!("Quarterly planning notes for t..."));
    }

    #[tokio::test]
    async fn supplied_title_and_metadata_are_kept() {
        let (store, _) = store_with(Arc::new(FailingLlm)).await;
        let mut metadata = Map::new();
        metadata.insert("title".to_string(), json!("Mine"));
        metadata.insert("source_type".to_string(), json!("manual"));
        metadata.insert("source".to_string(), json!("User input"));
        store
            .add(DocumentInput::Structured {
                text: "hello".to_string(),
                metadata,
            })
            .await
            .unwrap();

        let docs = store.list(10, 0).await;
        assert_eq!(docs[0].payload["title"], json!("Mine"));
        assert_eq!(docs[0].payload["source"], json!("User input"));
    }

    #[tokio::test]
    async fn list_pages_are_disjoint() {
        let (store, _) = store_with(Arc::new(TitleLlm)).await;
        for i in 0..5 {
            store
                .add(DocumentInput::Text(format!("document {}", i)))
                .await
                .unwrap();
        }

        let first: Vec<String> = store.list(2, 0).await.into_iter().map(|d| d.id).collect();
        let second: Vec<String> = store.list(2, 2).await.into_iter().map(|d| d.id).collect();
        let third: Vec<String> = store.list(2, 4).await.into_iter().map(|d| d.id).collect();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(third.len(), 1);
        assert!(first.iter().all(|id| !second.contains(id)));
        assert!(store.list(2, 5).await.is_empty());
    }

    #[tokio::test]
    async fn delete_reports_explicit_outcomes() {
        let (store, _) = store_with(Arc::new(TitleLlm)).await;
        let id = store
            .add(DocumentInput::Text("short lived".to_string()))
            .await
            .unwrap();

        assert_eq!(store.delete(&id).await, DeleteOutcome::Deleted);
        assert_eq!(store.delete(&id).await, DeleteOutcome::NotFound);
        assert_eq!(store.delete("not-a-uuid").await, DeleteOutcome::NotFound);
        assert!(store.query("short lived", 3).await.is_empty());
        assert!(store.list(10, 0).await.is_empty());
    }

    #[tokio::test]
    async fn integer_ids_from_listing_can_be_deleted() {
        let (store, backend) = store_with(Arc::new(TitleLlm)).await;
        let mut payload = Map::new();
        payload.insert("text".to_string(), json!("imported elsewhere"));
        backend
            .upsert(
                "test-kb",
                &settings().vector_name,
                PointRecord {
                    id: "7".to_string(),
                    vector: vec![1.0; 26],
                    payload,
                },
            )
            .await
            .unwrap();

        let listed: Vec<String> = store.list(10, 0).await.into_iter().map(|d| d.id).collect();
        assert_eq!(listed, ["7"]);
        assert_eq!(store.delete("7").await, DeleteOutcome::Deleted);
        assert_eq!(store.delete("7").await, DeleteOutcome::NotFound);
        assert_eq!(store.stats().await.vectors_count, 0);
    }

    #[test]
    fn point_ids_are_uuids_or_unsigned_integers() {
        assert!(is_point_id("7"));
        assert!(is_point_id("0b6f2c1e-3f0c-4c4e-9d7a-1b2c3d4e5f60"));
        assert!(!is_point_id("-7"));
        assert!(!is_point_id("not-a-uuid"));
        assert!(!is_point_id(""));
    }

    fn store_over(backend: Arc<MemoryBackend>) -> KnowledgeStore {
        KnowledgeStore::new(
            backend,
            Arc::new(LetterEmbedder),
            TitleGenerator::new(Arc::new(TitleLlm)),
            &settings(),
        )
    }

    #[tokio::test]
    async fn existing_collection_with_other_size_is_used_as_is() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .create_collection("test-kb", &settings().vector_name, VectorParams::cosine(8))
            .await
            .unwrap();
        let store = store_over(backend.clone());

        store.initialize().await.unwrap();
        assert_eq!(backend.list_collections().await.unwrap(), ["test-kb"]);
        let stats = store.stats().await;
        assert_eq!(stats.vector_size, 8);
        assert_eq!(stats.status, "green");
        assert!(stats.error.is_none());
    }

    #[tokio::test]
    async fn existing_collection_without_configured_vector_is_used_as_is() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .create_collection("test-kb", "other-model", VectorParams::cosine(12))
            .await
            .unwrap();
        let store = store_over(backend.clone());

        store.initialize().await.unwrap();
        let stats = store.stats().await;
        assert_eq!(stats.vector_size, 12);
        assert_eq!(stats.distance, "Cosine");
        assert!(stats.error.is_none());
    }

    #[tokio::test]
    async fn stats_count_matches_documents() {
        let (store, _) = store_with(Arc::new(TitleLlm)).await;
        for text in ["one", "two", "three"] {
            store.add(DocumentInput::Text(text.to_string())).await.unwrap();
        }

        let stats = store.stats().await;
        assert_eq!(stats.name, "test-kb");
        assert_eq!(stats.vectors_count, 3);
        assert_eq!(stats.vector_size, 26);
        assert_eq!(stats.distance, "Cosine");
        assert!(stats.error.is_none());
        assert_eq!(store.total_size(1000).await, 3 + 3 + 5);

        store.delete_all().await.unwrap();
        assert_eq!(store.stats().await.vectors_count, 0);
    }

    #[tokio::test]
    async fn stats_degrade_when_collection_missing() {
        let backend = Arc::new(MemoryBackend::new());
        let store = KnowledgeStore::new(
            backend,
            Arc::new(LetterEmbedder),
            TitleGenerator::new(Arc::new(TitleLlm)),
            &settings(),
        );

        let stats = store.stats().await;
        assert_eq!(stats.status, "error");
        assert_eq!(stats.vectors_count, 0);
        assert_eq!(stats.vector_size, 26);
        assert!(stats.error.is_some());
        assert!(store.query("anything", 3).await.is_empty());
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let store = KnowledgeStore::new(
            backend,
            Arc::new(LetterEmbedder),
            TitleGenerator::new(Arc::new(TitleLlm)),
            &VectorStoreSettings {
                vector_size: 8,
                ..settings()
            },
        );
        store.initialize().await.unwrap();
        let err = store
            .add(DocumentInput::Text("abc".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
