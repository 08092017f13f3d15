//! VectorBackend trait: the seam between `KnowledgeStore` and a vector database.
//!
//! The Qdrant REST backend is used in production; the in-memory backend backs
//! tests and `vector_store.backend: memory` deployments.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::document::DocumentRecord;
use crate::core::errors::ApiError;

pub const COSINE: &str = "Cosine";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorParams {
    pub size: usize,
    pub distance: String,
}

impl VectorParams {
    pub fn cosine(size: usize) -> Self {
        Self {
            size,
            distance: COSINE.to_string(),
        }
    }
}

/// Vector configuration of a collection. Older databases and collections
/// created without names report a single unnamed space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VectorsConfig {
    Single(VectorParams),
    Named(BTreeMap<String, VectorParams>),
}

impl VectorsConfig {
    /// Parameters of the named space, if the collection has one by that name.
    pub fn named(&self, name: &str) -> Option<&VectorParams> {
        match self {
            VectorsConfig::Named(map) => map.get(name),
            VectorsConfig::Single(_) => None,
        }
    }

    /// The named space when present, otherwise the single or first space.
    pub fn primary(&self, name: &str) -> Option<&VectorParams> {
        match self {
            VectorsConfig::Single(params) => Some(params),
            VectorsConfig::Named(map) => map.get(name).or_else(|| map.values().next()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionInfo {
    pub status: String,
    /// `None` when the reported configuration could not be interpreted.
    pub vectors: Option<VectorsConfig>,
    pub points_count: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct PointRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Option<Map<String, Value>>,
}

/// One page of a scroll. `next` is an opaque cursor for the following page.
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    pub points: Vec<DocumentRecord>,
    pub next: Option<Value>,
}

#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// Human-readable location, used in log lines.
    fn describe(&self) -> String;

    async fn list_collections(&self) -> Result<Vec<String>, ApiError>;

    async fn create_collection(
        &self,
        collection: &str,
        vector_name: &str,
        params: VectorParams,
    ) -> Result<(), ApiError>;

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo, ApiError>;

    async fn upsert(
        &self,
        collection: &str,
        vector_name: &str,
        point: PointRecord,
    ) -> Result<(), ApiError>;

    async fn search(
        &self,
        collection: &str,
        vector_name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, ApiError>;

    /// Id-ordered iteration starting at `cursor` (inclusive).
    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        cursor: Option<Value>,
        with_payload: bool,
    ) -> Result<ScrollPage, ApiError>;

    /// Points that exist among `ids`; unknown ids are skipped.
    async fn retrieve(
        &self,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<DocumentRecord>, ApiError>;

    async fn delete_points(&self, collection: &str, ids: &[String]) -> Result<(), ApiError>;

    /// Deletes every point matching an empty filter.
    async fn delete_all(&self, collection: &str) -> Result<(), ApiError>;

    /// Exact number of points.
    async fn count(&self, collection: &str) -> Result<u64, ApiError>;
}
