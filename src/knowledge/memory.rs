//! In-process vector backend. Points live in id-ordered maps so scrolling
//! behaves like Qdrant's; search is a brute-force cosine scan.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::backend::{
    CollectionInfo, PointRecord, ScoredPoint, ScrollPage, VectorBackend, VectorParams,
    VectorsConfig,
};
use super::document::DocumentRecord;
use crate::core::errors::ApiError;

struct StoredPoint {
    vectors: HashMap<String, Vec<f32>>,
    payload: Map<String, Value>,
}

struct MemoryCollection {
    config: BTreeMap<String, VectorParams>,
    points: BTreeMap<String, StoredPoint>,
}

#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing_collection(collection: &str) -> ApiError {
    ApiError::NotFound(format!("Collection `{}` doesn't exist", collection))
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;
    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

fn cursor_key(cursor: &Value) -> String {
    match cursor {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl VectorBackend for MemoryBackend {
    fn describe(&self) -> String {
        "in-memory vector store".to_string()
    }

    async fn list_collections(&self) -> Result<Vec<String>, ApiError> {
        let collections = self.collections.read().await;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_collection(
        &self,
        collection: &str,
        vector_name: &str,
        params: VectorParams,
    ) -> Result<(), ApiError> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(collection) {
            return Err(ApiError::BadRequest(format!(
                "Collection `{}` already exists",
                collection
            )));
        }
        collections.insert(
            collection.to_string(),
            MemoryCollection {
                config: BTreeMap::from([(vector_name.to_string(), params)]),
                points: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo, ApiError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;
        Ok(CollectionInfo {
            status: "green".to_string(),
            vectors: Some(VectorsConfig::Named(entry.config.clone())),
            points_count: Some(entry.points.len() as u64),
        })
    }

    async fn upsert(
        &self,
        collection: &str,
        vector_name: &str,
        point: PointRecord,
    ) -> Result<(), ApiError> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| missing_collection(collection))?;

        let params = entry.config.get(vector_name).ok_or_else(|| {
            ApiError::BadRequest(format!("Not existing vector name: {}", vector_name))
        })?;
        if params.size != point.vector.len() {
            return Err(ApiError::BadRequest(format!(
                "Vector dimension error: expected dim: {}, got {}",
                params.size,
                point.vector.len()
            )));
        }

        entry.points.insert(
            point.id,
            StoredPoint {
                vectors: HashMap::from([(vector_name.to_string(), point.vector)]),
                payload: point.payload,
            },
        );
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector_name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, ApiError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;

        let mut hits: Vec<ScoredPoint> = entry
            .points
            .iter()
            .filter_map(|(id, point)| {
                let stored = point.vectors.get(vector_name)?;
                Some(ScoredPoint {
                    id: id.clone(),
                    score: cosine_similarity(vector, stored),
                    payload: Some(point.payload.clone()),
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        cursor: Option<Value>,
        with_payload: bool,
    ) -> Result<ScrollPage, ApiError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;

        let start = cursor.as_ref().map(cursor_key);
        let mut remaining = entry
            .points
            .iter()
            .filter(|(id, _)| start.as_deref().map(|s| id.as_str() >= s).unwrap_or(true));

        let points = remaining
            .by_ref()
            .take(limit)
            .map(|(id, point)| DocumentRecord {
                id: id.clone(),
                payload: if with_payload {
                    point.payload.clone()
                } else {
                    Map::new()
                },
            })
            .collect();
        let next = remaining.next().map(|(id, _)| Value::String(id.clone()));
        Ok(ScrollPage { points, next })
    }

    async fn retrieve(
        &self,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<DocumentRecord>, ApiError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                entry.points.get(id).map(|point| DocumentRecord {
                    id: id.clone(),
                    payload: point.payload.clone(),
                })
            })
            .collect())
    }

    async fn delete_points(&self, collection: &str, ids: &[String]) -> Result<(), ApiError> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| missing_collection(collection))?;
        for id in ids {
            entry.points.remove(id);
        }
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> Result<(), ApiError> {
        let mut collections = self.collections.write().await;
        let entry = collections
            .get_mut(collection)
            .ok_or_else(|| missing_collection(collection))?;
        entry.points.clear();
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, ApiError> {
        let collections = self.collections.read().await;
        let entry = collections
            .get(collection)
            .ok_or_else(|| missing_collection(collection))?;
        Ok(entry.points.len() as u64)
    }
}
