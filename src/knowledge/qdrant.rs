use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Map, Value};

use super::backend::{
    CollectionInfo, PointRecord, ScoredPoint, ScrollPage, VectorBackend, VectorParams,
    VectorsConfig,
};
use super::document::DocumentRecord;
use crate::core::config::settings::VectorStoreSettings;
use crate::core::errors::ApiError;

/// Qdrant over its REST API.
#[derive(Clone)]
pub struct QdrantBackend {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl QdrantBackend {
    pub fn new(settings: &VectorStoreSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone().filter(|k| !k.trim().is_empty()),
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.request(method, url);
        match &self.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    /// Sends the request and unwraps Qdrant's `{"result": ...}` envelope.
    async fn call(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let res = request.send().await.map_err(ApiError::upstream)?;
        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::BadGateway(format!(
                "Qdrant request failed ({}): {}",
                status,
                status_error(&text)
            )));
        }
        let mut payload: Value = res.json().await.map_err(ApiError::upstream)?;
        Ok(payload
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}

fn collection_path(collection: &str) -> String {
    format!("/collections/{}", urlencoding::encode(collection))
}

/// Pulls `status.error` out of a Qdrant error body, else returns it as-is.
fn status_error(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["status"]["error"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Point ids are UUID strings or unsigned integers.
fn point_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Integer ids must go back over the wire as JSON numbers; Qdrant rejects
/// `"7"` as an id.
fn wire_id(id: &str) -> Value {
    match id.parse::<u64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::String(id.to_string()),
    }
}

fn wire_ids(ids: &[String]) -> Vec<Value> {
    ids.iter().map(|id| wire_id(id)).collect()
}

fn payload_of(value: &mut Value) -> Option<Map<String, Value>> {
    match value.get_mut("payload").map(Value::take) {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn records(mut points: Value) -> Vec<DocumentRecord> {
    let Some(items) = points.as_array_mut() else {
        return Vec::new();
    };
    items
        .iter_mut()
        .map(|point| DocumentRecord {
            id: point_id(&point["id"]),
            payload: payload_of(point).unwrap_or_default(),
        })
        .collect()
}

fn parse_collection_info(result: &Value) -> CollectionInfo {
    let vectors = result
        .pointer("/config/params/vectors")
        .and_then(|v| serde_json::from_value::<VectorsConfig>(v.clone()).ok());
    CollectionInfo {
        status: result["status"].as_str().unwrap_or("unknown").to_string(),
        vectors,
        points_count: result["points_count"].as_u64(),
    }
}

#[async_trait]
impl VectorBackend for QdrantBackend {
    fn describe(&self) -> String {
        format!("Qdrant at {}", self.base_url)
    }

    async fn list_collections(&self) -> Result<Vec<String>, ApiError> {
        let result = self.call(self.request(Method::GET, "/collections")).await?;
        Ok(result["collections"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|c| c["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_collection(
        &self,
        collection: &str,
        vector_name: &str,
        params: VectorParams,
    ) -> Result<(), ApiError> {
        let body = json!({ "vectors": { vector_name: params } });
        self.call(
            self.request(Method::PUT, &collection_path(collection))
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn collection_info(&self, collection: &str) -> Result<CollectionInfo, ApiError> {
        let result = self
            .call(self.request(Method::GET, &collection_path(collection)))
            .await?;
        Ok(parse_collection_info(&result))
    }

    async fn upsert(
        &self,
        collection: &str,
        vector_name: &str,
        point: PointRecord,
    ) -> Result<(), ApiError> {
        let body = json!({
            "points": [{
                "id": wire_id(&point.id),
                "vector": { vector_name: point.vector },
                "payload": point.payload,
            }]
        });
        let path = format!("{}/points?wait=true", collection_path(collection));
        self.call(self.request(Method::PUT, &path).json(&body))
            .await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector_name: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, ApiError> {
        let body = json!({
            "vector": { "name": vector_name, "vector": vector },
            "limit": limit,
            "with_payload": true,
        });
        let path = format!("{}/points/search", collection_path(collection));
        let mut result = self
            .call(self.request(Method::POST, &path).json(&body))
            .await?;

        let Some(items) = result.as_array_mut() else {
            return Ok(Vec::new());
        };
        Ok(items
            .iter_mut()
            .map(|hit| ScoredPoint {
                id: point_id(&hit["id"]),
                score: hit["score"].as_f64().unwrap_or(0.0) as f32,
                payload: payload_of(hit),
            })
            .collect())
    }

    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        cursor: Option<Value>,
        with_payload: bool,
    ) -> Result<ScrollPage, ApiError> {
        let mut body = json!({
            "limit": limit,
            "with_payload": with_payload,
            "with_vector": false,
        });
        if let Some(cursor) = cursor {
            body["offset"] = cursor;
        }
        let path = format!("{}/points/scroll", collection_path(collection));
        let mut result = self
            .call(self.request(Method::POST, &path).json(&body))
            .await?;

        let next = match result.get_mut("next_page_offset").map(Value::take) {
            None | Some(Value::Null) => None,
            offset => offset,
        };
        let points = result
            .get_mut("points")
            .map(Value::take)
            .unwrap_or(Value::Null);
        Ok(ScrollPage {
            points: records(points),
            next,
        })
    }

    async fn retrieve(
        &self,
        collection: &str,
        ids: &[String],
    ) -> Result<Vec<DocumentRecord>, ApiError> {
        let body = json!({ "ids": wire_ids(ids), "with_payload": true, "with_vector": false });
        let path = format!("{}/points", collection_path(collection));
        let result = self
            .call(self.request(Method::POST, &path).json(&body))
            .await?;
        Ok(records(result))
    }

    async fn delete_points(&self, collection: &str, ids: &[String]) -> Result<(), ApiError> {
        let body = json!({ "points": wire_ids(ids) });
        let path = format!("{}/points/delete?wait=true", collection_path(collection));
        self.call(self.request(Method::POST, &path).json(&body))
            .await?;
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> Result<(), ApiError> {
        let body = json!({ "filter": { "must": [] } });
        let path = format!("{}/points/delete?wait=true", collection_path(collection));
        self.call(self.request(Method::POST, &path).json(&body))
            .await?;
        Ok(())
    }

    async fn count(&self, collection: &str) -> Result<u64, ApiError> {
        let path = format!("{}/points/count", collection_path(collection));
        let result = self
            .call(self.request(Method::POST, &path).json(&json!({ "exact": true })))
            .await?;
        Ok(result["count"].as_u64().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_info_reads_named_vectors() {
        let result = json!({
            "status": "green",
            "points_count": 12,
            "config": { "params": { "vectors": {
                "fast-bge-base-en-v1.5": { "size": 768, "distance": "Cosine" }
            }}}
        });
        let info = parse_collection_info(&result);
        assert_eq!(info.status, "green");
        assert_eq!(info.points_count, Some(12));
        assert_eq!(
            info.vectors
                .as_ref()
                .and_then(|v| v.named("fast-bge-base-en-v1.5"))
                .map(|p| p.size),
            Some(768)
        );
    }

    #[test]
    fn collection_info_tolerates_missing_config() {
        let info = parse_collection_info(&json!({ "status": "yellow" }));
        assert_eq!(info.status, "yellow");
        assert!(info.vectors.is_none());
        assert!(info.points_count.is_none());
    }

    #[test]
    fn records_keep_integer_and_uuid_ids() {
        let points = json!([
            { "id": 7, "payload": { "text": "seven" } },
            { "id": "0b6f2c1e-3f0c-4c4e-9d7a-1b2c3d4e5f60" }
        ]);
        let parsed = records(points);
        assert_eq!(parsed[0].id, "7");
        assert_eq!(parsed[0].text(), Some("seven"));
        assert_eq!(parsed[1].id, "0b6f2c1e-3f0c-4c4e-9d7a-1b2c3d4e5f60");
        assert!(parsed[1].payload.is_empty());
    }

    #[test]
    fn status_error_extracts_message() {
        let body = r#"{"status":{"error":"Not found: Collection `x` doesn't exist!"},"time":0.1}"#;
        assert_eq!(status_error(body), "Not found: Collection `x` doesn't exist!");
        assert_eq!(status_error("plain"), "plain");
    }

    #[test]
    fn integer_ids_go_out_as_numbers() {
        assert_eq!(wire_id("7"), json!(7));
        assert_eq!(
            wire_id("0b6f2c1e-3f0c-4c4e-9d7a-1b2c3d4e5f60"),
            json!("0b6f2c1e-3f0c-4c4e-9d7a-1b2c3d4e5f60")
        );
        assert_eq!(wire_id("-7"), json!("-7"));
        assert_eq!(
            wire_ids(&["12".to_string(), "x".to_string()]),
            vec![json!(12), json!("x")]
        );
    }

    mod stub {
        //! Minimal Qdrant REST stand-in: one process-local map of collections,
        //! with every request body recorded for inspection.

        use std::collections::BTreeMap;
        use std::sync::{Arc, Mutex};

        use axum::extract::{Path, State};
        use axum::http::StatusCode;
        use axum::routing::{get, post};
        use axum::{Json, Router};
        use serde_json::{json, Value};
        use tokio::net::TcpListener;

        use super::super::point_id;

        pub struct StubPoint {
            pub id: Value,
            pub vector: Vec<f32>,
            pub payload: Value,
        }

        #[derive(Default)]
        pub struct StubCollection {
            pub vectors: Value,
            pub points: BTreeMap<String, StubPoint>,
        }

        #[derive(Default)]
        pub struct StubState {
            pub collections: BTreeMap<String, StubCollection>,
            pub requests: Vec<(String, Value)>,
        }

        impl StubState {
            pub fn bodies(&self, endpoint: &str) -> Vec<Value> {
                self.requests
                    .iter()
                    .filter(|(name, _)| name == endpoint)
                    .map(|(_, body)| body.clone())
                    .collect()
            }
        }

        type Shared = Arc<Mutex<StubState>>;
        type Reply = (StatusCode, Json<Value>);

        fn ok(result: Value) -> Reply {
            (
                StatusCode::OK,
                Json(json!({ "result": result, "status": "ok", "time": 0.0 })),
            )
        }

        fn not_found(name: &str) -> Reply {
            (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "status": { "error": format!("Not found: Collection `{}` doesn't exist!", name) },
                    "time": 0.0
                })),
            )
        }

        fn point_json(point: &StubPoint, with_payload: bool) -> Value {
            if with_payload {
                json!({ "id": point.id, "payload": point.payload })
            } else {
                json!({ "id": point.id })
            }
        }

        fn record(state: &mut StubState, endpoint: &str, body: &Value) {
            state.requests.push((endpoint.to_string(), body.clone()));
        }

        async fn list_collections(State(state): State<Shared>) -> Reply {
            let state = state.lock().unwrap();
            let names: Vec<Value> = state
                .collections
                .keys()
                .map(|name| json!({ "name": name }))
                .collect();
            ok(json!({ "collections": names }))
        }

        async fn create_collection(
            State(state): State<Shared>,
            Path(name): Path<String>,
            Json(body): Json<Value>,
        ) -> Reply {
            let mut state = state.lock().unwrap();
            record(&mut state, "create", &body);
            state.collections.insert(
                name,
                StubCollection {
                    vectors: body["vectors"].clone(),
                    points: BTreeMap::new(),
                },
            );
            ok(json!(true))
        }

        async fn collection_info(State(state): State<Shared>, Path(name): Path<String>) -> Reply {
            let state = state.lock().unwrap();
            match state.collections.get(&name) {
                Some(collection) => ok(json!({
                    "status": "green",
                    "points_count": collection.points.len(),
                    "config": { "params": { "vectors": collection.vectors } }
                })),
                None => not_found(&name),
            }
        }

        async fn upsert(
            State(state): State<Shared>,
            Path(name): Path<String>,
            Json(body): Json<Value>,
        ) -> Reply {
            let mut state = state.lock().unwrap();
            record(&mut state, "upsert", &body);
            let Some(collection) = state.collections.get_mut(&name) else {
                return not_found(&name);
            };
            for point in body["points"].as_array().cloned().unwrap_or_default() {
                // named vectors arrive as {"<name>": [..]}
                let vector: Vec<f32> = point["vector"]
                    .as_object()
                    .and_then(|named| named.values().next())
                    .and_then(Value::as_array)
                    .map(|values| values.iter().filter_map(Value::as_f64).map(|v| v as f32).collect())
                    .unwrap_or_default();
                collection.points.insert(
                    point_id(&point["id"]),
                    StubPoint {
                        id: point["id"].clone(),
                        vector,
                        payload: point["payload"].clone(),
                    },
                );
            }
            ok(json!({ "operation_id": 0, "status": "completed" }))
        }

        async fn search(
            State(state): State<Shared>,
            Path(name): Path<String>,
            Json(body): Json<Value>,
        ) -> Reply {
            let mut state = state.lock().unwrap();
            record(&mut state, "search", &body);
            let Some(collection) = state.collections.get(&name) else {
                return not_found(&name);
            };
            let query: Vec<f32> = body["vector"]["vector"]
                .as_array()
                .map(|values| values.iter().filter_map(Value::as_f64).map(|v| v as f32).collect())
                .unwrap_or_default();
            let mut hits: Vec<(f32, &StubPoint)> = collection
                .points
                .values()
                .map(|point| {
                    let dot: f32 = point.vector.iter().zip(&query).map(|(a, b)| a * b).sum();
                    (dot, point)
                })
                .collect();
            hits.sort_by(|a, b| b.0.total_cmp(&a.0));
            let limit = body["limit"].as_u64().unwrap_or(10) as usize;
            let result: Vec<Value> = hits
                .into_iter()
                .take(limit)
                .map(|(score, point)| json!({ "id": point.id, "score": score, "payload": point.payload }))
                .collect();
            ok(json!(result))
        }

        async fn scroll(
            State(state): State<Shared>,
            Path(name): Path<String>,
            Json(body): Json<Value>,
        ) -> Reply {
            let mut state = state.lock().unwrap();
            record(&mut state, "scroll", &body);
            let Some(collection) = state.collections.get(&name) else {
                return not_found(&name);
            };
            let start = body.get("offset").map(point_id);
            let limit = body["limit"].as_u64().unwrap_or(10) as usize;
            let with_payload = body["with_payload"].as_bool().unwrap_or(false);
            let mut remaining = collection
                .points
                .iter()
                .filter(|(key, _)| start.as_ref().map(|s| *key >= s).unwrap_or(true));
            let points: Vec<Value> = remaining
                .by_ref()
                .take(limit)
                .map(|(_, point)| point_json(point, with_payload))
                .collect();
            let next = remaining
                .next()
                .map(|(_, point)| point.id.clone())
                .unwrap_or(Value::Null);
            ok(json!({ "points": points, "next_page_offset": next }))
        }

        async fn retrieve(
            State(state): State<Shared>,
            Path(name): Path<String>,
            Json(body): Json<Value>,
        ) -> Reply {
            let mut state = state.lock().unwrap();
            record(&mut state, "retrieve", &body);
            let Some(collection) = state.collections.get(&name) else {
                return not_found(&name);
            };
            let found: Vec<Value> = body["ids"]
                .as_array()
                .cloned()
                .unwrap_or_default()
                .iter()
                // Qdrant only matches integer points by numeric id
                .filter_map(|id| collection.points.get(&point_id(id)).filter(|p| p.id == *id))
                .map(|point| point_json(point, true))
                .collect();
            ok(json!(found))
        }

        async fn delete(
            State(state): State<Shared>,
            Path(name): Path<String>,
            Json(body): Json<Value>,
        ) -> Reply {
            let mut state = state.lock().unwrap();
            record(&mut state, "delete", &body);
            let Some(collection) = state.collections.get_mut(&name) else {
                return not_found(&name);
            };
            if let Some(ids) = body["points"].as_array() {
                for id in ids {
                    let key = point_id(id);
                    if collection.points.get(&key).is_some_and(|p| p.id == *id) {
                        collection.points.remove(&key);
                    }
                }
            } else if body["filter"]["must"] == json!([]) {
                collection.points.clear();
            }
            ok(json!({ "operation_id": 1, "status": "completed" }))
        }

        async fn count(
            State(state): State<Shared>,
            Path(name): Path<String>,
            Json(body): Json<Value>,
        ) -> Reply {
            let mut state = state.lock().unwrap();
            record(&mut state, "count", &body);
            match state.collections.get(&name) {
                Some(collection) => ok(json!({ "count": collection.points.len() })),
                None => not_found(&name),
            }
        }

        pub async fn spawn() -> (String, Shared) {
            let state: Shared = Arc::default();
            let app = Router::new()
                .route("/collections", get(list_collections))
                .route(
                    "/collections/:name",
                    get(collection_info).put(create_collection),
                )
                .route("/collections/:name/points", post(retrieve).put(upsert))
                .route("/collections/:name/points/search", post(search))
                .route("/collections/:name/points/scroll", post(scroll))
                .route("/collections/:name/points/delete", post(delete))
                .route("/collections/:name/points/count", post(count))
                .with_state(state.clone());
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            (format!("http://{}", addr), state)
        }
    }

    mod store_over_rest {
        use std::sync::Arc;

        use async_trait::async_trait;
        use serde_json::json;

        use super::super::*;
        use super::stub::{self, StubPoint};
        use crate::embedding::Embedder;
        use crate::knowledge::{DeleteOutcome, DocumentInput, KnowledgeStore};
        use crate::llm::{LlmProvider, TitleGenerator};

        const VECTOR: &str = "fast-bge-base-en-v1.5";

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

        struct FixedTitle;

        #[async_trait]
        impl LlmProvider for FixedTitle {
            fn name(&self) -> &str {
                "fixed"
            }

            async fn generate(&self, _prompt: &str) -> Result<String, ApiError> {
                Ok("Stub Title".to_string())
            }
        }

        fn settings(url: &str) -> VectorStoreSettings {
            VectorStoreSettings {
                url: url.to_string(),
                collection_name: "kb".to_string(),
                vector_name: VECTOR.to_string(),
                vector_size: 26,
                ..VectorStoreSettings::default()
            }
        }

        fn store(url: &str) -> KnowledgeStore {
            let settings = settings(url);
            KnowledgeStore::new(
                Arc::new(QdrantBackend::new(&settings).unwrap()),
                Arc::new(LetterEmbedder),
                TitleGenerator::new(Arc::new(FixedTitle)),
                &settings,
            )
        }

        #[tokio::test]
        async fn knowledge_store_runs_against_rest_api() {
            let (url, state) = stub::spawn().await;
            let store = store(&url);

            store.initialize().await.unwrap();
            {
                let state = state.lock().unwrap();
                let create = &state.bodies("create")[0];
                assert_eq!(create["vectors"][VECTOR], json!({ "size": 26, "distance": "Cosine" }));
            }

            for text in ["zebra zoo zigzag", "apple banana", "cherry cake"] {
                store.add(DocumentInput::Text(text.to_string())).await.unwrap();
            }
            {
                let state = state.lock().unwrap();
                let upserts = state.bodies("upsert");
                assert_eq!(upserts.len(), 3);
                let point = &upserts[0]["points"][0];
                assert!(point["id"].is_string());
                assert_eq!(point["vector"][VECTOR].as_array().map(Vec::len), Some(26));
                assert_eq!(point["payload"]["title"], json!("Stub Title"));
                assert_eq!(point["payload"]["text"], json!("zebra zoo zigzag"));
            }

            assert_eq!(store.query("zebra zoo", 1).await, ["zebra zoo zigzag"]);
            {
                let state = state.lock().unwrap();
                let search = &state.bodies("search")[0];
                assert_eq!(search["vector"]["name"], json!(VECTOR));
                assert_eq!(search["limit"], json!(1));
                assert_eq!(search["with_payload"], json!(true));
            }

            let first: Vec<String> = store.list(2, 0).await.into_iter().map(|d| d.id).collect();
            let second: Vec<String> = store.list(2, 2).await.into_iter().map(|d| d.id).collect();
            assert_eq!(first.len(), 2);
            assert_eq!(second.len(), 1);
            assert!(first.iter().all(|id| !second.contains(id)));
            {
                let state = state.lock().unwrap();
                let scrolls = state.bodies("scroll");
                assert!(scrolls.iter().all(|body| body["with_vector"] == json!(false)));
                let resumed = scrolls.last().unwrap();
                assert!(resumed.get("offset").is_some());
                assert_eq!(resumed["with_payload"], json!(true));
            }

            let stats = store.stats().await;
            assert_eq!(stats.vectors_count, 3);
            assert_eq!(stats.vector_size, 26);
            assert_eq!(stats.distance, "Cosine");
            assert_eq!(stats.status, "green");
            assert_eq!(state.lock().unwrap().bodies("count")[0]["exact"], json!(true));

            assert_eq!(store.delete(&first[0]).await, DeleteOutcome::Deleted);
            assert_eq!(store.delete(&first[0]).await, DeleteOutcome::NotFound);
            assert_eq!(store.stats().await.vectors_count, 2);

            store.delete_all().await.unwrap();
            {
                let state = state.lock().unwrap();
                let wipe = state.bodies("delete").last().cloned().unwrap();
                assert_eq!(wipe, json!({ "filter": { "must": [] } }));
            }
            assert_eq!(store.stats().await.vectors_count, 0);
        }

        #[tokio::test]
        async fn integer_point_ids_round_trip_as_numbers() {
            let (url, state) = stub::spawn().await;
            let store = store(&url);
            store.initialize().await.unwrap();
            state
                .lock()
                .unwrap()
                .collections
                .get_mut("kb")
                .unwrap()
                .points
                .insert(
                    "7".to_string(),
                    StubPoint {
                        id: json!(7),
                        vector: vec![1.0; 26],
                        payload: json!({ "text": "imported elsewhere" }),
                    },
                );

            let listed: Vec<String> = store.list(10, 0).await.into_iter().map(|d| d.id).collect();
            assert_eq!(listed, ["7"]);
            assert_eq!(store.delete("7").await, DeleteOutcome::Deleted);

            let state = state.lock().unwrap();
            assert_eq!(state.bodies("retrieve")[0]["ids"], json!([7]));
            assert_eq!(state.bodies("delete")[0]["points"], json!([7]));
            assert!(state.collections["kb"].points.is_empty());
        }

        #[tokio::test]
        async fn error_envelope_surfaces_status_message() {
            let (url, _state) = stub::spawn().await;
            let backend = QdrantBackend::new(&settings(&url)).unwrap();

            let err = backend.collection_info("missing").await.unwrap_err();
            assert!(matches!(err, ApiError::BadGateway(_)));
            assert!(err.message().contains("Collection `missing` doesn't exist"));

            let stats = store(&url).stats().await;
            assert_eq!(stats.status, "error");
            assert!(stats.error.is_some());
        }
    }

    #[tokio::test]
    #[ignore = "requires a running Qdrant on localhost:6333"]
    async fn live_round_trip() {
        let backend = QdrantBackend::new(&VectorStoreSettings::default()).unwrap();
        let collections = backend.list_collections().await.unwrap();
        assert!(collections.iter().all(|name| !name.is_empty()));
    }
}
