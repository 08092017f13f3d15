use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::core::errors::ApiError;
use crate::knowledge::{DeleteOutcome, DocumentInput, SourceType};
use crate::server::handlers::utils::{format_file_size, json_body};
use crate::state::AppState;

const DEFAULT_PAGE: usize = 1;
const DEFAULT_PER_PAGE: usize = 5;
const DEFAULT_SOURCE: &str = "User input";

#[derive(Debug, Deserialize)]
pub struct StoreDocumentRequest {
    pub text: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteSelectedRequest {
    pub ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAllRequest {
    #[serde(default)]
    pub confirm: bool,
}

pub async fn store_document(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StoreDocumentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_body(payload)?;

    let text = request
        .text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No text provided".to_string()))?;

    let source_type = match request.source_type.as_deref() {
        Some(raw) if !raw.trim().is_empty() => SourceType::from_str(raw)?,
        _ => SourceType::Manual,
    };
    let source = request
        .source
        .filter(|source| !source.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

    let mut metadata = Map::new();
    if let Some(title) = request.title.filter(|title| !title.trim().is_empty()) {
        metadata.insert("title".to_string(), Value::String(title));
    }
    metadata.insert(
        "source_type".to_string(),
        Value::String(source_type.as_str().to_string()),
    );
    metadata.insert("source".to_string(), Value::String(source));

    let id = state
        .knowledge
        .add(DocumentInput::Structured { text, metadata })
        .await
        .map_err(|err| {
            tracing::error!("Error storing document: {}", err);
            err
        })?;

    Ok(Json(json!({ "success": true, "id": id })))
}

pub async fn get_collection_stats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.knowledge.stats().await;
    if let Some(error) = stats.error.clone() {
        return Err(ApiError::Internal(error));
    }

    let total_size = state
        .knowledge
        .total_size(state.settings.retrieval.stats_scan_limit)
        .await;

    let mut body = serde_json::to_value(&stats).map_err(ApiError::internal)?;
    if let Some(map) = body.as_object_mut() {
        map.insert("total_size".to_string(), json!(total_size));
        map.insert(
            "total_size_formatted".to_string(),
            json!(format_file_size(total_size)),
        );
    }
    Ok(Json(body))
}

pub async fn get_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let page = positive_param(&params, "page", DEFAULT_PAGE)?;
    let per_page = positive_param(&params, "per_page", DEFAULT_PER_PAGE)?;

    let offset = (page - 1).saturating_mul(per_page);
    let documents = state.knowledge.list(per_page, offset).await;
    let total = state.knowledge.stats().await.vectors_count;

    Ok(Json(json!({
        "documents": documents,
        "total": total,
        "page": page,
        "per_page": per_page,
        "total_pages": total.div_ceil(per_page as u64),
    })))
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(doc_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.knowledge.delete(&doc_id).await {
        DeleteOutcome::Deleted => Ok(Json(json!({ "success": true }))),
        DeleteOutcome::NotFound => Err(ApiError::NotFound(format!(
            "Document {} not found",
            doc_id
        ))),
        DeleteOutcome::Failed(reason) => Err(ApiError::Internal(format!(
            "Failed to delete document: {}",
            reason
        ))),
    }
}

pub async fn delete_selected_documents(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteSelectedRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let ids = json_body(payload)?
        .ids
        .ok_or_else(|| ApiError::BadRequest("No document IDs provided".to_string()))?;

    let mut deleted_count = 0usize;
    for id in &ids {
        match state.knowledge.delete(id).await {
            DeleteOutcome::Deleted => deleted_count += 1,
            DeleteOutcome::NotFound => tracing::debug!("Document {} already absent", id),
            DeleteOutcome::Failed(reason) => {
                tracing::warn!("Failed to delete document {}: {}", id, reason)
            }
        }
    }

    Ok(Json(json!({
        "success": true,
        "deleted_count": deleted_count,
        "total_requested": ids.len(),
    })))
}

pub async fn delete_all_documents(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteAllRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    if !json_body(payload)?.confirm {
        return Err(ApiError::BadRequest(
            "Deleting all documents requires {\"confirm\": true}".to_string(),
        ));
    }
    state.knowledge.delete_all().await?;
    Ok(Json(json!({ "success": true })))
}

fn positive_param(
    params: &HashMap<String, String>,
    key: &str,
    default: usize,
) -> Result<usize, ApiError> {
    match params.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|value| *value >= 1)
            .ok_or_else(|| {
                ApiError::BadRequest(format!("'{}' must be a positive integer", key))
            }),
    }
}
