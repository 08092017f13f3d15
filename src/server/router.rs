use std::any::Any;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::handler::HandlerWithoutStateExt;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::core::config::settings::ServerSettings;
use crate::server::handlers::{chat, documents, extract, health};
use crate::state::AppState;

/// Room for multipart framing and the other form fields on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Creates the application router: the JSON API, the optional static
/// frontend, and the CORS, tracing and panic layers around them.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server);
    let body_limit = state.settings.uploads.max_bytes.saturating_add(MULTIPART_OVERHEAD);

    let api = Router::new()
        .route("/health", get(health::health))
        .route("/api/extract-content", post(extract::extract_content))
        .route("/api/store-document", post(documents::store_document))
        .route("/api/get-collection-stats", get(documents::get_collection_stats))
        .route("/api/get-documents", get(documents::get_documents))
        .route("/api/delete-document/:doc_id", delete(documents::delete_document))
        .route(
            "/api/delete-selected-documents",
            post(documents::delete_selected_documents),
        )
        .route("/api/delete-all-documents", post(documents::delete_all_documents))
        .route("/api/chat", post(chat::chat))
        .layer(DefaultBodyLimit::max(body_limit));

    let app = match static_dir(&state) {
        Some(dir) => {
            tracing::info!("Serving frontend from {}", dir.display());
            let files = ServeDir::new(dir)
                .append_index_html_on_directories(true)
                .call_fallback_on_method_not_allowed(true)
                .not_found_service(not_found.into_service());
            api.fallback_service(files)
        }
        None => api.fallback(not_found),
    };

    app.with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Server error" })),
    )
        .into_response()
}

fn static_dir(state: &AppState) -> Option<std::path::PathBuf> {
    let raw = state.settings.server.static_dir.as_deref()?;
    let dir = state.paths.resolve(raw);
    if dir.is_dir() {
        Some(dir)
    } else {
        tracing::debug!("Static directory {} not found, frontend disabled", dir.display());
        None
    }
}

fn build_cors_layer(settings: &ServerSettings) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(settings)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(settings: &ServerSettings) -> Vec<String> {
    let origins = settings
        .cors_allowed_origins
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins(settings.port);
    }

    origins
}

fn default_local_origins(port: u16) -> Vec<String> {
    let mut origins = vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ];
    for host in ["localhost", "127.0.0.1"] {
        let own = format!("http://{}:{}", host, port);
        if !origins.contains(&own) {
            origins.push(own);
        }
    }
    origins
}
