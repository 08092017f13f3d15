use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::llm::ChatAnswer;
use crate::server::handlers::utils::json_body;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    #[serde(default = "enabled")]
    pub use_knowledge_search: bool,
    #[serde(default)]
    pub use_web_search: bool,
}

fn enabled() -> bool {
    true
}

/// Answers one chat turn. Retrieval failures degrade to fewer sources and an
/// LLM failure to the apology text, so a well-formed request always gets 200.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let ChatRequest {
        message,
        use_knowledge_search,
        use_web_search,
    } = json_body(payload)?;
    let message = message
        .filter(|message| !message.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("No message provided".to_string()))?;

    let knowledge = async {
        if use_knowledge_search {
            state
                .knowledge
                .query(&message, state.settings.retrieval.knowledge_limit)
                .await
        } else {
            Vec::new()
        }
    };
    let web = async {
        if use_web_search {
            state
                .search
                .search(&message, state.settings.search.num_results)
                .await
        } else {
            Vec::new()
        }
    };
    let (knowledge_results, web_results) = tokio::join!(knowledge, web);

    tracing::info!(
        "Chat turn with {} knowledge and {} web results",
        knowledge_results.len(),
        web_results.len()
    );

    let answer: ChatAnswer = state
        .responder
        .generate(&message, &knowledge_results, &web_results)
        .await;
    Ok(Json(answer))
}
