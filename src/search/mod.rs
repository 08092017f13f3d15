//! Web search for chat context.
//!
//! Results are rendered as `"{title}\n{snippet}\n[Source: {link}]"` so the
//! response generator can recover the source from the trailing marker.

mod providers;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::core::config::settings::{SearchProviderKind, SearchSettings};
use crate::core::errors::ApiError;

pub const NO_RESULTS: &str = "No search results found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    /// Result URL, or a label such as `Knowledge Graph`.
    pub source: String,
}

impl SearchHit {
    pub fn format(&self) -> String {
        format!("{}\n{}\n[Source: {}]", self.title, self.snippet, self.source)
    }
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Formatted result strings. Never empty: failures and empty result sets
    /// come back as a single explanatory entry.
    async fn search(&self, query: &str, num_results: usize) -> Vec<String>;
}

pub struct WebSearchClient {
    settings: SearchSettings,
    client: Client,
}

impl WebSearchClient {
    pub fn new(settings: &SearchSettings) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(ApiError::internal)?;
        Ok(Self {
            settings: settings.clone(),
            client,
        })
    }

    /// Raw hits from the configured provider. Providers without credentials
    /// fall back to DuckDuckGo, which needs none.
    pub async fn fetch(&self, query: &str, num_results: usize) -> Result<Vec<SearchHit>, ApiError> {
        let settings = &self.settings;
        match settings.provider {
            SearchProviderKind::Serper => {
                if let Some(key) = non_empty(&settings.serper_api_key) {
                    return providers::serper_search(
                        &self.client,
                        &settings.serper_url,
                        key,
                        query,
                        num_results,
                    )
                    .await;
                }
            }
            SearchProviderKind::Brave => {
                if let Some(key) = non_empty(&settings.brave_search_api_key) {
                    return providers::brave_search(&self.client, query, key, num_results).await;
                }
            }
            SearchProviderKind::Google => {
                if let (Some(key), Some(engine_id)) = (
                    non_empty(&settings.google_search_api_key),
                    non_empty(&settings.google_search_engine_id),
                ) {
                    return providers::google_search(
                        &self.client,
                        query,
                        key,
                        engine_id,
                        num_results,
                    )
                    .await;
                }
            }
            SearchProviderKind::Duckduckgo => {}
        }

        if settings.provider != SearchProviderKind::Duckduckgo {
            tracing::warn!(
                "No credentials for search provider {:?}, falling back to DuckDuckGo",
                settings.provider
            );
        }
        let mut hits = providers::duckduckgo_search(&self.client, query).await?;
        hits.truncate(num_results);
        Ok(hits)
    }
}

#[async_trait]
impl WebSearch for WebSearchClient {
    async fn search(&self, query: &str, num_results: usize) -> Vec<String> {
        render_outcome(self.fetch(query, num_results).await)
    }
}

fn render_outcome(outcome: Result<Vec<SearchHit>, ApiError>) -> Vec<String> {
    match outcome {
        Ok(hits) if hits.is_empty() => vec![NO_RESULTS.to_string()],
        Ok(hits) => hits.iter().map(SearchHit::format).collect(),
        Err(err) => {
            tracing::error!("Error during web search: {}", err);
            vec![format!("Search failed with error: {}", err.message())]
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
