use reqwest::Client;
use serde_json::{json, Value};

use super::SearchHit;
use crate::core::errors::ApiError;

pub const KNOWLEDGE_GRAPH_SOURCE: &str = "Knowledge Graph";

pub async fn serper_search(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    query: &str,
    num_results: usize,
) -> Result<Vec<SearchHit>, ApiError> {
    let response = client
        .post(endpoint)
        .header("X-API-KEY", api_key)
        .json(&json!({ "q": query, "num": num_results }))
        .send()
        .await
        .map_err(ApiError::upstream)?;

    if !response.status().is_success() {
        return Err(ApiError::BadGateway(format!(
            "Serper search failed with status code {}",
            response.status().as_u16()
        )));
    }

    let payload: Value = response.json().await.map_err(ApiError::upstream)?;
    Ok(parse_serper(&payload, num_results))
}

pub(crate) fn parse_serper(payload: &Value, num_results: usize) -> Vec<SearchHit> {
    let mut results: Vec<SearchHit> = payload
        .get("organic")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .take(num_results)
                .map(|item| SearchHit {
                    title: str_or(item, "title", "No title"),
                    snippet: str_or(item, "snippet", "No description"),
                    source: str_or(item, "link", "No link"),
                })
                .collect()
        })
        .unwrap_or_default();

    if results.len() < num_results {
        if let Some(kg) = payload.get("knowledge_graph").filter(|v| v.is_object()) {
            results.push(SearchHit {
                title: str_or(kg, "title", KNOWLEDGE_GRAPH_SOURCE),
                snippet: str_or(kg, "description", "No description"),
                source: KNOWLEDGE_GRAPH_SOURCE.to_string(),
            });
        }
    }

    results
}

pub async fn google_search(
    client: &Client,
    query: &str,
    api_key: &str,
    engine_id: &str,
    num_results: usize,
) -> Result<Vec<SearchHit>, ApiError> {
    let url = format!(
        "https://www.googleapis.com/customsearch/v1?key={}&cx={}&q={}&num={}",
        urlencoding::encode(api_key),
        urlencoding::encode(engine_id),
        urlencoding::encode(query),
        num_results.clamp(1, 10)
    );

    let response = client.get(url).send().await.map_err(ApiError::upstream)?;

    if !response.status().is_success() {
        return Err(ApiError::BadGateway(format!(
            "Google search failed: {}",
            response.status()
        )));
    }

    let payload: Value = response.json().await.map_err(ApiError::upstream)?;
    let items = payload
        .get("items")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut results = Vec::new();
    for item in items {
        let title = str_or(&item, "title", "");
        let url = str_or(&item, "link", "");
        if !title.is_empty() && !url.is_empty() {
            results.push(SearchHit {
                title,
                snippet: str_or(&item, "snippet", ""),
                source: url,
            });
        }
    }

    Ok(results)
}

pub async fn duckduckgo_search(client: &Client, query: &str) -> Result<Vec<SearchHit>, ApiError> {
    let url = format!(
        "https://api.duckduckgo.com/?q={}&format=json&no_redirect=1&no_html=1",
        urlencoding::encode(query)
    );

    let response = client.get(url).send().await.map_err(ApiError::upstream)?;

    if !response.status().is_success() {
        return Err(ApiError::BadGateway(format!(
            "DuckDuckGo search failed: {}",
            response.status()
        )));
    }

    let payload: Value = response.json().await.map_err(ApiError::upstream)?;
    Ok(parse_duckduckgo(&payload))
}

pub(crate) fn parse_duckduckgo(payload: &Value) -> Vec<SearchHit> {
    let mut results = Vec::new();

    if let Some(abstract_text) = payload.get("AbstractText").and_then(|v| v.as_str()) {
        if let Some(url) = payload.get("AbstractURL").and_then(|v| v.as_str()) {
            if !abstract_text.is_empty() && !url.is_empty() {
                let heading = payload
                    .get("Heading")
                    .and_then(|v| v.as_str())
                    .filter(|h| !h.is_empty())
                    .unwrap_or_else(|| abstract_text.split(" - ").next().unwrap_or(abstract_text));
                results.push(SearchHit {
                    title: heading.to_string(),
                    snippet: abstract_text.to_string(),
                    source: url.to_string(),
                });
            }
        }
    }

    if let Some(items) = payload.get("Results").and_then(|v| v.as_array()) {
        extract_ddg_topics(items, &mut results);
    }
    if let Some(items) = payload.get("RelatedTopics").and_then(|v| v.as_array()) {
        extract_ddg_topics(items, &mut results);
    }

    results
}

fn extract_ddg_topics(items: &[Value], results: &mut Vec<SearchHit>) {
    for item in items {
        if let Some(topics) = item.get("Topics").and_then(|v| v.as_array()) {
            extract_ddg_topics(topics, results);
            continue;
        }
        let text = item.get("Text").and_then(|v| v.as_str()).unwrap_or("");
        let url = item.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
        if text.is_empty() || url.is_empty() {
            continue;
        }
        results.push(SearchHit {
            title: text.split(" - ").next().unwrap_or(text).to_string(),
            snippet: text.to_string(),
            source: url.to_string(),
        });
    }
}

pub async fn brave_search(
    client: &Client,
    query: &str,
    api_key: &str,
    num_results: usize,
) -> Result<Vec<SearchHit>, ApiError> {
    let url = format!(
        "https://api.search.brave.com/res/v1/web/search?q={}&count={}",
        urlencoding::encode(query),
        num_results.clamp(1, 20)
    );

    let response = client
        .get(url)
        .header("X-Subscription-Token", api_key)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(ApiError::upstream)?;

    if !response.status().is_success() {
        return Err(ApiError::BadGateway(format!(
            "Brave search failed: {}",
            response.status()
        )));
    }

    let payload: Value = response.json().await.map_err(ApiError::upstream)?;
    let mut results = Vec::new();

    if let Some(items) = payload
        .get("web")
        .and_then(|w| w.get("results"))
        .and_then(|v| v.as_array())
    {
        for item in items {
            let title = str_or(item, "title", "");
            let url = str_or(item, "url", "");
            if !title.is_empty() && !url.is_empty() {
                results.push(SearchHit {
                    title,
                    snippet: str_or(item, "description", ""),
                    source: url,
                });
            }
        }
    }

    Ok(results)
}

fn str_or(item: &Value, key: &str, default: &str) -> String {
    item.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}
