use serde_json::{Map, Value};

use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
        validate_optional_string_field(server, "server.static_dir", "static_dir")?;
    }

    if let Some(store) = expect_optional_object(root, "vector_store")? {
        validate_enum_field(
            store,
            "vector_store.backend",
            "backend",
            &["qdrant", "memory"],
        )?;
        validate_optional_string_field(store, "vector_store.url", "url")?;
        validate_optional_string_field(store, "vector_store.api_key", "api_key")?;
        validate_non_empty_string_field(
            store,
            "vector_store.collection_name",
            "collection_name",
        )?;
        validate_non_empty_string_field(store, "vector_store.vector_name", "vector_name")?;
        validate_u64_field(
            store,
            "vector_store.vector_size",
            "vector_size",
            1,
            65_536,
        )?;
        validate_u64_field(store, "vector_store.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_enum_field(
            embedding,
            "embedding.provider",
            "provider",
            &["openai", "local"],
        )?;
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_non_empty_string_field(embedding, "embedding.model", "model")?;
        validate_optional_string_field(embedding, "embedding.api_key", "api_key")?;
        validate_u64_field(embedding, "embedding.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_non_empty_string_field(llm, "llm.base_url", "base_url")?;
        validate_non_empty_string_field(llm, "llm.model", "model")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_optional_string_field(llm, "llm.prompt_template", "prompt_template")?;
        validate_u64_field(llm, "llm.timeout_secs", "timeout_secs", 1, 3_600)?;
    }

    if let Some(search) = expect_optional_object(root, "search")? {
        validate_enum_field(
            search,
            "search.provider",
            "provider",
            &["serper", "brave", "google", "duckduckgo"],
        )?;
        validate_u64_field(search, "search.num_results", "num_results", 1, 20)?;
        for key in [
            "serper_api_key",
            "serper_url",
            "brave_search_api_key",
            "google_search_api_key",
            "google_search_engine_id",
        ] {
            validate_optional_string_field(search, &format!("search.{}", key), key)?;
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(
            retrieval,
            "retrieval.knowledge_limit",
            "knowledge_limit",
            1,
            100,
        )?;
        validate_u64_field(
            retrieval,
            "retrieval.stats_scan_limit",
            "stats_scan_limit",
            1,
            100_000,
        )?;
        validate_u64_field(
            retrieval,
            "retrieval.citation_snippet_chars",
            "citation_snippet_chars",
            1,
            10_000,
        )?;
    }

    if let Some(ingestion) = expect_optional_object(root, "ingestion")? {
        validate_u64_field(ingestion, "ingestion.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(
            ingestion,
            "ingestion.chunk_overlap",
            "chunk_overlap",
            0,
            1_000_000,
        )?;
        let size = ingestion
            .get("chunk_size")
            .and_then(|v| v.as_u64())
            .unwrap_or(4000);
        let overlap = ingestion
            .get("chunk_overlap")
            .and_then(|v| v.as_u64())
            .unwrap_or(200);
        if overlap >= size {
            return Err(ApiError::BadRequest(
                "Invalid config at 'ingestion.chunk_overlap': must be smaller than chunk_size"
                    .to_string(),
            ));
        }
    }

    if let Some(uploads) = expect_optional_object(root, "uploads")? {
        validate_u64_field(uploads, "uploads.max_bytes", "max_bytes", 1, 1 << 32)?;
        if let Some(extensions) = expect_optional_object(uploads, "allowed_extensions")? {
            for key in extensions.keys() {
                validate_string_array_field(
                    extensions,
                    &format!("uploads.allowed_extensions.{}", key),
                    key,
                )?;
            }
        }
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_non_empty_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    match section.get(key) {
        None | Some(Value::Null) | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(config_type_error(path, "string")),
    }
}

fn validate_enum_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if !allowed.contains(&text) {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': expected one of {}",
            path,
            allowed.join(", ")
        )));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_and_null_sections() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({ "llm": null, "search": { "serper_api_key": null } })).is_ok());
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = validate_config(&json!({ "vector_store": { "backend": "chroma" } })).unwrap_err();
        assert!(err.message().contains("vector_store.backend"));
    }

    #[test]
    fn rejects_zero_vector_size() {
        let err = validate_config(&json!({ "vector_store": { "vector_size": 0 } })).unwrap_err();
        assert!(err.message().contains("vector_store.vector_size"));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk() {
        let err = validate_config(&json!({
            "ingestion": { "chunk_size": 100, "chunk_overlap": 100 }
        }))
        .unwrap_err();
        assert!(err.message().contains("chunk_overlap"));
    }

    #[test]
    fn rejects_non_string_mime_entry() {
        let err = validate_config(&json!({
            "uploads": { "allowed_extensions": { "txt": ["text/plain", 3] } }
        }))
        .unwrap_err();
        assert!(err.message().contains("uploads.allowed_extensions.txt[1]"));
    }

    #[test]
    fn rejects_non_object_root() {
        assert!(validate_config(&json!([1, 2])).is_err());
    }
}
