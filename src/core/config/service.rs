use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 10] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "access_key",
    "bearer",
    "engine_id",
];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "tokens"];

/// Environment variables recognised on top of the YAML files, with the
/// configuration path each one overrides.
const ENV_OVERRIDES: [(&str, &[&str]); 9] = [
    ("QDRANT_URL", &["vector_store", "url"]),
    ("QDRANT_API_KEY", &["vector_store", "api_key"]),
    ("QDRANT_COLLECTION_NAME", &["vector_store", "collection_name"]),
    ("GOOGLE_API_KEY", &["llm", "api_key"]),
    ("SERPER_API_KEY", &["search", "serper_api_key"]),
    ("EMBEDDING_BASE_URL", &["embedding", "base_url"]),
    ("EMBEDDING_API_KEY", &["embedding", "api_key"]),
    ("HOST", &["server", "host"]),
    ("PORT", &["server", "port"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("LORE_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Public config deep-merged with secrets, before environment overrides.
    pub fn load_config(&self) -> Value {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        deep_merge(&public_config, &secrets_config)
    }

    /// Loads, overrides from the process environment, validates and types the configuration.
    pub fn load_settings(&self) -> Result<Settings, ApiError> {
        let mut config = self.load_config();
        apply_env_overrides(&mut config, |key| env::var(key).ok());
        settings_from_value(config)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

pub fn settings_from_value(config: Value) -> Result<Settings, ApiError> {
    validate_config(&config)?;
    serde_json::from_value(config)
        .map_err(|e| ApiError::BadRequest(format!("Invalid configuration: {}", e)))
}

pub fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (key, path) in ENV_OVERRIDES {
        let Some(raw) = lookup(key) else {
            continue;
        };
        let raw = raw.trim().to_string();
        if raw.is_empty() {
            continue;
        }
        let value = match raw.parse::<u64>() {
            Ok(number) if key == "PORT" => Value::from(number),
            _ => Value::String(raw),
        };
        tracing::debug!("Applying {} override", key);
        ensure_object_path(config, path, value);
    }
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }
    if !config.is_object() {
        *config = Value::Object(Map::new());
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => Value::Object(Map::new()),
            Err(err) => {
                tracing::warn!("Ignoring unparsable config file {}: {}", path.display(), err);
                Value::Object(Map::new())
            }
        },
        Err(_) => Value::Object(Map::new()),
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    use crate::core::config::settings::VectorBackendKind;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "b": { "c": 99 },
            "arr": [3],
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "arr": [3],
                "e": "x"
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": { "api_key": "secret", "model": "gemini-2.0-flash" },
            "search": {
                "serper_api_key": "key",
                "google_search_engine_id": "cx",
                "num_results": 3
            }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": { "api_key": "****", "model": "gemini-2.0-flash" },
                "search": {
                    "serper_api_key": "****",
                    "google_search_engine_id": "****",
                    "num_results": 3
                }
            })
        );
    }

    #[test]
    fn env_overrides_create_missing_sections() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("QDRANT_URL", "https://qdrant.example:6333"),
            ("GOOGLE_API_KEY", "g-key"),
            ("PORT", "8080"),
            ("SERPER_API_KEY", "  "),
        ]);
        let mut config = json!({ "vector_store": { "collection_name": "kb" } });

        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(
            config,
            json!({
                "vector_store": {
                    "collection_name": "kb",
                    "url": "https://qdrant.example:6333"
                },
                "llm": { "api_key": "g-key" },
                "server": { "port": 8080 }
            })
        );
    }

    #[test]
    fn load_settings_merges_secrets_file() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_dirs(
            tmp.path().to_path_buf(),
            tmp.path().to_path_buf(),
        ));
        fs::write(
            tmp.path().join("config.yml"),
            "vector_store:\n  backend: memory\n  collection_name: notes\n",
        )
        .unwrap();
        fs::write(tmp.path().join("secrets.yaml"), "llm:\n  api_key: from-secrets\n").unwrap();

        let service = ConfigService::new(paths);
        let mut config = service.load_config();
        apply_env_overrides(&mut config, |_| None);
        let settings = settings_from_value(config).unwrap();

        assert_eq!(settings.vector_store.backend, VectorBackendKind::Memory);
        assert_eq!(settings.vector_store.collection_name, "notes");
        assert_eq!(settings.llm.api_key.as_deref(), Some("from-secrets"));
    }

    #[test]
    fn invalid_yaml_falls_back_to_empty_config() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.yml");
        fs::write(&path, "server: [unclosed").unwrap();
        assert_eq!(load_yaml_file(&path), json!({}));
    }
}
