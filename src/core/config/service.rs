use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 6] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "credential",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 2] = ["max_tokens", "tokens"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("COGITO_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Raw merged view of `config.yml` and `secrets.yaml`. Missing files count as empty.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        Ok(deep_merge(&public_config, &secrets_config))
    }

    /// Validated, typed configuration with process environment overrides applied.
    pub fn load_settings(&self) -> Result<AppConfig, ApiError> {
        let merged = self.load_config()?;
        let mut settings = settings_from_value(&merged)?;
        settings.apply_env_overrides(|key| env::var(key).ok());
        Ok(settings)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

pub fn settings_from_value(value: &Value) -> Result<AppConfig, ApiError> {
    validate_config(value)?;
    serde_json::from_value(value.clone()).map_err(ApiError::bad_request)
}

fn load_yaml_file(path: &Path) -> Result<Value, ApiError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ApiError::Internal(format!("Failed to read {}: {}", path.display(), e))
    })?;
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    match serde_yaml::from_str::<Value>(&contents) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(Value::Null) => Ok(Value::Object(Map::new())),
        Ok(_) => Err(ApiError::BadRequest(format!(
            "Invalid config in {}: top level must be a mapping",
            path.display()
        ))),
        Err(e) => Err(ApiError::BadRequest(format!(
            "Invalid YAML in {}: {}",
            path.display(),
            e
        ))),
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

    fn service_in(dir: &Path) -> ConfigService {
        let paths = AppPaths::with_data_dir(dir.to_path_buf(), dir.join("data"));
        ConfigService::new(Arc::new(paths))
    }

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "llm": { "timeout_secs": 60, "groq_base_url": "https://a" },
            "rag": { "chunk_size": 800 }
        });
        let secrets = json!({
            "llm": { "groq_api_key": "gsk" },
            "rag": { "chunk_size": 500 }
        });

        let merged = deep_merge(&base, &secrets);

        assert_eq!(
            merged,
            json!({
                "llm": { "timeout_secs": 60, "groq_base_url": "https://a", "groq_api_key": "gsk" },
                "rag": { "chunk_size": 500 }
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": {
                "groq_api_key": "gsk",
                "gemini_api_key": null,
                "max_tokens": 1024
            }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": {
                    "groq_api_key": "****",
                    "gemini_api_key": null,
                    "max_tokens": 1024
                }
            })
        );
    }

    #[test]
    fn missing_files_yield_defaults() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let service = service_in(tmp.path());

        let value = service.load_config().expect("load");
        let settings = settings_from_value(&value).expect("settings");

        assert_eq!(settings.rag.chunk_size, 800);
    }

    #[test]
    fn secrets_file_is_merged_over_config() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let service = service_in(tmp.path());
        fs::write(
            tmp.path().join("data").join("config.yml"),
            "rag:\n  chunk_size: 400\nllm:\n  timeout_secs: 30\n",
        )
        .expect("write config");
        fs::write(
            service.secrets_path(),
            "llm:\n  gemini_api_key: from-secrets\n",
        )
        .expect("write secrets");

        let settings = settings_from_value(&service.load_config().expect("load")).expect("typed");

        assert_eq!(settings.rag.chunk_size, 400);
        assert_eq!(settings.llm.timeout_secs, 30);
        assert_eq!(settings.llm.gemini_api_key.as_deref(), Some("from-secrets"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let service = service_in(tmp.path());
        fs::write(tmp.path().join("data").join("config.yml"), "rag: [unclosed")
            .expect("write config");

        assert!(service.load_config().is_err());
    }
}
