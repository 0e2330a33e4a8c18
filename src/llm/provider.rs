use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Why a single provider call produced no answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("{0} not set")]
    MissingCredential(&'static str),
    /// Non-success status; `message` is the provider's own error text.
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("{0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid model name: {0}")]
    InvalidModel(String),
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "groq", "gemini")
    fn name(&self) -> &str;

    /// whether an API credential is available
    fn has_credential(&self) -> bool;

    /// single-shot generation against `model`
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, LlmError>;
}

/// Pulls a readable message out of an error body.
///
/// Tries `error.message`, then a top-level `message`, then falls back to the raw text.
pub fn extract_http_error(body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(message) = map
            .get("error")
            .and_then(|err| err.get("message"))
            .and_then(json_text)
        {
            return message;
        }
        if let Some(message) = map.get("message").and_then(json_text) {
            return message;
        }
    }
    body.to_string()
}

fn json_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
