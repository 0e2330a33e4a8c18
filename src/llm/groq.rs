use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{extract_http_error, LlmError, LlmProvider};
use super::types::{ChatMessage, GenerationParams, SYSTEM_INSTRUCTION};

pub const GROQ_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Groq's OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct GroqProvider {
    base_url: String,
    api_key: Option<String>,
    params: GenerationParams,
    client: Client,
}

impl GroqProvider {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        params: GenerationParams,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            params,
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingCredential(GROQ_API_KEY_ENV))?;

        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": model,
            "messages": [
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(prompt),
            ],
            "temperature": self.params.temperature,
            "max_tokens": self.params.max_tokens,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status,
                message: extract_http_error(&text),
            });
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| LlmError::Malformed("missing choices[0].message.content".to_string()))
    }
}
