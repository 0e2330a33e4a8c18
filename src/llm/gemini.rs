use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{extract_http_error, LlmError, LlmProvider};
use super::types::{GenerationParams, SYSTEM_INSTRUCTION};

pub const GEMINI_API_KEY_ENV: &str = "GOOGLE_AI_API_KEY";

/// Google Generative Language `generateContent` API.
#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: Option<String>,
    params: GenerationParams,
    client: Client,
}

impl GeminiProvider {
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
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, LlmError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingCredential(GEMINI_API_KEY_ENV))?;
        if !is_valid_model_name(model) {
            return Err(LlmError::InvalidModel(model.to_string()));
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION }] },
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.params.temperature,
                "maxOutputTokens": self.params.max_tokens,
            },
        });

        let res = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.without_url().to_string()))?;

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
            .map_err(|e| LlmError::Malformed(e.without_url().to_string()))?;

        payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| {
                LlmError::Malformed("missing candidates[0].content.parts[0].text".to_string())
            })
    }
}

/// The model is a path segment, so only plain identifier characters pass.
fn is_valid_model_name(model: &str) -> bool {
    !model.is_empty()
        && model
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}
