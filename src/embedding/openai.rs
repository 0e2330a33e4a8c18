use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Embedder, EmbeddingError};
use crate::core::config::EmbeddingConfig;
use crate::vector_math::normalize;

/// Client for an OpenAI-compatible `POST {base_url}/embeddings` endpoint
/// (llama.cpp server, Ollama, LM Studio, OpenAI).
#[derive(Clone)]
pub struct OpenAiEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Config(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client,
        })
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let base_url = config
            .base_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                EmbeddingError::Config("embedding.base_url is required for openai".to_string())
            })?;
        Self::new(
            base_url,
            config.model.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request
            .send()
            .await
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let message = res.text().await.unwrap_or_default();
            return Err(EmbeddingError::Http { status, message });
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        let data = payload["data"]
            .as_array()
            .ok_or_else(|| EmbeddingError::Malformed("missing 'data' array".to_string()))?;

        if data.len() != inputs.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: inputs.len(),
                actual: data.len(),
            });
        }

        let mut slots: Vec<Option<Vec<f32>>> = vec![None; data.len()];
        for (position, item) in data.iter().enumerate() {
            let index = match item.get("index") {
                None | Some(Value::Null) => position,
                Some(value) => value
                    .as_u64()
                    .and_then(|i| usize::try_from(i).ok())
                    .ok_or_else(|| EmbeddingError::Malformed("invalid 'index'".to_string()))?,
            };
            let slot = slots.get_mut(index).ok_or_else(|| {
                EmbeddingError::Malformed(format!("index {} out of range", index))
            })?;
            if slot.is_some() {
                return Err(EmbeddingError::Malformed(format!("duplicate index {}", index)));
            }
            *slot = Some(parse_embedding(&item["embedding"])?);
        }

        let embeddings = slots
            .into_iter()
            .map(|slot| slot.ok_or_else(|| EmbeddingError::Malformed("missing index".to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(embeddings)
    }
}

/// Reads one `embedding` array and normalizes it. Values that do not fit in
/// `f32` are rejected.
fn parse_embedding(value: &Value) -> Result<Vec<f32>, EmbeddingError> {
    let values = value
        .as_array()
        .ok_or_else(|| EmbeddingError::Malformed("missing 'embedding' array".to_string()))?;
    let mut vector = Vec::with_capacity(values.len());
    for value in values {
        let number = value
            .as_f64()
            .map(|f| f as f32)
            .filter(|f| f.is_finite())
            .ok_or_else(|| {
                EmbeddingError::Malformed(
                    "embedding contains non-finite or non-numeric values".to_string(),
                )
            })?;
        vector.push(number);
    }
    Ok(normalize(&vector))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder_for(server: &MockServer, api_key: Option<&str>) -> OpenAiEmbedder {
        OpenAiEmbedder::new(
            format!("{}/v1/", server.uri()),
            "all-MiniLM-L6-v2".to_string(),
            api_key.map(str::to_string),
            Duration::from_secs(5),
        )
        .expect("embedder")
    }

    #[tokio::test]
    async fn embeds_and_normalizes_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer emb-key"))
            .and(body_partial_json(json!({"model": "all-MiniLM-L6-v2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"embedding": [3.0, 4.0]},
                    {"embedding": [0.0, 2.0]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedder = embedder_for(&server, Some("emb-key"));
        let vectors = embedder
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .expect("embed");

        assert_eq!(vectors.len(), 2);
        assert!((vectors[0][0] - 0.6).abs() < 1e-5);
        assert!((vectors[0][1] - 0.8).abs() < 1e-5);
        assert!((vectors[1][1] - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
            .mount(&server)
            .await;

        let err = embedder_for(&server, None)
            .embed_query("hello")
            .await
            .unwrap_err();

        match err {
            EmbeddingError::Http { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "loading model");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn count_mismatch_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let err = embedder_for(&server, None)
            .embed(&["a".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0
            }
        ));
    }

    #[tokio::test]
    async fn missing_data_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": "list"})))
            .mount(&server)
            .await;

        let err = embedder_for(&server, None)
            .embed_query("hello")
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Malformed(_)));
    }

    #[tokio::test]
    async fn results_are_ordered_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"index": 1, "embedding": [0.0, 5.0]},
                    {"index": 0, "embedding": [2.0, 0.0]}
                ]
            })))
            .mount(&server)
            .await;

        let vectors = embedder_for(&server, None)
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .expect("embed");

        assert!((vectors[0][0] - 1.0).abs() < 1e-5);
        assert!((vectors[1][1] - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn duplicate_index_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"index": 0, "embedding": [1.0]},
                    {"index": 0, "embedding": [2.0]}
                ]
            })))
            .mount(&server)
            .await;

        let err = embedder_for(&server, None)
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Malformed(_)));
    }

    #[tokio::test]
    async fn values_overflowing_f32_are_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [1e39, 1.0]}]
            })))
            .mount(&server)
            .await;

        let err = embedder_for(&server, None)
            .embed_query("hello")
            .await
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::Malformed(_)));
    }
}
