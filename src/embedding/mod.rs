//! Embedding backends.
//!
//! - `HashingEmbedder`: deterministic feature hashing, no model required
//! - `OpenAiEmbedder`: any OpenAI-compatible `/embeddings` endpoint

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::config::{EmbeddingConfig, EmbeddingProviderKind};
use crate::core::errors::ApiError;

mod hashing;
mod openai;

pub use hashing::HashingEmbedder;
pub use openai::OpenAiEmbedder;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Transport(String),
    #[error("embedding endpoint returned {status}: {message}")]
    Http { status: u16, message: String },
    #[error("malformed embedding response: {0}")]
    Malformed(String),
    #[error("expected {expected} embeddings, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("invalid embedding configuration: {0}")]
    Config(String),
}

impl From<EmbeddingError> for ApiError {
    fn from(err: EmbeddingError) -> Self {
        ApiError::internal(err)
    }
}

/// Maps text to unit-length vectors of a fixed dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Short identifier reported by the status endpoint.
    fn name(&self) -> &str;

    /// Embeds every input, preserving order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embeds a single query string with exactly one backend call.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        match vectors.pop() {
            Some(vector) if vectors.is_empty() => Ok(vector),
            _ => Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: vectors.len() + 1,
            }),
        }
    }
}

pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.provider {
        EmbeddingProviderKind::Hashing => Ok(Arc::new(HashingEmbedder::new(config.dimension)?)),
        EmbeddingProviderKind::OpenAi => Ok(Arc::new(OpenAiEmbedder::from_config(config)?)),
    }
}
