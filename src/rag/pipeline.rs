//! Query orchestration: embed, retrieve, prompt, generate.

use std::sync::Arc;

use serde::Serialize;

use super::prompt::{build_context, build_prompt};
use super::store::{SearchHit, VectorStore};
use crate::core::errors::ApiError;
use crate::embedding::Embedder;
use crate::llm::router::GEMINI_DEFAULT_MODEL;
use crate::llm::LlmRouter;

/// Label reported when no model was requested and Groq is configured.
pub const GROQ_REPORTED_MODEL: &str = "groq-llama3.1";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub answer: String,
    pub model_used: String,
    pub sources: Vec<String>,
    pub chunks_found: usize,
}

pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
    router: Arc<LlmRouter>,
}

impl RagPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<VectorStore>, router: Arc<LlmRouter>) -> Self {
        Self {
            embedder,
            store,
            router,
        }
    }

    /// Answers `query` from the `top_k` most similar chunks.
    ///
    /// Embedding and store failures are errors. Provider failures are folded
    /// into the answer text.
    pub async fn answer(
        &self,
        query: &str,
        model_hint: Option<&str>,
        top_k: usize,
    ) -> Result<QueryResult, ApiError> {
        let query_vector = self.embedder.embed_query(query).await?;
        let hits = self.store.search(&query_vector, top_k)?;

        let context = build_context(&hits);
        let sources = unique_sources(&hits);
        let prompt = build_prompt(&context, query);

        tracing::debug!(
            chunks = hits.len(),
            route = ?self.router.route(model_hint),
            "Retrieved context"
        );

        let answer = self.router.generate(&prompt, model_hint).await.into_answer(&prompt);

        Ok(QueryResult {
            answer,
            model_used: self.reported_model(model_hint),
            sources,
            chunks_found: hits.len(),
        })
    }

    /// The caller's hint when given, otherwise a label based on which credential
    /// is present. It does not track the provider actually called.
    pub fn reported_model(&self, model_hint: Option<&str>) -> String {
        match model_hint {
            Some(hint) if !hint.is_empty() => hint.to_string(),
            _ if self.router.credentials().groq => GROQ_REPORTED_MODEL.to_string(),
            _ => GEMINI_DEFAULT_MODEL.to_string(),
        }
    }
}

/// Non-empty source names in first-seen order.
fn unique_sources(hits: &[SearchHit]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for hit in hits {
        let source = &hit.metadata.source;
        if !source.is_empty() && !sources.contains(source) {
            sources.push(source.clone());
        }
    }
    sources
}
