use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[source] anyhow::Error),

    #[error("Failed to initialize embedder: {0}")]
    Embedding(#[source] anyhow::Error),

    #[error("Failed to initialize LLM router: {0}")]
    Llm(#[source] anyhow::Error),
}
