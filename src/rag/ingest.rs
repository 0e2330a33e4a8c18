//! Document ingestion: type check, text extraction, chunking, embedding and indexing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use super::chunker::ChunkerConfig;
use super::store::{ChunkMetadata, StoreError, VectorStore};
use crate::core::errors::ApiError;
use crate::embedding::{Embedder, EmbeddingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Markdown,
}

impl DocumentKind {
    /// Case-insensitive match on the file extension.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" => Some(DocumentKind::Text),
            "md" => Some(DocumentKind::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "txt",
            DocumentKind::Markdown => "md",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{0}")]
    Pdf(String),
    #[error("extraction task failed: {0}")]
    Join(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Missing filename")]
    MissingFilename,
    #[error("Only PDF/TXT/MD supported")]
    UnsupportedType,
    #[error("Failed to parse file: {0}")]
    Parse(#[from] ExtractionError),
    #[error("No extractable text found")]
    NoText,
    #[error("Failed to save upload: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::MissingFilename
            | IngestError::UnsupportedType
            | IngestError::Parse(_)
            | IngestError::NoText => ApiError::bad_request(err),
            IngestError::Io(_) | IngestError::Embedding(_) | IngestError::Store(_) => {
                ApiError::internal(err)
            }
        }
    }
}

/// Decodes text files as UTF-8, dropping invalid sequences. PDFs go through
/// `pdf-extract` on the blocking pool.
pub async fn extract_text(kind: DocumentKind, bytes: Vec<u8>) -> Result<String, ExtractionError> {
    match kind {
        DocumentKind::Text | DocumentKind::Markdown => Ok(decode_utf8_ignoring_invalid(&bytes)),
        DocumentKind::Pdf => {
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| ExtractionError::Join(e.to_string()))?
                .map_err(|e| ExtractionError::Pdf(e.to_string()))
        }
    }
}

fn decode_utf8_ignoring_invalid(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub source: String,
    pub chunks: usize,
    pub saved_path: PathBuf,
}

pub struct Ingestor {
    chunker: ChunkerConfig,
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
    uploads_dir: PathBuf,
}

impl Ingestor {
    pub fn new(
        chunker: ChunkerConfig,
        embedder: Arc<dyn Embedder>,
        store: Arc<VectorStore>,
        uploads_dir: PathBuf,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            uploads_dir,
        }
    }

    /// Indexes one uploaded document and returns how many chunks were stored.
    ///
    /// The raw bytes are kept under `uploads_dir` with a random name. Chunks are
    /// attributed to the uploaded file's base name.
    pub async fn ingest(&self, filename: &str, bytes: Vec<u8>) -> Result<IngestReport, IngestError> {
        let source = base_name(filename).ok_or(IngestError::MissingFilename)?;
        let kind = DocumentKind::from_filename(&source).ok_or(IngestError::UnsupportedType)?;

        let saved_path = self
            .uploads_dir
            .join(format!("{}.{}", Uuid::new_v4().simple(), kind.extension()));
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        tokio::fs::write(&saved_path, &bytes).await?;

        let text = extract_text(kind, bytes).await?;
        let chunks = self.chunker.chunk(&text);
        if chunks.is_empty() {
            return Err(IngestError::NoText);
        }

        let vectors = self.embedder.embed(&chunks).await?;
        let metadatas = chunks
            .into_iter()
            .enumerate()
            .map(|(chunk_id, text)| ChunkMetadata {
                source: source.clone(),
                chunk_id,
                text,
            })
            .collect::<Vec<_>>();
        let count = self.store.add(vectors, metadatas)?;

        tracing::info!(
            source = %source,
            chunks = count,
            total = self.store.len(),
            "Indexed document"
        );

        Ok(IngestReport {
            source,
            chunks: count,
            saved_path,
        })
    }
}

/// Last path component of a client-supplied filename, accepting either separator.
fn base_name(filename: &str) -> Option<String> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
