//! Retrieval-augmented generation.
//!
//! - `chunker`: fixed-window text splitting
//! - `store`: in-memory cosine-similarity vector store
//! - `ingest`: upload handling from raw bytes to indexed chunks
//! - `prompt` / `pipeline`: query answering over retrieved context

pub mod chunker;
pub mod ingest;
pub mod pipeline;
pub mod prompt;
pub mod store;

pub use chunker::{chunk_text, ChunkerConfig};
pub use ingest::{DocumentKind, IngestError, IngestReport, Ingestor};
pub use pipeline::{QueryResult, RagPipeline};
pub use store::{ChunkMetadata, SearchHit, StoreError, VectorStore};
