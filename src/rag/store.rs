//! In-memory vector store with brute-force cosine search.
//!
//! Records are kept in insertion order. Vectors are normalized once on insert
//! and laid out as one row-major matrix, so a query is a single dense
//! matrix-vector product followed by a stable sort.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::errors::ApiError;
use crate::vector_math::{is_finite, matrix_scores, normalize, rank_descending};

/// Metadata stored next to each vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Name of the owning document.
    pub source: String,
    /// Zero-based chunk index within the document.
    pub chunk_id: usize,
    /// Raw chunk text.
    pub text: String,
}

/// A copy of stored metadata plus its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub metadata: ChunkMetadata,
    pub similarity: f32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("vectors and metadatas differ in length ({vectors} != {metadatas})")]
    LengthMismatch { vectors: usize, metadatas: usize },
    #[error("vector dimension {actual} does not match store dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("vectors must not be empty")]
    EmptyVector,
    #[error("vector contains NaN or infinite components")]
    NonFinite,
    #[error("vector store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::internal(err)
    }
}

#[derive(Default)]
struct StoreInner {
    dimension: Option<usize>,
    /// Normalized vectors, one row per record.
    matrix: Vec<f32>,
    metadatas: Vec<ChunkMetadata>,
}

impl StoreInner {
    fn len(&self) -> usize {
        self.metadatas.len()
    }
}

/// Append-only store of (vector, metadata) records.
///
/// The first insert fixes the dimension; later vectors of another length are
/// rejected instead of being appended.
#[derive(Default)]
pub struct VectorStore {
    inner: RwLock<StoreInner>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `vectors[i]` paired with `metadatas[i]`. Returns the new record count.
    ///
    /// The whole batch is checked before anything is written.
    pub fn add(
        &self,
        vectors: Vec<Vec<f32>>,
        metadatas: Vec<ChunkMetadata>,
    ) -> Result<usize, StoreError> {
        if vectors.len() != metadatas.len() {
            return Err(StoreError::LengthMismatch {
                vectors: vectors.len(),
                metadatas: metadatas.len(),
            });
        }

        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if vectors.is_empty() {
            return Ok(inner.len());
        }

        let expected = match inner.dimension {
            Some(dim) => dim,
            None => vectors[0].len(),
        };
        if expected == 0 {
            return Err(StoreError::EmptyVector);
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }
        if !vectors.iter().all(|v| is_finite(v)) {
            return Err(StoreError::NonFinite);
        }

        inner.dimension = Some(expected);
        inner.matrix.reserve(vectors.len() * expected);
        for vector in &vectors {
            let row = normalize(vector);
            inner.matrix.extend_from_slice(&row);
        }
        inner.metadatas.extend(metadatas);

        Ok(inner.len())
    }

    /// Returns at most `k` records ordered by descending cosine similarity.
    ///
    /// Equal scores keep insertion order. An empty store returns no hits.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let Some(dimension) = inner.dimension else {
            return Ok(Vec::new());
        };
        if inner.metadatas.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != dimension {
            return Err(StoreError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
        if !is_finite(query) {
            return Err(StoreError::NonFinite);
        }

        let query = normalize(query);
        let scores = matrix_scores(&inner.matrix, dimension, &query);

        let hits = rank_descending(&scores)
            .into_iter()
            .take(k)
            .map(|idx| SearchHit {
                metadata: inner.metadatas[idx].clone(),
                similarity: scores[idx],
            })
            .collect();

        Ok(hits)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension fixed by the first insert, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().ok().and_then(|inner| inner.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(source: &str, chunk_id: usize, text: &str) -> ChunkMetadata {
        ChunkMetadata {
            source: source.to_string(),
            chunk_id,
            text: text.to_string(),
        }
    }

    #[test]
    fn empty_store_returns_nothing() {
        let store = VectorStore::new();
        let hits = store.search(&[0.1, 0.2, 0.3], 5).expect("search");
        assert!(hits.is_empty());
        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);
    }

    #[test]
    fn results_are_ranked_and_truncated_to_k() {
        let store = VectorStore::new();
        store
            .add(
                vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]],
                vec![meta("a", 0, "up"), meta("a", 1, "right"), meta("b", 0, "diag")],
            )
            .expect("add");

        let hits = store.search(&[1.0, 0.1], 2).expect("search");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.text, "right");
        assert_eq!(hits[1].metadata.text, "diag");
        assert!(hits[0].similarity >= hits[1].similarity);
    }

    #[test]
    fn k_larger_than_store_returns_everything() {
        let store = VectorStore::new();
        store
            .add(vec![vec![1.0, 0.0]], vec![meta("a", 0, "only")])
            .expect("add");
        assert_eq!(store.search(&[1.0, 0.0], 10).expect("search").len(), 1);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let store = VectorStore::new();
        store
            .add(
                vec![vec![0.5, 0.5, 0.0], vec![0.5, 0.5, 0.0]],
                vec![meta("doc", 0, "A"), meta("doc", 1, "B")],
            )
            .expect("add");

        let hits = store.search(&[0.5, 0.5, 0.0], 2).expect("search");

        assert_eq!(hits[0].metadata.text, "A");
        assert_eq!(hits[1].metadata.text, "B");
    }

    #[test]
    fn identical_vector_scores_one_orthogonal_scores_zero() {
        let store = VectorStore::new();
        store
            .add(
                vec![vec![3.0, 4.0], vec![-4.0, 3.0]],
                vec![meta("a", 0, "same"), meta("a", 1, "orthogonal")],
            )
            .expect("add");

        let hits = store.search(&[3.0, 4.0], 2).expect("search");

        assert!((hits[0].similarity - 1.0).abs() < 1e-5);
        assert!(hits[1].similarity.abs() < 1e-5);
    }

    #[test]
    fn zero_vector_scores_zero_without_nan() {
        let store = VectorStore::new();
        store
            .add(vec![vec![0.0, 0.0]], vec![meta("a", 0, "zero")])
            .expect("add");
        let hits = store.search(&[1.0, 0.0], 1).expect("search");
        assert_eq!(hits[0].similarity, 0.0);
    }

    #[test]
    fn length_mismatch_is_rejected_without_writing() {
        let store = VectorStore::new();
        let err = store
            .add(vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![meta("a", 0, "x")])
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::LengthMismatch {
                vectors: 2,
                metadatas: 1
            }
        );
        assert!(store.is_empty());
    }

    #[test]
    fn dimension_is_fixed_by_first_insert() {
        let store = VectorStore::new();
        store
            .add(vec![vec![1.0, 0.0, 0.0]], vec![meta("a", 0, "x")])
            .expect("add");

        let err = store
            .add(vec![vec![1.0, 0.0]], vec![meta("b", 0, "y")])
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
        assert_eq!(store.len(), 1);

        let err = store.search(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
    }

    #[test]
    fn non_finite_vectors_are_rejected_and_search_keeps_working() {
        let store = VectorStore::new();
        store
            .add(vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![meta("a", 0, "x"), meta("a", 1, "y")])
            .expect("add");

        let err = store
            .add(
                vec![vec![0.5, 0.5], vec![f32::INFINITY, 1.0]],
                vec![meta("b", 0, "ok"), meta("b", 1, "inf")],
            )
            .unwrap_err();
        assert_eq!(err, StoreError::NonFinite);
        let err = store
            .add(vec![vec![f32::NAN, 0.0]], vec![meta("c", 0, "nan")])
            .unwrap_err();
        assert_eq!(err, StoreError::NonFinite);
        assert_eq!(store.len(), 2);

        let hits = store.search(&[1.0, 0.0], 10).expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.text, "x");

        let err = store.search(&[f32::INFINITY, 0.0], 1).unwrap_err();
        assert_eq!(err, StoreError::NonFinite);
    }

    #[test]
    fn search_returns_copies_not_store_state() {
        let store = VectorStore::new();
        store
            .add(vec![vec![1.0, 0.0]], vec![meta("a", 0, "original")])
            .expect("add");

        let mut hits = store.search(&[1.0, 0.0], 1).expect("search");
        hits[0].metadata.text.push_str(" mutated");

        let again = store.search(&[1.0, 0.0], 1).expect("search");
        assert_eq!(again[0].metadata.text, "original");
    }

    #[test]
    fn hit_serializes_flat_with_similarity() {
        let hit = SearchHit {
            metadata: meta("notes.md", 2, "body"),
            similarity: 0.5,
        };
        let value = serde_json::to_value(&hit).expect("serialize");
        assert_eq!(
            value,
            serde_json::json!({"source": "notes.md", "chunk_id": 2, "text": "body", "similarity": 0.5})
        );
    }
}
