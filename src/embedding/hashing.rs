use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{Embedder, EmbeddingError};
use crate::vector_math::normalize;

/// Bag-of-words feature hashing into a fixed number of signed buckets.
///
/// Texts sharing vocabulary land close together, which is enough for
/// keyword-level retrieval without a model server.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::Config(
                "hashing embedder dimension must be positive".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        normalize(&vector)
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(inputs.iter().map(|text| self.embed_one(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_math::cosine_similarity;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(HashingEmbedder::new(0).is_err());
    }

    #[test]
    fn output_is_unit_length_and_deterministic() {
        let embedder = HashingEmbedder::new(64).expect("embedder");
        let a = embedder.embed_one("Rust ownership and borrowing");
        let b = embedder.embed_one("Rust ownership and borrowing");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!((norm(&a) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let embedder = HashingEmbedder::new(128).expect("embedder");
        let a = embedder.embed_one("Vector search!");
        let b = embedder.embed_one("vector, SEARCH");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::new(384).expect("embedder");
        let query = embedder.embed_one("photosynthesis in plants");
        let related = embedder.embed_one("plants convert light by photosynthesis");
        let unrelated = embedder.embed_one("the stock market closed lower today");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::new(8).expect("embedder");
        assert!(embedder.embed_one("   ").iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn embed_preserves_input_order() {
        let embedder = HashingEmbedder::new(32).expect("embedder");
        let inputs = vec!["alpha".to_string(), "beta".to_string()];
        let vectors = embedder.embed(&inputs).await.expect("embed");
        assert_eq!(vectors[0], embedder.embed_one("alpha"));
        assert_eq!(vectors[1], embedder.embed_one("beta"));
    }
}
