//! Fixed-window character chunker.

use serde::{Deserialize, Serialize};

use crate::core::config::RagConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Characters repeated at the start of the next chunk
    pub overlap: usize,
}

impl From<&RagConfig> for ChunkerConfig {
    fn from(config: &RagConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }
}

impl ChunkerConfig {
    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.chunk_size, self.overlap)
    }
}

/// Collapses every whitespace run (newlines included) to one space and trims both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits whitespace-normalized `text` into windows of `chunk_size` characters.
///
/// Consecutive windows share `overlap` characters. The last window ends at the
/// end of the text. When `overlap >= chunk_size` the window start still moves
/// forward by at least one character, so the loop always terminates.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    let chars: Vec<char> = normalized.chars().collect();
    let total = chars.len();
    let chunk_size = chunk_size.max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total);
        chunks.push(chars[start..end].iter().collect());
        if end == total {
            break;
        }
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { start + 1 };
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rebuilds the normalized text by dropping each chunk's overlap with its predecessor.
    fn reassemble(chunks: &[String], overlap: usize, total: usize) -> String {
        let mut out: Vec<char> = Vec::new();
        let mut start = 0;
        for chunk in chunks {
            let chars: Vec<char> = chunk.chars().collect();
            let already = out.len() - start;
            out.extend_from_slice(&chars[already..]);
            let end = start + chars.len();
            if end == total {
                break;
            }
            start = end.saturating_sub(overlap).max(start + 1);
        }
        out.into_iter().collect()
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("", 800, 80).is_empty());
        assert!(chunk_text("  \n\t ", 800, 80).is_empty());
    }

    #[test]
    fn whitespace_is_normalized() {
        let chunks = chunk_text("  hello \n\n  world\tagain ", 800, 80);
        assert_eq!(chunks, vec!["hello world again".to_string()]);
    }

    #[test]
    fn boundaries_for_thousand_characters() {
        let text: String = (0..1000)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect();
        let chunks = chunk_text(&text, 800, 80);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], text[0..800]);
        assert_eq!(chunks[1], text[720..1000]);
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("just a few words", 800, 80);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn overlap_removed_reconstructs_normalized_text() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(60);
        let normalized = normalize_whitespace(&text);
        let total = normalized.chars().count();

        for (size, overlap) in [(800, 80), (100, 20), (37, 5), (10, 0)] {
            let chunks = chunk_text(&text, size, overlap);
            assert!(!chunks.is_empty());
            assert_eq!(reassemble(&chunks, overlap, total), normalized);
        }
    }

    #[test]
    fn degenerate_overlap_terminates() {
        let chunks = chunk_text("abcdefghij", 4, 4);
        assert_eq!(chunks.first().map(String::as_str), Some("abcd"));
        assert_eq!(chunks.last().map(String::as_str), Some("ghij"));
        assert_eq!(chunks.len(), 7);

        let chunks = chunk_text("abcdefghij", 3, 10);
        assert_eq!(chunks.last().map(String::as_str), Some("hij"));
    }

    #[test]
    fn zero_chunk_size_is_treated_as_one() {
        let chunks = chunk_text("abc", 0, 0);
        assert_eq!(chunks, vec!["a", "b", "c"]);
    }

    #[test]
    fn multibyte_text_is_split_on_characters() {
        let text = "日本語のテキストです".repeat(10);
        let chunks = chunk_text(&text, 30, 5);
        assert!(chunks.iter().all(|c| c.chars().count() <= 30));
        assert_eq!(chunks[0].chars().count(), 30);
    }

    #[test]
    fn config_uses_rag_settings() {
        let config = ChunkerConfig::from(&RagConfig {
            chunk_size: 10,
            chunk_overlap: 2,
            default_top_k: 5,
        });
        let chunks = config.chunk("0123456789abcdefghij");
        assert_eq!(chunks, vec!["0123456789", "89abcdefgh", "ghij"]);
    }
}
