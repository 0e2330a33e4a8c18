//! Grounded answer prompt.

use super::store::SearchHit;

pub const NO_CONTEXT_PLACEHOLDER: &str = "No relevant context found.";

const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Joins hit texts in rank order.
pub fn build_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.metadata.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

pub fn build_prompt(context: &str, question: &str) -> String {
    let context = if context.is_empty() {
        NO_CONTEXT_PLACEHOLDER
    } else {
        context
    };
    format!(
        "You are a helpful assistant. Answer the user's question using ONLY the context provided.\n\
         Write a thorough, well-structured response with bullet points and specifics.\n\
         Cite sources by filename in parentheses when relevant. If the answer is not in the context, say you don't know.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\
         Answer:"
    )
}
