pub mod gemini;
pub mod groq;
pub mod provider;
pub mod router;
pub mod types;


pub use provider::{LlmError, LlmProvider};
pub use router::{Generation, LlmRouter, ModelSelection, Provider, Route};
pub use types::{ChatMessage, GenerationParams};
