//! Typed view of `config.yml` merged with `secrets.yaml` and the environment.

use serde::{Deserialize, Serialize};

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub rag: RagConfig,
    pub embedding: EmbeddingConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub level: String,
    /// Prefix of the daily rolling file in `log_dir`.
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_name: "server.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Window size in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows.
    pub chunk_overlap: usize,
    pub default_top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 80,
            default_top_k: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    Hashing,
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    /// Base URL of an OpenAI-compatible server, e.g. `http://127.0.0.1:8090/v1`.
    pub base_url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Hashing,
            base_url: None,
            model: "all-MiniLM-L6-v2".to_string(),
            api_key: None,
            dimension: 384,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub groq_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub groq_base_url: String,
    pub gemini_base_url: String,
    pub timeout_secs: u64,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            gemini_api_key: None,
            groq_base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout_secs: 60,
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

impl AppConfig {
    /// Applies `PORT`, `GROQ_API_KEY`, `GOOGLE_AI_API_KEY` and `EMBEDDING_API_KEY`.
    ///
    /// Blank values are treated as unset, both from the file and the environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).and_then(non_blank);

        if let Some(port) = lookup("PORT").and_then(|val| val.parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(key) = lookup("GROQ_API_KEY") {
            self.llm.groq_api_key = Some(key);
        }
        if let Some(key) = lookup("GOOGLE_AI_API_KEY") {
            self.llm.gemini_api_key = Some(key);
        }
        if let Some(key) = lookup("EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key);
        }

        self.llm.groq_api_key = self.llm.groq_api_key.take().and_then(non_blank);
        self.llm.gemini_api_key = self.llm.gemini_api_key.take().and_then(non_blank);
        self.embedding.api_key = self.embedding.api_key.take().and_then(non_blank);
    }
}

impl AppConfig {
    /// Settings that are accepted but probably not intended.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            warnings.push(format!(
                "rag.chunk_overlap ({}) >= rag.chunk_size ({}); chunks will advance one character at a time",
                self.rag.chunk_overlap, self.rag.chunk_size
            ));
        }
        warnings
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
