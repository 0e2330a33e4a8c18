//! Provider selection and fallback.
//!
//! Selection is a pure function of the model hint and which credentials are
//! present. Provider failures are kept as a typed [`Generation`] and only
//! become text when the answer is rendered.

use std::sync::Arc;
use std::time::Duration;

use super::gemini::GeminiProvider;
use super::groq::GroqProvider;
use super::provider::{LlmError, LlmProvider};
use super::types::GenerationParams;
use crate::core::config::LlmConfig;

pub const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash";

const GROQ_ALIASES: [&str; 6] = [
    "groq",
    "groq-llama3",
    "groq-llama3.1",
    "groq-llama-3.1",
    "groq-llama3.3",
    "groq-llama-3.3",
];

const LLAMA_MARKERS: [&str; 4] = ["llama-3.3", "llama3.3", "llama-3.1", "llama3"];

const ERROR_PROMPT_CHARS: usize = 200;
const UNCONFIGURED_PROMPT_CHARS: usize = 400;

/// What the caller asked for, before credentials are considered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSelection {
    Groq,
    /// Carries the lower-cased hint as the target model id.
    Gemini(String),
    Auto,
}

impl ModelSelection {
    pub fn classify(hint: Option<&str>) -> Self {
        let name = hint.unwrap_or_default().trim().to_lowercase();
        if name.is_empty() {
            return ModelSelection::Auto;
        }
        if GROQ_ALIASES.contains(&name.as_str())
            || LLAMA_MARKERS.iter().any(|marker| name.contains(marker))
        {
            return ModelSelection::Groq;
        }
        if name.starts_with("gemini") {
            return ModelSelection::Gemini(name);
        }
        ModelSelection::Auto
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Groq,
    Gemini,
    Unconfigured,
}

/// Which credentials are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Credentials {
    pub groq: bool,
    pub gemini: bool,
}

/// A concrete provider and model to call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub provider: Provider,
    pub model: Option<String>,
}

impl Route {
    /// Explicit selections keep their provider even without a credential;
    /// only `Auto` looks at what is configured.
    pub fn resolve(selection: ModelSelection, credentials: Credentials) -> Self {
        match selection {
            ModelSelection::Groq => Route::groq(),
            ModelSelection::Gemini(model) => Route {
                provider: Provider::Gemini,
                model: Some(model),
            },
            ModelSelection::Auto if credentials.groq => Route::groq(),
            ModelSelection::Auto if credentials.gemini => Route {
                provider: Provider::Gemini,
                model: Some(GEMINI_DEFAULT_MODEL.to_string()),
            },
            ModelSelection::Auto => Route {
                provider: Provider::Unconfigured,
                model: None,
            },
        }
    }

    fn groq() -> Self {
        Route {
            provider: Provider::Groq,
            model: Some(GROQ_DEFAULT_MODEL.to_string()),
        }
    }
}

/// Outcome of a routed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Answer(String),
    Failed { provider: Provider, error: LlmError },
    Unconfigured,
}

impl Generation {
    /// Renders the answer text. Failures become a bracketed marker followed by
    /// the head of the prompt.
    pub fn into_answer(self, prompt: &str) -> String {
        match self {
            Generation::Answer(text) => text,
            Generation::Failed { error, .. } => format!(
                "[LLM error: {}] {}",
                error,
                truncate_chars(prompt, ERROR_PROMPT_CHARS)
            ),
            Generation::Unconfigured => format!(
                "[No LLM configured] {}",
                truncate_chars(prompt, UNCONFIGURED_PROMPT_CHARS)
            ),
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub struct LlmRouter {
    groq: Arc<dyn LlmProvider>,
    gemini: Arc<dyn LlmProvider>,
}

impl LlmRouter {
    pub fn new(groq: Arc<dyn LlmProvider>, gemini: Arc<dyn LlmProvider>) -> Self {
        Self { groq, gemini }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let params = GenerationParams::from(config);
        let timeout = Duration::from_secs(config.timeout_secs);
        let groq = GroqProvider::new(
            config.groq_base_url.clone(),
            config.groq_api_key.clone(),
            params,
            timeout,
        )?;
        let gemini = GeminiProvider::new(
            config.gemini_base_url.clone(),
            config.gemini_api_key.clone(),
            params,
            timeout,
        )?;
        Ok(Self::new(Arc::new(groq), Arc::new(gemini)))
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            groq: self.groq.has_credential(),
            gemini: self.gemini.has_credential(),
        }
    }

    pub fn route(&self, model_hint: Option<&str>) -> Route {
        Route::resolve(ModelSelection::classify(model_hint), self.credentials())
    }

    /// Calls the routed provider once. Never fails; see [`Generation`].
    pub async fn generate(&self, prompt: &str, model_hint: Option<&str>) -> Generation {
        let route = self.route(model_hint);
        let provider = match route.provider {
            Provider::Groq => &self.groq,
            Provider::Gemini => &self.gemini,
            Provider::Unconfigured => {
                tracing::warn!("No LLM provider configured; returning prompt preview");
                return Generation::Unconfigured;
            }
        };
        let model = route.model.as_deref().unwrap_or_default();

        tracing::debug!(provider = provider.name(), model, "Dispatching generation");
        match provider.generate(prompt, model).await {
            Ok(text) => Generation::Answer(text),
            Err(error) => {
                tracing::warn!(
                    provider = provider.name(),
                    model,
                    "LLM call failed: {}",
                    error
                );
                Generation::Failed {
                    provider: route.provider,
                    error,
                }
            }
        }
    }
}
