//! Pluggable AI collaborator abstraction
//!
//! The collaborator reads statement text, labels transactions and suggests
//! savings plans and quests. Every caller treats it as unreliable: errors
//! come back as `Err` and the caller falls back to heuristics.
//!
//! # Architecture
//!
//! - `AIBackend` trait: defines the interface for all AI operations
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `OpenAICompatibleBackend`,
//!   `GeminiBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let ai = AIClient::from_env();
//!
//! if let Some(ref client) = ai {
//!     let advice = client.suggest_savings(&request).await?;
//!     println!("Save {:?} per day", advice.daily_savings_amount);
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (ollama, openai_compatible, gemini, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Default model name (default: llama3.2)
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required for openai_compatible backend)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-3.5-turbo)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)
//! - `GOOGLE_AI_API_KEY`: Gemini API key (required for gemini backend)
//! - `GEMINI_MODEL`: Gemini model name (default: gemini-2.0-flash)

mod gemini;
mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
mod requests;
pub mod types;

pub use gemini::GeminiBackend;
pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use types::*;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CandidateTransaction, Category, QuestCandidate};

/// Trait defining the interface for all AI backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Transactions read directly from statement text
    async fn extract_transactions(&self, statement_text: &str) -> Result<Vec<CandidateTransaction>>;

    /// One category per formatted line, same order as the input
    ///
    /// Labels outside the category set come back as `None`. The result may
    /// be shorter or longer than `lines`; callers zip.
    async fn classify_categories(&self, lines: &[String]) -> Result<Vec<Option<Category>>>;

    /// Daily savings amount, category to cut, tip and level count
    async fn suggest_savings(&self, request: &SavingsRequest) -> Result<SavingsAdvice>;

    /// Extra quest ideas beyond the synthesized ones
    async fn suggest_quests(&self, request: &QuestRequest) -> Result<Vec<QuestCandidate>>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;

    /// Get router configuration info
    fn router_info(&self) -> RouterInfo;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// OpenAI-compatible backend (vLLM, LocalAI, llama-server, etc.)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Google Gemini backend
    Gemini(GeminiBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `ollama` (default): Uses OLLAMA_HOST and OLLAMA_MODEL
    /// - `openai_compatible`: Uses OPENAI_COMPATIBLE_HOST and OPENAI_COMPATIBLE_MODEL
    /// - `gemini`: Uses GOOGLE_AI_API_KEY and GEMINI_MODEL
    /// - `mock`: Creates a mock backend for testing
    ///
    /// Returns None if the required environment variables are not set, in
    /// which case the pipeline runs heuristic-only.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(AIClient::Ollama),
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "gemini" | "google" => GeminiBackend::from_env().map(AIClient::Gemini),
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to ollama");
                OllamaBackend::from_env().map(AIClient::Ollama)
            }
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::Ollama(b) => AIClient::Ollama(b.with_model(model)),
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_model(model)),
            AIClient::Gemini(b) => AIClient::Gemini(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }

    /// Backend name for display
    pub fn backend_name(&self) -> &'static str {
        match self {
            AIClient::Ollama(_) => "ollama",
            AIClient::OpenAICompatible(_) => "openai_compatible",
            AIClient::Gemini(_) => "gemini",
            AIClient::Mock(_) => "mock",
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn extract_transactions(&self, statement_text: &str) -> Result<Vec<CandidateTransaction>> {
        match self {
            AIClient::Ollama(b) => b.extract_transactions(statement_text).await,
            AIClient::OpenAICompatible(b) => b.extract_transactions(statement_text).await,
            AIClient::Gemini(b) => b.extract_transactions(statement_text).await,
            AIClient::Mock(b) => b.extract_transactions(statement_text).await,
        }
    }

    async fn classify_categories(&self, lines: &[String]) -> Result<Vec<Option<Category>>> {
        match self {
            AIClient::Ollama(b) => b.classify_categories(lines).await,
            AIClient::OpenAICompatible(b) => b.classify_categories(lines).await,
            AIClient::Gemini(b) => b.classify_categories(lines).await,
            AIClient::Mock(b) => b.classify_categories(lines).await,
        }
    }

    async fn suggest_savings(&self, request: &SavingsRequest) -> Result<SavingsAdvice> {
        match self {
            AIClient::Ollama(b) => b.suggest_savings(request).await,
            AIClient::OpenAICompatible(b) => b.suggest_savings(request).await,
            AIClient::Gemini(b) => b.suggest_savings(request).await,
            AIClient::Mock(b) => b.suggest_savings(request).await,
        }
    }

    async fn suggest_quests(&self, request: &QuestRequest) -> Result<Vec<QuestCandidate>> {
        match self {
            AIClient::Ollama(b) => b.suggest_quests(request).await,
            AIClient::OpenAICompatible(b) => b.suggest_quests(request).await,
            AIClient::Gemini(b) => b.suggest_quests(request).await,
            AIClient::Mock(b) => b.suggest_quests(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Gemini(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Gemini(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Gemini(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }

    fn router_info(&self) -> RouterInfo {
        match self {
            AIClient::Ollama(b) => b.router_info(),
            AIClient::OpenAICompatible(b) => b.router_info(),
            AIClient::Gemini(b) => b.router_info(),
            AIClient::Mock(b) => b.router_info(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ai_client_mock() {
        let client = AIClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
        assert_eq!(client.backend_name(), "mock");
    }

    #[test]
    fn test_with_model_keeps_backend() {
        let client = AIClient::ollama("http://localhost:11434/", "llama3.2").with_model("gemma3");
        assert_eq!(client.backend_name(), "ollama");
        assert_eq!(client.model(), "gemma3");
        assert_eq!(client.host(), "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = AIClient::mock();
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_mock_classify_categories() {
        let client = AIClient::mock();
        let labels = client
            .classify_categories(&["1. UBER TRIP | -14.20".to_string()])
            .await
            .unwrap();
        assert_eq!(labels, vec![Some(Category::Transport)]);
    }
}
