//! Ollama backend implementation
//!
//! HTTP client for the Ollama generate API. Uses the model router for
//! task-based model selection and the prompt library for customizable prompts.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::model_router::ModelRouter;
use crate::models::{CandidateTransaction, Category, QuestCandidate};
use crate::prompts::{PromptLibrary, RenderedPrompt};

use super::parsing::{
    parse_categories_response, parse_quests_response, parse_savings_response,
    parse_transactions_response,
};
use super::requests::{
    categories_prompt, extraction_prompt, quests_prompt, route, router_info, savings_prompt,
};
use super::types::{QuestRequest, RouterInfo, SavingsAdvice, SavingsRequest};
use super::AIBackend;

/// Ollama backend with model router integration
///
/// # Configuration
///
/// Configure routing via `~/.local/share/savepop/config/models.toml`:
///
/// ```toml
/// [defaults]
/// model = "gemma3"
///
/// [models.structured_extraction]
/// model = "qwen2.5:14b"
/// timeout_secs = 240
/// ```
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    router: Arc<RwLock<ModelRouter>>,
    default_model: String,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, default_model: &str) -> Self {
        let router = ModelRouter::new().unwrap_or_default();
        Self::with_router(base_url, default_model, router)
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            default_model: model.to_string(),
            ..self.clone()
        }
    }

    /// Create with a custom router
    pub fn with_router(base_url: &str, default_model: &str, router: ModelRouter) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            router: Arc::new(RwLock::new(router)),
            default_model: default_model.to_string(),
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Replace the prompt library (e.g. embedded-only in tests)
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }

    async fn generate(&self, prompt: RenderedPrompt) -> Result<String> {
        let (model, timeout) = route(&self.router, prompt.task, &self.default_model);

        let request = OllamaRequest {
            model,
            prompt: prompt.user,
            system: prompt.system,
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(timeout)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let ollama_response: OllamaResponse = response.json().await?;
        debug!(
            prompt = prompt.id.as_str(),
            model = %request.model,
            "Ollama response: {}",
            ollama_response.response
        );
        Ok(ollama_response.response)
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn extract_transactions(&self, statement_text: &str) -> Result<Vec<CandidateTransaction>> {
        let prompt = extraction_prompt(&self.prompts, statement_text)?;
        parse_transactions_response(&self.generate(prompt).await?)
    }

    async fn classify_categories(&self, lines: &[String]) -> Result<Vec<Option<Category>>> {
        let prompt = categories_prompt(&self.prompts, lines)?;
        parse_categories_response(&self.generate(prompt).await?)
    }

    async fn suggest_savings(&self, request: &SavingsRequest) -> Result<SavingsAdvice> {
        let prompt = savings_prompt(&self.prompts, request)?;
        parse_savings_response(&self.generate(prompt).await?)
    }

    async fn suggest_quests(&self, request: &QuestRequest) -> Result<Vec<QuestCandidate>> {
        let prompt = quests_prompt(&self.prompts, request)?;
        parse_quests_response(&self.generate(prompt).await?)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.default_model
    }

    fn host(&self) -> &str {
        &self.base_url
    }

    fn router_info(&self) -> RouterInfo {
        router_info(&self.router, &self.default_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_router::RouterConfig;
    use crate::test_utils::MockOllamaServer;
    use std::collections::BTreeMap;

    fn backend(url: &str) -> OllamaBackend {
        OllamaBackend::with_router(url, "llama3.2", ModelRouter::with_config(RouterConfig::default()))
            .with_prompts(PromptLibrary::embedded_only())
    }

    #[tokio::test]
    async fn test_extract_transactions_against_mock_server() {
        let server = MockOllamaServer::start().await;
        let ai = backend(&server.url());

        let txs = ai
            .extract_transactions("01/15/2024 STARBUCKS 6.15\n01/16/2024 PAYROLL 2500.00")
            .await
            .unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].amount, -6.15);
        assert!(txs[1].amount > 0.0);
    }

    #[tokio::test]
    async fn test_classify_and_advise_against_mock_server() {
        let server = MockOllamaServer::start().await;
        let ai = backend(&server.url());

        let labels = ai
            .classify_categories(&["1. UBER TRIP | -14.20".into(), "2. RENT | -1200.00".into()])
            .await
            .unwrap();
        assert_eq!(labels, vec![Some(Category::Transport), Some(Category::Bills)]);

        let mut spending = BTreeMap::new();
        spending.insert("food".to_string(), 50.0);
        let advice = ai
            .suggest_savings(&SavingsRequest {
                spending: spending.clone(),
                target_amount: 500.0,
                current_amount: 100.0,
                remaining: 400.0,
                days: 40,
            })
            .await
            .unwrap();
        assert_eq!(advice.daily_savings_amount, Some(10.0));

        let quests = ai
            .suggest_quests(&QuestRequest {
                spending,
                goal_name: None,
            })
            .await
            .unwrap();
        assert!(!quests.is_empty());
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = MockOllamaServer::start().await;
        assert!(backend(&server.url()).health_check().await);
        assert!(!backend("http://127.0.0.1:1").health_check().await);
    }

    #[tokio::test]
    async fn test_server_error_is_http_error() {
        let server = MockOllamaServer::start_failing().await;
        let result = backend(&server.url())
            .extract_transactions("01/15/2024 STARBUCKS 6.15")
            .await;
        assert!(matches!(result, Err(crate::error::Error::Http(_))));
    }
}
