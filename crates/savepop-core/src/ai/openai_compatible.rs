//! OpenAI-compatible backend implementation
//!
//! Works with any server that implements the OpenAI chat completions API:
//! - vLLM (http://localhost:8000)
//! - LocalAI (http://localhost:8080)
//! - llama-server / llama.cpp (http://localhost:8080)
//! - Docker Model Runner (http://localhost:12434)
//!
//! # Configuration
//!
//! Environment variables:
//! - `OPENAI_COMPATIBLE_HOST`: Server URL (required)
//! - `OPENAI_COMPATIBLE_MODEL`: Model name (default: gpt-3.5-turbo)
//! - `OPENAI_COMPATIBLE_API_KEY`: API key if required (optional)

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
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

/// OpenAI-compatible backend
///
/// ```rust,ignore
/// // vLLM
/// export OPENAI_COMPATIBLE_HOST="http://192.168.1.100:8000"
/// export OPENAI_COMPATIBLE_MODEL="meta-llama/Llama-3.2-3B-Instruct"
/// ```
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    router: Arc<RwLock<ModelRouter>>,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl OpenAICompatibleBackend {
    /// Create a new OpenAI-compatible backend
    pub fn new(base_url: &str, model: &str) -> Self {
        let router = ModelRouter::new().unwrap_or_default();
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            router: Arc::new(RwLock::new(router)),
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..Self::new(base_url, model)
        }
    }

    /// Create a new instance with a different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Replace the router and prompt library (for testing)
    pub fn with_parts(mut self, router: ModelRouter, prompts: PromptLibrary) -> Self {
        self.router = Arc::new(RwLock::new(router));
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    /// Create from environment variables
    ///
    /// Required: `OPENAI_COMPATIBLE_HOST`
    /// Optional: `OPENAI_COMPATIBLE_MODEL` (default: gpt-3.5-turbo)
    /// Optional: `OPENAI_COMPATIBLE_API_KEY`
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OPENAI_COMPATIBLE_HOST").ok()?;
        let model = std::env::var("OPENAI_COMPATIBLE_MODEL")
            .unwrap_or_else(|_| "gpt-3.5-turbo".to_string());

        let mut backend = Self::new(&host, &model);
        backend.api_key = std::env::var("OPENAI_COMPATIBLE_API_KEY").ok();
        Some(backend)
    }

    /// Make a chat completion request
    async fn chat_completion(&self, prompt: RenderedPrompt) -> Result<String> {
        let (model, timeout) = route(&self.router, prompt.task, &self.model);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = prompt.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.user,
        });

        let request = ChatCompletionRequest {
            model,
            messages,
            temperature: Some(0.1),
            max_tokens: None,
            stream: false,
        };

        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(timeout)
            .json(&request);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Collaborator(format!(
                "OpenAI API error {}: {}",
                status, body
            )));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Collaborator("No response from OpenAI API".into()))?;
        debug!(prompt = prompt.id.as_str(), "OpenAI-compatible response: {}", content);
        Ok(content)
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn extract_transactions(&self, statement_text: &str) -> Result<Vec<CandidateTransaction>> {
        let prompt = extraction_prompt(&self.prompts, statement_text)?;
        parse_transactions_response(&self.chat_completion(prompt).await?)
    }

    async fn classify_categories(&self, lines: &[String]) -> Result<Vec<Option<Category>>> {
        let prompt = categories_prompt(&self.prompts, lines)?;
        parse_categories_response(&self.chat_completion(prompt).await?)
    }

    async fn suggest_savings(&self, request: &SavingsRequest) -> Result<SavingsAdvice> {
        let prompt = savings_prompt(&self.prompts, request)?;
        parse_savings_response(&self.chat_completion(prompt).await?)
    }

    async fn suggest_quests(&self, request: &QuestRequest) -> Result<Vec<QuestCandidate>> {
        let prompt = quests_prompt(&self.prompts, request)?;
        parse_quests_response(&self.chat_completion(prompt).await?)
    }

    async fn health_check(&self) -> bool {
        let mut req_builder = self
            .http_client
            .get(format!("{}/v1/models", self.base_url));

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        match req_builder.send().await {
            Ok(resp) if resp.status().is_success() => true,
            // Some servers only expose /health
            _ => match self
                .http_client
                .get(format!("{}/health", self.base_url))
                .send()
                .await
            {
                Ok(resp) => resp.status().is_success(),
                Err(_) => false,
            },
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }

    fn router_info(&self) -> RouterInfo {
        router_info(&self.router, &self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_router::RouterConfig;
    use crate::test_utils::MockOllamaServer;

    fn backend(url: &str) -> OpenAICompatibleBackend {
        OpenAICompatibleBackend::with_api_key(url, "mock-model", "secret").with_parts(
            ModelRouter::with_config(RouterConfig::default()),
            PromptLibrary::embedded_only(),
        )
    }

    #[test]
    fn test_request_serialization_skips_unset_fields() {
        let request = ChatCompletionRequest {
            model: "m".into(),
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
            temperature: None,
            max_tokens: None,
            stream: false,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("temperature"));
        assert!(!json.contains("max_tokens"));
    }

    #[tokio::test]
    async fn test_chat_round_trip_against_mock_server() {
        let server = MockOllamaServer::start().await;
        let ai = backend(&server.url());

        assert!(ai.health_check().await);
        let labels = ai
            .classify_categories(&["1. STARBUCKS | -6.15".into()])
            .await
            .unwrap();
        assert_eq!(labels, vec![Some(Category::Food)]);
    }

    #[tokio::test]
    async fn test_server_error_is_collaborator_error() {
        let server = MockOllamaServer::start_failing().await;
        let result = backend(&server.url())
            .classify_categories(&["1. STARBUCKS | -6.15".into()])
            .await;
        assert!(matches!(result, Err(Error::Collaborator(_))));
    }
}
