//! Google Gemini backend implementation
//!
//! Calls the `generateContent` REST endpoint with an API key.
//!
//! # Configuration
//!
//! Environment variables:
//! - `GOOGLE_AI_API_KEY`: API key (required; template placeholders count as unset)
//! - `GEMINI_MODEL`: Model name (default: gemini-2.0-flash)
//! - `GEMINI_HOST`: API base URL (default: https://generativelanguage.googleapis.com)

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

pub const DEFAULT_GEMINI_HOST: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// Values copied from `.env` templates that are not real keys
const PLACEHOLDER_KEYS: &[&str] = &["your_google_ai_api_key", "your_google_ai_key"];

#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    router: Arc<RwLock<ModelRouter>>,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl GeminiBackend {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_host(DEFAULT_GEMINI_HOST, api_key, model)
    }

    /// Point at a different API host (proxies, tests)
    pub fn with_host(base_url: &str, api_key: &str, model: &str) -> Self {
        let router = ModelRouter::new().unwrap_or_default();
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            router: Arc::new(RwLock::new(router)),
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
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
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GOOGLE_AI_API_KEY")
            .ok()
            .filter(|k| is_usable_key(k))?;
        let model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        let host = std::env::var("GEMINI_HOST").unwrap_or_else(|_| DEFAULT_GEMINI_HOST.to_string());
        Some(Self::with_host(&host, api_key.trim(), &model))
    }

    async fn generate_content(&self, prompt: RenderedPrompt) -> Result<String> {
        let (model, timeout) = route(&self.router, prompt.task, &self.model);

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: prompt.user }],
            }],
            system_instruction: prompt.system.map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            generation_config: GenerationConfig { temperature: 0.1 },
        };

        let response = self
            .http_client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, model
            ))
            .query(&[("key", self.api_key.as_str())])
            .timeout(timeout)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Collaborator(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let body: GenerateContentResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::Collaborator("Empty response from Gemini".into()))?;

        debug!(prompt = prompt.id.as_str(), model = %model, "Gemini response: {}", text);
        Ok(text)
    }
}

fn is_usable_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && !PLACEHOLDER_KEYS.contains(&key)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[async_trait]
impl AIBackend for GeminiBackend {
    async fn extract_transactions(&self, statement_text: &str) -> Result<Vec<CandidateTransaction>> {
        let prompt = extraction_prompt(&self.prompts, statement_text)?;
        parse_transactions_response(&self.generate_content(prompt).await?)
    }

    async fn classify_categories(&self, lines: &[String]) -> Result<Vec<Option<Category>>> {
        let prompt = categories_prompt(&self.prompts, lines)?;
        parse_categories_response(&self.generate_content(prompt).await?)
    }

    async fn suggest_savings(&self, request: &SavingsRequest) -> Result<SavingsAdvice> {
        let prompt = savings_prompt(&self.prompts, request)?;
        parse_savings_response(&self.generate_content(prompt).await?)
    }

    async fn suggest_quests(&self, request: &QuestRequest) -> Result<Vec<QuestCandidate>> {
        let prompt = quests_prompt(&self.prompts, request)?;
        parse_quests_response(&self.generate_content(prompt).await?)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/v1beta/models/{}", self.base_url, self.model))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
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
