//! Mock backend for testing
//!
//! Returns predictable answers for every operation. Tests can script the raw
//! response text per prompt, which then goes through the same parsers as a
//! real backend, or make every call fail.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{round_cents, CandidateTransaction, Category, QuestCandidate, QuestCategory};
use crate::prompts::PromptId;

use super::parsing::{
    parse_categories_response, parse_quests_response, parse_savings_response,
    parse_transactions_response,
};
use super::types::{QuestRequest, RouterInfo, SavingsAdvice, SavingsRequest};
use super::AIBackend;

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    /// Whether every operation errors
    pub failing: bool,
    responses: Arc<HashMap<PromptId, String>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            failing: false,
            responses: Arc::new(HashMap::new()),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// A backend whose every call fails like an unreachable server
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::unhealthy()
        }
    }

    /// Script the raw response text for one prompt
    pub fn with_response(mut self, id: PromptId, response: &str) -> Self {
        Arc::make_mut(&mut self.responses).insert(id, response.to_string());
        self
    }

    /// Create a new instance with a different model (no-op for mock)
    pub fn with_model(&self, _model: &str) -> Self {
        self.clone()
    }

    fn scripted(&self, id: PromptId) -> Result<Option<&str>> {
        if self.failing {
            return Err(Error::Collaborator(format!(
                "mock collaborator unavailable for {}",
                id.as_str()
            )));
        }
        Ok(self.responses.get(&id).map(String::as_str))
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn extract_transactions(&self, _statement_text: &str) -> Result<Vec<CandidateTransaction>> {
        match self.scripted(PromptId::ExtractTransactions)? {
            Some(response) => parse_transactions_response(response),
            None => Ok(Vec::new()),
        }
    }

    async fn classify_categories(&self, lines: &[String]) -> Result<Vec<Option<Category>>> {
        if let Some(response) = self.scripted(PromptId::CategorizeTransactions)? {
            return parse_categories_response(response);
        }

        // Simple mock: label well-known merchants
        Ok(lines
            .iter()
            .map(|line| {
                let category = match line.to_uppercase().as_str() {
                    l if l.contains("STARBUCKS") || l.contains("WHOLE FOODS") => Category::Food,
                    l if l.contains("UBER") || l.contains("SHELL") => Category::Transport,
                    l if l.contains("AMAZON") || l.contains("COSTCO") => Category::Shopping,
                    l if l.contains("NETFLIX") || l.contains("SPOTIFY") => {
                        Category::Subscriptions
                    }
                    _ => Category::Other,
                };
                Some(category)
            })
            .collect())
    }

    async fn suggest_savings(&self, request: &SavingsRequest) -> Result<SavingsAdvice> {
        if let Some(response) = self.scripted(PromptId::SuggestSavings)? {
            return parse_savings_response(response);
        }

        let top_cut_category = request
            .spending
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(category, _)| category.clone());

        Ok(SavingsAdvice {
            daily_savings_amount: Some(round_cents(request.remaining / request.days.max(1) as f64)),
            top_cut_category,
            tip: Some("Pack lunch twice a week".to_string()),
            suggested_levels: Some(20),
        })
    }

    async fn suggest_quests(&self, _request: &QuestRequest) -> Result<Vec<QuestCandidate>> {
        if let Some(response) = self.scripted(PromptId::SuggestQuests)? {
            return parse_quests_response(response);
        }

        Ok(vec![
            QuestCandidate {
                name: "Coffee at home".to_string(),
                description: "Brew your own coffee today".to_string(),
                category: QuestCategory::NoSpend,
                points_reward: 25,
                currency_reward: 10,
            },
            QuestCandidate {
                name: "Share your goal".to_string(),
                description: "Tell a friend what you are saving for".to_string(),
                category: QuestCategory::Social,
                points_reward: 20,
                currency_reward: 5,
            },
        ])
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }

    fn router_info(&self) -> RouterInfo {
        RouterInfo {
            default_model: "mock".to_string(),
            task_models: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn savings_request() -> SavingsRequest {
        let mut spending = BTreeMap::new();
        spending.insert("food".to_string(), 80.0);
        spending.insert("bills".to_string(), 300.0);
        SavingsRequest {
            spending,
            target_amount: 900.0,
            current_amount: 0.0,
            remaining: 900.0,
            days: 180,
        }
    }

    #[tokio::test]
    async fn test_default_savings_targets_largest_category() {
        let advice = MockBackend::new()
            .suggest_savings(&savings_request())
            .await
            .unwrap();
        assert_eq!(advice.daily_savings_amount, Some(5.0));
        assert_eq!(advice.top_cut_category.as_deref(), Some("bills"));
    }

    #[tokio::test]
    async fn test_scripted_response_uses_parser() {
        let mock = MockBackend::new().with_response(PromptId::SuggestSavings, "not json at all");
        assert!(mock.suggest_savings(&savings_request()).await.is_err());
        // Other prompts keep their defaults
        let request = QuestRequest {
            spending: BTreeMap::new(),
            goal_name: None,
        };
        assert_eq!(mock.suggest_quests(&request).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failing_backend() {
        let mock = MockBackend::failing();
        assert!(!mock.health_check().await);
        assert!(mock.extract_transactions("text").await.is_err());
        assert!(mock.classify_categories(&[]).await.is_err());
    }

    #[test]
    fn test_with_response_does_not_leak_between_clones() {
        let base = MockBackend::new();
        let scripted = base.clone().with_response(PromptId::SuggestQuests, "[]");
        assert!(base.responses.is_empty());
        assert_eq!(scripted.responses.len(), 1);
    }
}
