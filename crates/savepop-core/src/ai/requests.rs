//! Prompt rendering and model routing shared by the HTTP backends

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::model_router::{ModelRouter, TaskType};
use crate::models::Category;
use crate::prompts::{PromptId, PromptLibrary, RenderedPrompt};

use super::types::{QuestRequest, RouterInfo, SavingsRequest};

fn render(
    prompts: &RwLock<PromptLibrary>,
    id: PromptId,
    vars: &HashMap<&str, &str>,
) -> Result<RenderedPrompt> {
    let mut prompts = prompts
        .write()
        .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
    prompts.render(id, vars)
}

pub(crate) fn extraction_prompt(
    prompts: &RwLock<PromptLibrary>,
    statement_text: &str,
) -> Result<RenderedPrompt> {
    let mut vars = HashMap::new();
    vars.insert("statement_text", statement_text);
    render(prompts, PromptId::ExtractTransactions, &vars)
}

pub(crate) fn categories_prompt(
    prompts: &RwLock<PromptLibrary>,
    lines: &[String],
) -> Result<RenderedPrompt> {
    let categories = Category::all()
        .iter()
        .map(Category::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let lines = lines.join("\n");

    let mut vars = HashMap::new();
    vars.insert("categories", categories.as_str());
    vars.insert("lines", lines.as_str());
    render(prompts, PromptId::CategorizeTransactions, &vars)
}

pub(crate) fn savings_prompt(
    prompts: &RwLock<PromptLibrary>,
    request: &SavingsRequest,
) -> Result<RenderedPrompt> {
    let spending = spending_json(&request.spending)?;
    let target_amount = format!("{:.2}", request.target_amount);
    let current_amount = format!("{:.2}", request.current_amount);
    let remaining = format!("{:.2}", request.remaining);
    let days = request.days.to_string();

    let mut vars = HashMap::new();
    vars.insert("spending", spending.as_str());
    vars.insert("target_amount", target_amount.as_str());
    vars.insert("current_amount", current_amount.as_str());
    vars.insert("remaining", remaining.as_str());
    vars.insert("days", days.as_str());
    render(prompts, PromptId::SuggestSavings, &vars)
}

pub(crate) fn quests_prompt(
    prompts: &RwLock<PromptLibrary>,
    request: &QuestRequest,
) -> Result<RenderedPrompt> {
    let spending = spending_json(&request.spending)?;

    let mut vars = HashMap::new();
    vars.insert("spending", spending.as_str());
    vars.insert("goal_name", request.goal_name.as_deref().unwrap_or(""));
    render(prompts, PromptId::SuggestQuests, &vars)
}

fn spending_json(spending: &BTreeMap<String, f64>) -> Result<String> {
    Ok(serde_json::to_string(spending)?)
}

/// Model and timeout for a task; a poisoned router falls back to the backend model
pub(crate) fn route(
    router: &RwLock<ModelRouter>,
    task: TaskType,
    backend_model: &str,
) -> (String, Duration) {
    match router.read() {
        Ok(router) => (
            router.model_for_task(task, backend_model).to_string(),
            router.timeout_for_task(task),
        ),
        Err(_) => (backend_model.to_string(), Duration::from_secs(60)),
    }
}

pub(crate) fn router_info(router: &RwLock<ModelRouter>, backend_model: &str) -> RouterInfo {
    let mut task_models = Vec::new();
    let mut default_model = backend_model.to_string();

    if let Ok(router) = router.read() {
        if let Some(model) = &router.config().default_model {
            default_model = model.clone();
        }
        for task in TaskType::all() {
            let model = router.model_for_task(*task, &default_model);
            // Only include if different from default
            if model != default_model {
                task_models.push((task.as_str().to_string(), model.to_string()));
            }
        }
    }

    RouterInfo {
        default_model,
        task_models,
    }
}
