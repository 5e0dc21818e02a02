//! Prompt library for the AI collaborator
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Override in the data dir (`~/.local/share/savepop/prompts/overrides/`)
//! 2. Embedded default (compiled into the binary)
//!
//! Each prompt is Markdown with YAML frontmatter naming its id, version and
//! task type, followed by `# System` and `# User` sections. `{{var}}`
//! placeholders are substituted at render time and `{{#if var}}...{{/if}}`
//! blocks are dropped when `var` is missing or empty.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model_router::TaskType;

mod defaults {
    pub const EXTRACT_TRANSACTIONS: &str =
        include_str!("../../../prompts/extract_transactions.md");
    pub const CATEGORIZE_TRANSACTIONS: &str =
        include_str!("../../../prompts/categorize_transactions.md");
    pub const SUGGEST_SAVINGS: &str = include_str!("../../../prompts/suggest_savings.md");
    pub const SUGGEST_QUESTS: &str = include_str!("../../../prompts/suggest_quests.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    ExtractTransactions,
    CategorizeTransactions,
    SuggestSavings,
    SuggestQuests,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractTransactions => "extract_transactions",
            Self::CategorizeTransactions => "categorize_transactions",
            Self::SuggestSavings => "suggest_savings",
            Self::SuggestQuests => "suggest_quests",
        }
    }

    pub fn all() -> &'static [PromptId] {
        &[
            Self::ExtractTransactions,
            Self::CategorizeTransactions,
            Self::SuggestSavings,
            Self::SuggestQuests,
        ]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::ExtractTransactions => defaults::EXTRACT_TRANSACTIONS,
            Self::CategorizeTransactions => defaults::CATEGORIZE_TRANSACTIONS,
            Self::SuggestSavings => defaults::SUGGEST_SAVINGS,
            Self::SuggestQuests => defaults::SUGGEST_QUESTS,
        }
    }
}

impl std::str::FromStr for PromptId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PromptId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("Unknown prompt: {}", s))
    }
}

/// Prompt frontmatter
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    pub id: String,
    pub version: u32,
    /// Task type for model routing (fast_classification, reasoning, ...)
    pub task_type: String,
}

/// A loaded prompt
#[derive(Debug, Clone)]
pub struct Prompt {
    pub metadata: PromptMetadata,
    /// Body after the frontmatter (system + user sections)
    pub content: String,
    pub is_override: bool,
    pub override_path: Option<PathBuf>,
}

/// A prompt ready to send
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    pub id: PromptId,
    pub task: TaskType,
    pub system: Option<String>,
    pub user: String,
}

impl Prompt {
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Task type from frontmatter; unknown values route as structured extraction
    pub fn task_type(&self) -> TaskType {
        self.metadata
            .task_type
            .parse()
            .unwrap_or(TaskType::StructuredExtraction)
    }

    /// Render the user section (or the whole body when it has no sections)
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        substitute(self.user_section().unwrap_or(&self.content), vars)
    }

    pub fn render(&self, id: PromptId, vars: &HashMap<&str, &str>) -> RenderedPrompt {
        RenderedPrompt {
            id,
            task: self.task_type(),
            system: self.system_section().map(|s| substitute(s, vars)),
            user: self.render_user(vars),
        }
    }
}

/// Loads and caches prompts
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Default override directory plus embedded prompts
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Embedded prompts only (no override lookup)
    pub fn embedded_only() -> Self {
        Self {
            override_dir: None,
            cache: HashMap::new(),
        }
    }

    /// Get a prompt, loading it on first use
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        match self.cache.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let prompt = load_prompt(self.override_dir.as_ref(), id)?;
                Ok(entry.insert(prompt))
            }
        }
    }

    /// Load and render in one step
    pub fn render(&mut self, id: PromptId, vars: &HashMap<&str, &str>) -> Result<RenderedPrompt> {
        Ok(self.get(id)?.render(id, vars))
    }

    pub fn list(&mut self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .map(|&id| {
                let override_path = self.override_path(id);
                let prompt = self.get(id).ok();
                PromptInfo {
                    id: id.as_str().to_string(),
                    version: prompt.map(|p| p.metadata.version).unwrap_or(0),
                    task_type: prompt
                        .map(|p| p.metadata.task_type.clone())
                        .unwrap_or_default(),
                    has_override: override_path.is_some(),
                    override_path,
                }
            })
            .collect()
    }

    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_path(id).is_some()
    }

    fn override_path(&self, id: PromptId) -> Option<PathBuf> {
        self.override_dir
            .as_ref()
            .map(|d| d.join(format!("{}.md", id.as_str())))
            .filter(|p| p.exists())
    }

    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }

    /// Drop cached prompts (after editing override files)
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Prompt summary for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    pub id: String,
    pub version: u32,
    pub task_type: String,
    pub has_override: bool,
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("savepop").join("prompts").join("overrides"))
}

fn load_prompt(override_dir: Option<&PathBuf>, id: PromptId) -> Result<Prompt> {
    if let Some(dir) = override_dir {
        let path = dir.join(format!("{}.md", id.as_str()));
        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                Error::Config(format!("Failed to read prompt override {}: {}", path.display(), e))
            })?;
            let (metadata, body) = parse_prompt(&content)?;
            return Ok(Prompt {
                metadata,
                content: body,
                is_override: true,
                override_path: Some(path),
            });
        }
    }

    let (metadata, body) = parse_prompt(id.default_content())?;
    Ok(Prompt {
        metadata,
        content: body,
        is_override: false,
        override_path: None,
    })
}

/// Split a prompt file into frontmatter and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();
    let rest = content.strip_prefix("---").ok_or_else(|| {
        Error::Config("Prompt must start with YAML frontmatter (---)".into())
    })?;

    let end = rest
        .find("---")
        .ok_or_else(|| Error::Config("Prompt frontmatter not closed (missing second ---)".into()))?;

    let metadata: PromptMetadata = serde_yaml::from_str(rest[..end].trim())?;
    Ok((metadata, rest[end + 3..].trim().to_string()))
}

/// Text between `header` and the next top-level header
fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after = &content[start + header.len()..];
    let end = after.find("\n# ").unwrap_or(after.len());
    Some(after[..end].trim())
}

fn substitute(template: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    resolve_conditionals(&result, vars)
}

/// Keep `{{#if var}}` blocks whose variable is set, drop the rest
fn resolve_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();

    while let Some(if_start) = result.find("{{#if ") {
        let var_start = if_start + 6;
        let Some(var_len) = result[var_start..].find("}}") else {
            break;
        };
        let var_name = result[var_start..var_start + var_len].trim().to_string();
        let block_start = var_start + var_len + 2;
        let Some(block_len) = result[block_start..].find("{{/if}}") else {
            break;
        };
        let block_end = block_start + block_len;

        let keep = vars.get(var_name.as_str()).is_some_and(|v| !v.is_empty());
        let replacement = if keep {
            result[block_start..block_end].to_string()
        } else {
            String::new()
        };
        result.replace_range(if_start..block_end + 7, &replacement);
    }

    result
}
