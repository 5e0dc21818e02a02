//! Task-based model selection
//!
//! Each collaborator call belongs to a task type, and each task type may
//! name its own model and timeout. Tasks without a model use the backend's
//! configured model.
//!
//! ## Configuration Resolution
//!
//! 1. Override in the data dir (`~/.local/share/savepop/config/models.toml`)
//! 2. Embedded default (compiled into the binary)

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/models.toml");

/// Task types for model routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Batch category labels
    FastClassification,
    /// Transactions as JSON from statement text
    StructuredExtraction,
    /// Savings plan suggestion
    Reasoning,
    /// Quest ideas
    Narrative,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FastClassification => "fast_classification",
            Self::StructuredExtraction => "structured_extraction",
            Self::Reasoning => "reasoning",
            Self::Narrative => "narrative",
        }
    }

    pub fn all() -> &'static [TaskType] {
        &[
            Self::FastClassification,
            Self::StructuredExtraction,
            Self::Reasoning,
            Self::Narrative,
        ]
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fast_classification" => Ok(Self::FastClassification),
            "structured_extraction" => Ok(Self::StructuredExtraction),
            "reasoning" => Ok(Self::Reasoning),
            "narrative" => Ok(Self::Narrative),
            _ => Err(format!("Unknown task type: {}", s)),
        }
    }
}

/// Per-task settings
#[derive(Debug, Clone, PartialEq)]
pub struct TaskConfig {
    /// Model override; `None` uses the backend model
    pub model: Option<String>,
    pub timeout: Duration,
}

/// Router configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    /// Model for every task without its own; `None` uses the backend model
    pub default_model: Option<String>,
    pub default_timeout: Duration,
    pub tasks: HashMap<TaskType, TaskConfig>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_model: None,
            default_timeout: Duration::from_secs(60),
            tasks: HashMap::new(),
        }
    }
}

/// Resolves the model and timeout for each task
#[derive(Debug, Clone)]
pub struct ModelRouter {
    config: RouterConfig,
    config_path: Option<PathBuf>,
}

impl ModelRouter {
    /// Load from the override location, else the embedded default
    pub fn new() -> Result<Self> {
        let config_path = default_config_path();
        let config = load_config(config_path.as_ref())?;
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load from an explicit path (embedded default if it does not exist)
    pub fn with_config_path(path: PathBuf) -> Result<Self> {
        let config = load_config(Some(&path))?;
        Ok(Self {
            config,
            config_path: Some(path),
        })
    }

    /// Use an explicit configuration (for testing)
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    /// Model for a task, falling back to `backend_model`
    pub fn model_for_task<'a>(&'a self, task: TaskType, backend_model: &'a str) -> &'a str {
        self.config
            .tasks
            .get(&task)
            .and_then(|t| t.model.as_deref())
            .or(self.config.default_model.as_deref())
            .unwrap_or(backend_model)
    }

    pub fn timeout_for_task(&self, task: TaskType) -> Duration {
        self.config
            .tasks
            .get(&task)
            .map(|t| t.timeout)
            .unwrap_or(self.config.default_timeout)
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    /// Re-read configuration from disk
    pub fn reload(&mut self) -> Result<()> {
        self.config = load_config(self.config_path.as_ref())?;
        Ok(())
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::with_config(RouterConfig::default()))
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("savepop").join("config").join("models.toml"))
}

fn load_config(override_path: Option<&PathBuf>) -> Result<RouterConfig> {
    let content = match override_path {
        Some(path) if path.exists() => fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };
    parse_config(&content)
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    defaults: Option<RawDefaults>,
    models: Option<HashMap<String, RawTaskConfig>>,
}

#[derive(Debug, Deserialize)]
struct RawDefaults {
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawTaskConfig {
    model: Option<String>,
    timeout_secs: Option<u64>,
}

fn parse_config(content: &str) -> Result<RouterConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid model config TOML: {}", e)))?;

    let mut config = RouterConfig::default();

    if let Some(defaults) = raw.defaults {
        config.default_model = defaults.model.filter(|m| !m.trim().is_empty());
        if let Some(timeout) = defaults.timeout_secs {
            config.default_timeout = Duration::from_secs(timeout);
        }
    }

    for (name, task_config) in raw.models.unwrap_or_default() {
        let Ok(task) = name.parse::<TaskType>() else {
            tracing::warn!(task = %name, "Ignoring unknown task type in model config");
            continue;
        };
        config.tasks.insert(
            task,
            TaskConfig {
                model: task_config.model.filter(|m| !m.trim().is_empty()),
                timeout: task_config
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or(config.default_timeout),
            },
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert!(config.default_model.is_none());
        assert_eq!(config.tasks.len(), TaskType::all().len());
        assert!(
            config.tasks[&TaskType::StructuredExtraction].timeout
                > config.tasks[&TaskType::FastClassification].timeout
        );
    }

    #[test]
    fn test_backend_model_used_when_unset() {
        let router = ModelRouter::with_config(RouterConfig::default());
        assert_eq!(
            router.model_for_task(TaskType::Reasoning, "llama3.2"),
            "llama3.2"
        );
        assert_eq!(
            router.timeout_for_task(TaskType::Reasoning),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_task_override_wins() {
        let config = parse_config(
            r#"
[defaults]
model = "gemma3"
timeout_secs = 20

[models.structured_extraction]
model = "qwen2.5:14b"
timeout_secs = 240

[models.teleportation]
model = "nope"
"#,
        )
        .unwrap();
        let router = ModelRouter::with_config(config);

        assert_eq!(
            router.model_for_task(TaskType::StructuredExtraction, "llama3.2"),
            "qwen2.5:14b"
        );
        assert_eq!(
            router.model_for_task(TaskType::Narrative, "llama3.2"),
            "gemma3"
        );
        assert_eq!(
            router.timeout_for_task(TaskType::Narrative),
            Duration::from_secs(20)
        );
        assert_eq!(router.config().tasks.len(), 1);
    }

    #[test]
    fn test_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.toml");
        std::fs::write(&path, "[defaults]\nmodel = \"mistral\"\n").unwrap();

        let router = ModelRouter::with_config_path(path).unwrap();
        assert_eq!(router.model_for_task(TaskType::Reasoning, "x"), "mistral");
    }

    #[test]
    fn test_invalid_config_is_error() {
        assert!(matches!(
            parse_config("[defaults\nmodel = "),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_task_type_round_trip() {
        for task in TaskType::all() {
            assert_eq!(task.as_str().parse::<TaskType>().unwrap(), *task);
        }
    }
}
