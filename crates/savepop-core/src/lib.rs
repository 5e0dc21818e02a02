//! SavePop Core Library
//!
//! Bank statement processing for the SavePop savings app:
//! - Document backends (page dumps, plain text, pdftotext)
//! - Text and table extraction with layout and word-clustering passes
//! - Table, text-line and semantic transaction builders
//! - Reconciliation of the three candidate passes
//! - Keyword categorization with optional AI refinement
//! - Spending analysis: category totals, savings plan, quests
//! - Pluggable AI backends (Ollama, OpenAI-compatible, Gemini)
//! - Model router for task-based model selection
//! - Prompt library for customizable AI prompts

pub mod ai;
pub mod categorize;
pub mod document;
pub mod error;
pub mod extract;
pub mod import;
pub mod insights;
pub mod model_router;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod reconcile;
pub mod store;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, GeminiBackend, MockBackend, OllamaBackend, OpenAICompatibleBackend,
    QuestRequest, RouterInfo, SavingsAdvice, SavingsRequest,
};
pub use categorize::{categorize, categorize_rules};
pub use document::{open_document, Document, DocumentBackend, DocumentFormat, Page};
pub use error::{Error, Result};
pub use insights::{category_totals, SpendingAnalyzer};
pub use model_router::{ModelRouter, RouterConfig, TaskConfig, TaskType};
pub use models::{
    CandidateTransaction, Category, CategoryTotals, QuestCandidate, QuestCategory,
    ReconciledTransaction, SavingsGoal, SavingsSuggestion, SpendingReport,
};
pub use pipeline::StatementProcessor;
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use reconcile::{reconcile, ExtractionPass, ExtractionPasses, Reconciliation, Selection};
pub use store::{MemoryStore, StoredStatement, TransactionStore};
