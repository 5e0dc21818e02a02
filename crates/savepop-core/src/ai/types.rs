//! AI backend request and response types
//!
//! These types are backend-agnostic and used across all AI implementations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Router configuration information for display
#[derive(Debug, Clone)]
pub struct RouterInfo {
    /// Model used for tasks without their own
    pub default_model: String,
    /// Task-specific models (only those differing from the default)
    pub task_models: Vec<(String, String)>,
}

/// Inputs for a savings plan suggestion
#[derive(Debug, Clone, Serialize)]
pub struct SavingsRequest {
    /// Outflow per category, rounded to cents
    pub spending: BTreeMap<String, f64>,
    pub target_amount: f64,
    pub current_amount: f64,
    pub remaining: f64,
    pub days: i64,
}

/// Savings advice as returned by the collaborator
///
/// Only `daily_savings_amount` is validated during parsing (numeric and
/// non-negative when present); the analyzer fills gaps and clamps ranges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavingsAdvice {
    pub daily_savings_amount: Option<f64>,
    pub top_cut_category: Option<String>,
    pub tip: Option<String>,
    pub suggested_levels: Option<i64>,
}

/// Inputs for extra quest ideas
#[derive(Debug, Clone, Serialize)]
pub struct QuestRequest {
    pub spending: BTreeMap<String, f64>,
    pub goal_name: Option<String>,
}
