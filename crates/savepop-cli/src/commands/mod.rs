//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `analyze` - Savings plan and quests for a statement
//! - `extract` - Statement extraction and JSON export
//! - `prompts` - Prompt library management commands
//! - `status` - AI backend, routing and health

pub mod analyze;
pub mod extract;
pub mod prompts;
pub mod status;

// Re-export command functions for main.rs
pub use analyze::*;
pub use extract::*;
pub use prompts::*;
pub use status::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Dollar amount with sign, e.g. `-$6.15`
pub fn format_amount(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}
