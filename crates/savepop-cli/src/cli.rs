//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// SavePop - Turn bank statements into a savings plan
#[derive(Parser)]
#[command(name = "savepop")]
#[command(about = "Bank statement extraction and savings planner", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract categorized transactions from a statement
    Extract {
        /// Statement file (.pdf, .txt or a .json page dump)
        #[arg(short, long)]
        file: PathBuf,

        /// Print transactions as JSON
        #[arg(long)]
        json: bool,

        /// Write the result to a JSON export file
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Owner recorded in the export file (defaults to "local")
        #[arg(long, requires = "out")]
        owner: Option<String>,

        /// Statement id recorded in the export file (defaults to the file name)
        #[arg(long, requires = "out")]
        statement: Option<String>,
    },

    /// Extract a statement and build a savings plan against a goal
    Analyze {
        /// Statement file (.pdf, .txt or a .json page dump)
        #[arg(short, long)]
        file: PathBuf,

        /// Goal target amount
        #[arg(short, long)]
        target: f64,

        /// Amount already saved
        #[arg(short, long, default_value = "0")]
        current: f64,

        /// Goal date (YYYY-MM-DD)
        #[arg(long)]
        target_date: Option<String>,

        /// Goal name, passed along for quest ideas
        #[arg(short, long)]
        goal: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage AI prompts
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },

    /// Show AI backend, model routing and health
    Status,
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (e.g., extract_transactions, suggest_savings)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}
