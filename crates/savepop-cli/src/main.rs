//! SavePop CLI - Bank statement processing
//!
//! Usage:
//!   savepop extract --file statement.pdf              Categorized transactions
//!   savepop analyze --file statement.pdf --target 500 Savings plan and quests
//!   savepop prompts list                              Prompt overrides
//!   savepop status                                    AI backend and routing

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use savepop_core::ai::AIClient;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let ai = AIClient::from_env();

    match cli.command {
        Commands::Extract {
            file,
            json,
            out,
            owner,
            statement,
        } => {
            let export = out.map(|path| commands::ExportTarget {
                statement_id: statement.unwrap_or_else(|| commands::statement_id_for(&file)),
                owner: owner.unwrap_or_else(|| "local".to_string()),
                path,
            });
            commands::cmd_extract(ai.as_ref(), &file, json, export.as_ref()).await
        }
        Commands::Analyze {
            file,
            target,
            current,
            target_date,
            goal,
            json,
        } => {
            let goal = commands::parse_goal(target, current, target_date.as_deref(), goal)?;
            let today = chrono::Local::now().date_naive();
            commands::cmd_analyze(ai.as_ref(), &file, &goal, today, json).await
        }
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
        Commands::Status => commands::cmd_status(ai.as_ref()).await,
    }
}
