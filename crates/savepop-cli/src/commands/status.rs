//! AI backend status

use anyhow::Result;
use savepop_core::ai::{AIBackend, AIClient};
use savepop_core::model_router::default_config_path;
use savepop_core::prompts::default_prompts_dir;

pub async fn cmd_status(ai: Option<&AIClient>) -> Result<()> {
    println!();
    println!("📊 SavePop Status");
    println!("   ─────────────────────────────────────────────────────────────");

    let Some(ai) = ai else {
        println!("   AI backend: none configured (heuristic extraction only)");
        println!("      Set AI_BACKEND and OLLAMA_HOST, OPENAI_COMPATIBLE_HOST");
        println!("      or GOOGLE_AI_API_KEY to enable semantic extraction.");
        print_paths();
        println!();
        return Ok(());
    };

    println!("   AI backend: {}", ai.backend_name());
    println!("   Host: {}", ai.host());
    println!("   Model: {}", ai.model());

    let router = ai.router_info();
    println!("   Default model: {}", router.default_model);
    for (task, model) in &router.task_models {
        println!("      {:<24} → {}", task, model);
    }

    print!("   Health: ");
    if ai.health_check().await {
        println!("✅ Reachable");
    } else {
        println!("❌ Unreachable (statements still process without it)");
    }

    print_paths();
    println!();
    Ok(())
}

fn print_paths() {
    let show = |p: Option<std::path::PathBuf>| {
        p.map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not available)".to_string())
    };
    println!();
    println!("   Model config: {}", show(default_config_path()));
    println!("   Prompt overrides: {}", show(default_prompts_dir()));
}
