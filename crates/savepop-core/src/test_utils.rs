//! Test utilities for savepop-core
//!
//! A mock collaborator HTTP server speaking the Ollama, OpenAI-compatible
//! and Gemini wire formats. Answers are derived from the prompt text, so
//! the real prompt templates and response parsers are exercised end to end.

use std::net::SocketAddr;
use std::sync::LazyLock;

use axum::{
    extract::Json,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::oneshot;

static LINE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-?\d[\d,]*\.\d{2})\s*$").expect("valid amount regex"));
static LINE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2})/(\d{2})/(\d{4})\s+").expect("valid date regex")
});
static REMAINING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"remaining: \$([\d.]+)").expect("valid remaining regex"));
static DAYS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Days to goal: (\d+)").expect("valid days regex"));

/// Mock collaborator server for testing and development
pub struct MockOllamaServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOllamaServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat))
            .route("/v1beta/models/:model_action", post(handle_gemini));
        Self::serve(app).await
    }

    /// Start a server that is reachable but fails every generation request
    pub async fn start_failing() -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_failure))
            .route("/v1/chat/completions", post(handle_failure))
            .route("/v1beta/models/:model_action", post(handle_failure));
        Self::serve(app).await
    }

    async fn serve(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ollama tags endpoint response (health check)
async fn handle_tags() -> Json<Value> {
    Json(json!({
        "models": [{
            "name": "llama3.2:latest",
            "modified_at": "2024-01-01T00:00:00Z",
            "size": 4_000_000_000u64
        }]
    }))
}

async fn handle_models() -> Json<Value> {
    Json(json!({ "data": [{ "id": "mock-model", "object": "model" }] }))
}

async fn handle_failure() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}

/// Ollama generate endpoint
async fn handle_generate(Json(request): Json<GenerateRequest>) -> Json<GenerateResponse> {
    Json(GenerateResponse {
        response: mock_answer(&request.prompt),
        model: request.model,
        done: true,
    })
}

/// OpenAI-compatible chat completions endpoint
async fn handle_chat(Json(request): Json<Value>) -> Json<Value> {
    let prompt = request["messages"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter(|m| m["role"] == "user")
                .filter_map(|m| m["content"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    Json(json!({
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": mock_answer(&prompt) },
            "finish_reason": "stop"
        }]
    }))
}

/// Gemini generateContent endpoint
async fn handle_gemini(Json(request): Json<Value>) -> Json<Value> {
    let prompt = request["contents"]
        .as_array()
        .map(|contents| {
            contents
                .iter()
                .filter_map(|c| c["parts"].as_array())
                .flatten()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    Json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": mock_answer(&prompt) }] }
        }]
    }))
}

/// Answer a rendered prompt; markers match the templates in prompts/*.md
fn mock_answer(prompt: &str) -> String {
    if let Some((_, text)) = prompt.split_once("Bank statement text:") {
        // Fenced, the way chat models tend to answer
        format!("```json\n{}\n```", extract_mock(text))
    } else if prompt.contains("Assign each line to one category") {
        let lines = prompt.split_once("Lines:").map(|(_, l)| l).unwrap_or("");
        categorize_mock(lines)
    } else if prompt.contains("Savings goal:") {
        savings_mock(prompt)
    } else if prompt.contains("quest ideas") {
        json!([
            {
                "name": "Lunch from home",
                "description": "Bring lunch instead of buying it",
                "category": "no-spend",
                "points_reward": 25,
                "currency_reward": 10
            },
            {
                "name": "Log it all",
                "description": "Write down every expense today",
                "category": "milestone"
            }
        ])
        .to_string()
    } else {
        "I'm not sure what you are asking.".to_string()
    }
}

fn extract_mock(text: &str) -> String {
    let entries: Vec<Value> = text
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let amount_match = LINE_AMOUNT.captures(line)?;
            let raw = amount_match[1].replace(',', "");
            let magnitude: f64 = raw.trim_start_matches('-').parse().ok()?;

            let upper = line.to_uppercase();
            let inflow = ["PAYROLL", "SALARY", "DEPOSIT", "REFUND"]
                .iter()
                .any(|k| upper.contains(k));
            let amount = if inflow { magnitude } else { -magnitude };

            let (date, rest) = match LINE_DATE.captures(line) {
                Some(caps) => (
                    Value::String(format!("{}-{}-{}", &caps[3], &caps[1], &caps[2])),
                    &line[caps[0].len()..],
                ),
                None => (Value::Null, line),
            };
            let description = rest
                .strip_suffix(&amount_match[0])
                .unwrap_or(rest)
                .trim()
                .to_string();

            Some(json!({ "date": date, "description": description, "amount": amount }))
        })
        .collect();
    Value::Array(entries).to_string()
}

fn categorize_mock(lines: &str) -> String {
    let labels: Vec<&str> = lines
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let upper = line.to_uppercase();
            if upper.contains("STARBUCKS") || upper.contains("GROCER") || upper.contains("CAFE") {
                "food"
            } else if upper.contains("UBER") || upper.contains("SHELL") {
                "transport"
            } else if upper.contains("RENT") || upper.contains("ELECTRIC") {
                "bills"
            } else if upper.contains("AMAZON") || upper.contains("AMZN") {
                "shopping"
            } else if upper.contains("NETFLIX") {
                "subscriptions"
            } else {
                "other"
            }
        })
        .collect();
    json!(labels).to_string()
}

fn savings_mock(prompt: &str) -> String {
    let remaining: f64 = REMAINING
        .captures(prompt)
        .and_then(|c| c[1].trim_end_matches('.').parse().ok())
        .unwrap_or(0.0);
    let days: f64 = DAYS
        .captures(prompt)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(180.0);

    json!({
        "daily_savings_amount": (remaining / days * 100.0).round() / 100.0,
        "top_cut_category": "food",
        "tip": "Cook at home three nights a week",
        "suggested_levels": 24
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_mock_reads_lines() {
        let answer = extract_mock("01/15/2024 STARBUCKS 6.15\nOpening balance\n01/16/2024 PAYROLL 2,500.00");
        let parsed: Value = serde_json::from_str(&answer).unwrap();
        let entries = parsed.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["date"], "2024-01-15");
        assert_eq!(entries[0]["description"], "STARBUCKS");
        assert_eq!(entries[0]["amount"], -6.15);
        assert_eq!(entries[1]["amount"], 2500.0);
    }

    #[test]
    fn test_savings_mock_divides_remaining() {
        let answer = savings_mock("Savings goal: $500.00, current savings: $100.00, remaining: $400.00. Days to goal: 40.");
        let parsed: Value = serde_json::from_str(&answer).unwrap();
        assert_eq!(parsed["daily_savings_amount"], 10.0);
    }

    #[test]
    fn test_unknown_prompt_is_not_json() {
        assert!(serde_json::from_str::<Value>(&mock_answer("hello")).is_err());
    }
}
