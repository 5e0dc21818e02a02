//! JSON parsing helpers for AI backend responses
//!
//! Models often wrap their JSON in code fences or surround it with prose.
//! These functions strip that, locate the payload and coerce loosely typed
//! fields. Anything unusable becomes `Error::Collaborator`.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::{CandidateTransaction, Category, QuestCandidate, QuestCategory};

use super::types::SavingsAdvice;

/// Rewards for collaborator quest ideas that omit them
pub const DEFAULT_IDEA_POINTS: u32 = 25;
pub const DEFAULT_IDEA_CURRENCY: u32 = 10;

static DAY_FIRST_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2,4})").expect("valid date regex")
});

/// Remove a surrounding Markdown code fence (with optional language tag)
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };

    let body = &trimmed[open + 3..];
    let tag_len = body
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    let body = &body[tag_len..];

    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Slice from the first `[` to the last `]`
pub fn extract_json_array(response: &str) -> Result<&str> {
    extract_delimited(response, '[', ']')
}

/// Slice from the first `{` to the last `}`
pub fn extract_json_object(response: &str) -> Result<&str> {
    extract_delimited(response, '{', '}')
}

fn extract_delimited(response: &str, open: char, close: char) -> Result<&str> {
    let cleaned = strip_code_fences(response);
    match (cleaned.find(open), cleaned.rfind(close)) {
        (Some(s), Some(e)) if s < e => Ok(&cleaned[s..=e]),
        _ => Err(Error::Collaborator(format!(
            "No JSON found in AI response | Raw: {}",
            preview(response)
        ))),
    }
}

fn parse_json(json: &str) -> Result<Value> {
    serde_json::from_str(json).map_err(|e| {
        Error::Collaborator(format!("Invalid JSON from AI: {} | Raw: {}", e, preview(json)))
    })
}

fn parse_array(response: &str) -> Result<Vec<Value>> {
    match parse_json(extract_json_array(response)?)? {
        Value::Array(items) => Ok(items),
        _ => Err(Error::Collaborator("Expected a JSON array".into())),
    }
}

fn parse_object(response: &str) -> Result<Map<String, Value>> {
    match parse_json(extract_json_object(response)?)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::Collaborator("Expected a JSON object".into())),
    }
}

/// Transactions from an extraction response
///
/// Entries without a usable non-zero amount are dropped; unreadable dates
/// become `None`.
pub fn parse_transactions_response(response: &str) -> Result<Vec<CandidateTransaction>> {
    Ok(parse_array(response)?
        .iter()
        .filter_map(candidate_from_value)
        .collect())
}

fn candidate_from_value(value: &Value) -> Option<CandidateTransaction> {
    let obj = value.as_object()?;
    let amount = coerce_amount(obj.get("amount")?)?;
    if amount == 0.0 {
        return None;
    }
    let date = obj.get("date").and_then(coerce_date);
    let description = match obj.get("description") {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    };
    Some(CandidateTransaction::new(date, &description, amount))
}

/// One label per input line; unknown labels are `None`
pub fn parse_categories_response(response: &str) -> Result<Vec<Option<Category>>> {
    Ok(parse_array(response)?
        .iter()
        .map(|v| v.as_str().and_then(|s| s.parse().ok()))
        .collect())
}

/// Savings advice; a present but non-numeric or negative daily amount fails
pub fn parse_savings_response(response: &str) -> Result<SavingsAdvice> {
    let obj = parse_object(response)?;

    let daily_savings_amount = match obj.get("daily_savings_amount") {
        None | Some(Value::Null) => None,
        Some(v) => {
            let amount = coerce_amount(v).ok_or_else(|| {
                Error::Collaborator(format!("daily_savings_amount is not numeric: {}", v))
            })?;
            if amount < 0.0 {
                return Err(Error::Collaborator(format!(
                    "daily_savings_amount is negative: {}",
                    amount
                )));
            }
            Some(amount)
        }
    };

    Ok(SavingsAdvice {
        daily_savings_amount,
        top_cut_category: string_field(&obj, "top_cut_category"),
        tip: string_field(&obj, "tip"),
        suggested_levels: obj
            .get("suggested_levels")
            .and_then(coerce_amount)
            .map(|v| v.round() as i64),
    })
}

/// Quest ideas; entries without a name are dropped
pub fn parse_quests_response(response: &str) -> Result<Vec<QuestCandidate>> {
    Ok(parse_array(response)?
        .iter()
        .filter_map(|v| {
            let obj = v.as_object()?;
            let name = string_field(obj, "name")?;
            Some(QuestCandidate {
                name,
                description: string_field(obj, "description").unwrap_or_default(),
                category: string_field(obj, "category")
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(QuestCategory::Milestone),
                points_reward: reward(obj, "points_reward").unwrap_or(DEFAULT_IDEA_POINTS),
                currency_reward: reward(obj, "currency_reward").unwrap_or(DEFAULT_IDEA_CURRENCY),
            })
        })
        .collect())
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn reward(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    let value = coerce_amount(obj.get(key)?)?;
    (value >= 0.0).then(|| value.round() as u32)
}

/// Numbers, or strings that read as numbers once `$`, `,` and spaces go
pub fn coerce_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | ' '))
            .collect::<String>()
            .parse::<f64>()
            .ok()?,
        _ => return None,
    };
    amount.is_finite().then_some(amount)
}

/// ISO `YYYY-MM-DD` (first ten characters), else day-first `D/M/Y`
pub fn coerce_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();

    if let Some(iso) = text.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
            return Some(date);
        }
    }

    let caps = DAY_FIRST_DATE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn preview(text: &str) -> String {
    if text.chars().count() > 200 {
        format!("{}...", text.chars().take(200).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  [3] "), "[3]");
    }

    #[test]
    fn test_extract_array_with_prose() {
        let json = extract_json_array("Here you go:\n[\"food\", \"bills\"]\nHope that helps").unwrap();
        assert_eq!(json, "[\"food\", \"bills\"]");
        assert!(extract_json_array("I cannot help with that.").is_err());
    }

    #[test]
    fn test_coerce_amount() {
        assert_eq!(coerce_amount(&json!(-45.99)), Some(-45.99));
        assert_eq!(coerce_amount(&json!("$1,200.50")), Some(1200.5));
        assert_eq!(coerce_amount(&json!("- 3.00")), Some(-3.0));
        assert_eq!(coerce_amount(&json!("n/a")), None);
        assert_eq!(coerce_amount(&json!(null)), None);
    }

    #[test]
    fn test_coerce_date() {
        assert_eq!(
            coerce_date(&json!("2024-01-15T00:00:00Z")),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            coerce_date(&json!("15/01/24")),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(coerce_date(&json!("Jan 15")), None);
        assert_eq!(coerce_date(&json!(20240115)), None);
    }

    #[test]
    fn test_parse_transactions_drops_unusable_entries() {
        let response = r#"[
            {"date": "2024-01-15", "description": "AMAZON", "amount": -45.99},
            {"date": "2024-01-16", "description": "SALARY", "amount": "3,000"},
            {"date": "2024-01-17", "description": "ZERO", "amount": 0},
            {"date": "2024-01-18", "description": "MISSING"},
            "not an object"
        ]"#;
        let txs = parse_transactions_response(response).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[1].amount, 3000.0);
    }

    #[test]
    fn test_parse_categories() {
        let labels = parse_categories_response("```json\n[\"Food\", \"groceries\", 3, \"other\"]\n```")
            .unwrap();
        assert_eq!(
            labels,
            vec![Some(Category::Food), None, None, Some(Category::Other)]
        );
    }

    #[test]
    fn test_parse_savings() {
        let advice = parse_savings_response(
            r#"{"daily_savings_amount": "12.5", "top_cut_category": "food", "tip": "Cook at home", "suggested_levels": 24.6}"#,
        )
        .unwrap();
        assert_eq!(advice.daily_savings_amount, Some(12.5));
        assert_eq!(advice.top_cut_category.as_deref(), Some("food"));
        assert_eq!(advice.suggested_levels, Some(25));

        let advice = parse_savings_response(r#"{"tip": "Skip delivery"}"#).unwrap();
        assert_eq!(advice.daily_savings_amount, None);
        assert_eq!(advice.suggested_levels, None);
    }

    #[test]
    fn test_parse_savings_rejects_bad_amounts() {
        assert!(parse_savings_response(r#"{"daily_savings_amount": "lots"}"#).is_err());
        assert!(parse_savings_response(r#"{"daily_savings_amount": -4}"#).is_err());
        assert!(parse_savings_response("Save more money!").is_err());
    }

    #[test]
    fn test_parse_quests_defaults() {
        let quests = parse_quests_response(
            r#"[
                {"name": "Coffee at home", "description": "Brew instead of buying", "category": "no-spend"},
                {"name": "Share a win", "category": "social", "points_reward": 40, "currency_reward": 20},
                {"description": "nameless"}
            ]"#,
        )
        .unwrap();
        assert_eq!(quests.len(), 2);
        assert_eq!(quests[0].category, QuestCategory::NoSpend);
        assert_eq!(quests[0].points_reward, DEFAULT_IDEA_POINTS);
        assert_eq!(quests[0].currency_reward, DEFAULT_IDEA_CURRENCY);
        assert_eq!(quests[1].points_reward, 40);
        assert_eq!(quests[1].description, "");
    }
}
