//! Model-Assisted Rule Extraction
//!
//! The slow path of rule capture: a batch of user messages is sent to a
//! model together with the rules already stored, and the model answers with
//! a JSON array of `{rule, language}` objects.
//!
//! Everything here is pure. The extraction cycle in `cycle.rs` owns the
//! model session and the watermark.

use std::sync::OnceLock;

use agent_context_core::GENERAL_TAG;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::rules::classifier::normalize;

/// Serialized results at or above this size are never scraped for arrays.
const MAX_FALLBACK_LENGTH: usize = 10_000;

/// A rule proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRule {
    pub rule: String,
    pub language: String,
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"```[A-Za-z]*[ \t]*\r?\n?([\s\S]*?)\n?\s*```").ok())
        .as_ref()
}

fn array_regex() -> Option<&'static Regex> {
    static ARRAY: OnceLock<Option<Regex>> = OnceLock::new();
    ARRAY
        .get_or_init(|| Regex::new(r"\[[\s\S]*?\]").ok())
        .as_ref()
}

/// Rule extraction prompts and response parsing
pub struct RuleReasoner;

impl RuleReasoner {
    /// Fixed system prompt, embedded at build time.
    pub fn system_prompt() -> &'static str {
        static PROMPT: OnceLock<&'static str> = OnceLock::new();
        PROMPT.get_or_init(|| include_str!("prompts/extraction_system.md").trim())
    }

    /// Build the user turn of an extraction request.
    ///
    /// ```text
    /// ## Already saved rules (do NOT re-extract these)
    /// - ...
    ///
    /// ## User messages from this session
    /// [1] ...
    /// [2] ...
    ///
    /// Analyze the messages above. ...
    /// ```
    ///
    /// The saved-rules section is left out entirely when there are none.
    pub fn build_extraction_prompt<M, R>(messages: &[M], existing_rules: &[R]) -> String
    where
        M: AsRef<str>,
        R: AsRef<str>,
    {
        let mut parts = Vec::with_capacity(3);

        if !existing_rules.is_empty() {
            let saved: Vec<String> = existing_rules
                .iter()
                .map(|r| format!("- {}", r.as_ref()))
                .collect();
            parts.push(format!(
                "## Already saved rules (do NOT re-extract these)\n{}",
                saved.join("\n")
            ));
        }

        let numbered: Vec<String> = messages
            .iter()
            .enumerate()
            .map(|(i, m)| format!("[{}] {}", i + 1, m.as_ref()))
            .collect();
        parts.push(format!(
            "## User messages from this session\n{}",
            numbered.join("\n")
        ));

        parts.push(
            "Analyze the messages above. Extract any new rules the user expressed. \
             Respond with ONLY a JSON array."
                .to_string(),
        );

        parts.join("\n\n")
    }

    /// Parse a model reply into rules. Never fails: anything unusable
    /// yields an empty list.
    pub fn parse_extraction_response(response: &str) -> Vec<ExtractedRule> {
        let json_str = extract_json_str(response.trim());

        let items: Vec<Value> = match serde_json::from_str::<Value>(json_str) {
            Ok(Value::Array(items)) => items,
            _ => return Vec::new(),
        };

        items
            .iter()
            .filter_map(|item| {
                let rule = item.get("rule")?.as_str()?.trim();
                if rule.is_empty() {
                    return None;
                }
                let language = item
                    .get("language")
                    .and_then(|v| v.as_str())
                    .map(|l| l.trim().to_lowercase())
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| GENERAL_TAG.to_string());
                Some(ExtractedRule {
                    rule: rule.to_string(),
                    language,
                })
            })
            .collect()
    }

    /// Same canonical form as the heuristic path.
    pub fn normalize_rule(text: &str) -> String {
        normalize(text)
    }

    /// Pull reply text out of an opaque model result.
    ///
    /// Known shapes are tried in [`ResultShape::PRIORITY`] order; a regex
    /// scrape of the serialized result is the last resort.
    pub fn extract_text_from_result(result: &Value) -> Option<String> {
        if !result.is_object() {
            return None;
        }
        ResultShape::PRIORITY
            .iter()
            .find_map(|shape| shape.extract(result))
            .or_else(|| scrape_json_array(result))
    }
}

/// Substring most likely to hold the JSON array: a fenced block body, else
/// the span from the first `[` to the last `]`, else the whole text.
fn extract_json_str(text: &str) -> &str {
    if let Some(body) = fence_regex()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
    {
        return body.as_str().trim();
    }
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

fn scrape_json_array(result: &Value) -> Option<String> {
    let serialized = serde_json::to_string(result).ok()?;
    let len = serialized.chars().count();
    if len <= 2 || len >= MAX_FALLBACK_LENGTH {
        return None;
    }
    array_regex()?
        .find(&serialized)
        .map(|m| m.as_str().to_string())
}

/// Result layouts returned by model hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    /// `{"text": "..."}`
    DirectText,
    /// `{"parts": ["...", {"text": "..."}]}`
    Parts,
    /// `{"message": {...}}`, holding one of the other shapes
    NestedMessage,
    /// `{"content": ["...", {"text": "..."}]}`
    ContentArray,
}

impl ResultShape {
    pub const PRIORITY: [ResultShape; 4] = [
        ResultShape::DirectText,
        ResultShape::Parts,
        ResultShape::NestedMessage,
        ResultShape::ContentArray,
    ];

    /// Shapes allowed inside a nested message; nesting is one level deep.
    const NESTED: [ResultShape; 3] = [
        ResultShape::DirectText,
        ResultShape::Parts,
        ResultShape::ContentArray,
    ];

    pub fn extract(self, result: &Value) -> Option<String> {
        match self {
            ResultShape::DirectText => result.get("text")?.as_str().map(str::to_string),
            ResultShape::Parts => first_text(result.get("parts")?.as_array()?),
            ResultShape::ContentArray => first_text(result.get("content")?.as_array()?),
            ResultShape::NestedMessage => {
                let message = result.get("message").filter(|m| m.is_object())?;
                Self::NESTED.iter().find_map(|shape| shape.extract(message))
            }
        }
    }
}

/// First string element, or first `{text: string}` element, if non-empty.
fn first_text(items: &[Value]) -> Option<String> {
    items
        .iter()
        .find_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("text").and_then(|t| t.as_str()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
