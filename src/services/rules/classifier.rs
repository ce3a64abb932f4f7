//! Heuristic Rule Classifier
//!
//! Decides whether a single user message states a durable rule, and turns
//! such messages into canonical rule sentences. Pure pattern matching: no
//! model call, no I/O.
//!
//! Noise patterns (acknowledgements, questions, polite requests, bare
//! commands) are checked before signal patterns and always win.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default length window, in characters of the trimmed text.
pub const DEFAULT_MIN_LENGTH: usize = 15;
pub const DEFAULT_MAX_LENGTH: usize = 500;

const NOISE_PATTERNS: &[&str] = &[
    r"(?i)^\s*$",
    r"(?i)^(?:ok|yes|no|sure|thanks|thank you|got it|understood|done|right)\s*[.!?]?\s*$",
    r"(?i)^(?:can you|could you|please|help me|show me|tell me)\b",
    r"(?i)^(?:what|where|when|who|how|why)\s+(?:is|are|do|does|did|was|were|should|would|could|can)\b",
    r"(?i)^(?:fix|run|build|test|deploy|install|update|upgrade|delete|remove|create|add)\s",
];

const SIGNAL_PATTERNS: &[&str] = &[
    r"(?i)\bbecause\b",
    r"(?i)\balways\b",
    r"(?i)\bnever\b",
    r"(?i)\bprefer\b",
    r"(?i)\bavoid\b",
    r"(?i)\buse\s+\S+\s+(?:for|instead|over)\b",
    r"(?i)\bdon'?t\s+use\b",
    r"(?i)\bdo\s+not\s+use\b",
    r"(?i)\binstead\s+of\b",
    r"(?i)\bmake\s+sure\s+(?:to|you)\b",
    r"(?i)\bwhen\s+\w+ing\b.*\balways\b",
    r"(?i)\bshould\s+(?:always|never)\b",
    r"(?i)\brule\s*:",
    r"(?i)\bconvention\s*:",
    r"(?i)\bpattern\s*:",
];

/// Leading discourse markers removed by [`normalize`]. Each may be followed
/// by a comma or colon.
const PREAMBLE_PATTERNS: &[&str] = &[
    r"(?i)^remember\b(?:\s+that\b)?\s*[,:]?\s*",
    r"(?i)^note\b(?:\s+that\b)?\s*[,:]?\s*",
    r"(?i)^from\s+now\s+on\b\s*[,:]?\s*",
    r"(?i)^going\s+forward\b\s*[,:]?\s*",
    r"(?i)^in\s+this\s+project\b\s*[,:]?\s*",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

fn noise_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile(NOISE_PATTERNS))
}

fn signal_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile(SIGNAL_PATTERNS))
}

fn preamble_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| compile(PREAMBLE_PATTERNS))
}

/// A normalized rule paired with the language it was detected for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRule {
    pub text: String,
    pub language: Option<String>,
}

/// Length-windowed heuristic classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleClassifier {
    min_length: usize,
    max_length: usize,
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LENGTH, DEFAULT_MAX_LENGTH)
    }
}

impl RuleClassifier {
    pub fn new(min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length,
        }
    }

    /// Whether `text` reads like a durable rule worth saving.
    pub fn is_memorable(&self, text: &str) -> bool {
        let trimmed = text.trim();
        let len = trimmed.chars().count();
        if len < self.min_length || len > self.max_length {
            return false;
        }

        if noise_patterns().iter().any(|re| re.is_match(trimmed)) {
            return false;
        }

        signal_patterns().iter().any(|re| re.is_match(trimmed))
    }

    /// Normalize `text` and detect its language with `detect`.
    pub fn extract_with_language<F>(&self, text: &str, detect: F) -> ClassifiedRule
    where
        F: Fn(&str) -> Option<&'static str>,
    {
        ClassifiedRule {
            text: normalize(text),
            language: detect(text).map(str::to_string),
        }
    }
}

/// Canonical rule sentence: discourse markers removed, first letter
/// capitalized, terminal `.` unless the text already ends in `.` or `!`.
///
/// Idempotent. Text that is empty once markers are removed normalizes to
/// the empty string.
pub fn normalize(text: &str) -> String {
    let mut rest = text.trim();
    // Markers can be stacked ("note that from now on, ..."), so strip until stable.
    loop {
        let before = rest.len();
        for re in preamble_patterns() {
            if let Some(m) = re.find(rest) {
                rest = rest[m.end()..].trim_start();
            }
        }
        if rest.len() == before {
            break;
        }
    }

    let mut chars = rest.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut out: String = first.to_uppercase().chain(chars).collect();
    if !out.ends_with('.') && !out.ends_with('!') {
        out.push('.');
    }
    out
}
