//! Context Injection
//!
//! Assembles the "Remembered Rules" block handed to the agent: the raw
//! documents of every active language plus the `general` bucket.

use agent_context_core::{sanitize_tag, GENERAL_TAG};

use crate::services::rules::store::ContextStore;
use crate::utils::error::AppResult;

/// Fixed preamble of every non-empty context bundle.
pub const INJECTION_HEADER: &str = "## Agent Context: Remembered Rules\n\
The following rules were explicitly saved by the user across previous sessions.\n\
Follow these rules unless the user explicitly overrides them.\n";

/// Build the context bundle for the given active languages.
///
/// Documents are taken in the store's listing order. Returns an empty string
/// when no relevant document has content.
///
/// ```text
/// ## Agent Context: Remembered Rules
/// The following rules ...
/// Follow these rules ...
///
/// # General Rules
///
/// - ...
///
/// # Rust Rules
///
/// - ...
/// ```
pub fn build_context_injection<S: AsRef<str>>(
    store: &ContextStore,
    active_languages: &[S],
) -> AppResult<String> {
    let mut targets: Vec<String> = active_languages
        .iter()
        .filter_map(|tag| sanitize_tag(tag.as_ref()))
        .collect();
    targets.push(GENERAL_TAG.to_string());

    let mut sections = Vec::new();
    for tag in store.list_context_files()? {
        if !targets.contains(&tag) {
            continue;
        }
        let Some(content) = store.get_context_file_content(&tag)? else {
            continue;
        };
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        sections.push(content.to_string());
    }

    if sections.is_empty() {
        return Ok(String::new());
    }

    tracing::debug!(sections = sections.len(), "built context injection");
    Ok(format!("{}\n{}\n", INJECTION_HEADER, sections.join("\n\n")))
}

/// Zero or one bundle, ready to append to a host's extra-context list.
pub fn build_compact_context_string<S: AsRef<str>>(
    store: &ContextStore,
    active_languages: &[S],
) -> AppResult<Vec<String>> {
    let injection = build_context_injection(store, active_languages)?;
    if injection.is_empty() {
        Ok(Vec::new())
    } else {
        Ok(vec![injection])
    }
}
