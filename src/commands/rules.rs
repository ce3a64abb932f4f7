//! Rule Commands
//!
//! Entry points for saving, listing and injecting remembered rules, and for
//! forwarding host events to the rule session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::response::CommandResponse;
use crate::services::rules::{
    build_context_injection, supported_languages, CycleOutcome, SavedRule,
};
use crate::state::AppState;
use crate::utils::error::AppError;

/// Languages seen by the current session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageReport {
    pub active: Vec<String>,
    pub supported: Vec<String>,
}

/// Save a rule explicitly (the `remember` tool)
pub async fn remember_rule(
    state: &AppState,
    rule: String,
    language: Option<String>,
) -> CommandResponse<String> {
    state
        .with_session(|session| session.remember(&rule, language.as_deref()))
        .await
        .into()
}

/// All saved rules, keyed by language tag
pub async fn list_rules(state: &AppState) -> CommandResponse<BTreeMap<String, Vec<String>>> {
    state
        .with_session(|session| session.store().get_all_rules())
        .await
        .into()
}

/// Human-readable overview of saved rules (the `context` tool)
pub async fn get_context_overview(state: &AppState) -> CommandResponse<String> {
    state
        .with_session(|session| session.context_overview())
        .await
        .into()
}

/// Build the injection block.
///
/// With explicit `languages` only those (plus `general`) are included.
/// Otherwise the session's active set is used, seeded from a project scan
/// unless `scan` is false.
pub async fn build_context(
    state: &AppState,
    languages: Option<Vec<String>>,
    scan: bool,
) -> CommandResponse<String> {
    state
        .with_session(|session| match languages {
            Some(languages) if !languages.is_empty() => {
                build_context_injection(session.store(), &languages)
            }
            _ if scan => session.context_injection(),
            _ => build_context_injection(session.store(), &session.active_languages().to_vec()),
        })
        .await
        .into()
}

/// Buffer a user message; returns the rule if one was captured
pub async fn record_user_message(
    state: &AppState,
    text: String,
) -> CommandResponse<Option<SavedRule>> {
    state
        .with_session(|session| session.on_user_message(&text))
        .await
        .into()
}

/// Track a file read; returns the language it activated
pub async fn record_file_read(state: &AppState, path: String) -> CommandResponse<Option<String>> {
    state
        .with_session(|session| Ok(session.on_file_read(&path).map(str::to_string)))
        .await
        .into()
}

/// Context strings to keep across compaction
pub async fn compaction_context(state: &AppState) -> CommandResponse<Vec<String>> {
    state
        .with_session(|session| session.on_compacting())
        .await
        .into()
}

/// Run one model-assisted extraction cycle over buffered messages
pub async fn run_extraction(state: &AppState) -> CommandResponse<CycleOutcome> {
    let Some(provider) = state.provider().await else {
        return CommandResponse::err(
            AppError::config("No model provider configured; extraction disabled").to_string(),
        );
    };

    let mut guard = state.session_guard().await;
    let Some(session) = guard.as_mut() else {
        return CommandResponse::err(AppError::internal("Rule session not initialized").to_string());
    };

    let outcome = session.on_idle(provider.as_ref()).await;
    if let Ok(outcome) = &outcome {
        tracing::debug!(outcome = ?outcome, "extraction cycle finished");
    }
    outcome.into()
}

/// Active and supported language tags
pub async fn detect_languages(state: &AppState) -> CommandResponse<LanguageReport> {
    state
        .with_session(|session| {
            session.ensure_initialized();
            Ok(LanguageReport {
                active: session.active_languages().to_vec(),
                supported: supported_languages()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            })
        })
        .await
        .into()
}
