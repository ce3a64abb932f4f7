//! Rule Session
//!
//! Wires the engine to one agent session for one project. The host forwards
//! its events here (user messages, file reads, compaction, idle) and exposes
//! the `remember` and `context` tools through it.
//!
//! The session owns the active language set and the message buffer; nothing
//! here is process-global.

use std::path::Path;

use agent_context_core::{validate_tag, ActiveLanguageSet, ExecutionContext, SessionContext, GENERAL_TAG};
use agent_context_llm::ModelSessionProvider;
use serde::{Deserialize, Serialize};

use crate::models::settings::AppConfig;
use crate::services::rules::classifier::{normalize, RuleClassifier};
use crate::services::rules::cycle::{CycleOutcome, ExtractionCycle};
use crate::services::rules::detector::{
    collect_project_files, frameworks_for_files, language_for_extension, language_from_utterance,
    languages_for_files,
};
use crate::services::rules::injector::{build_compact_context_string, build_context_injection};
use crate::services::rules::store::{capitalize, ContextStore};
use crate::utils::error::AppResult;

pub const REMEMBER_USAGE: &str = "No rule provided. Usage: /remember <rule>";
pub const NO_RULES_HINT: &str = "No rules saved yet. Use /remember to save a rule, \
or just explain a preference and it will be auto-detected.";

/// A rule captured from a user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRule {
    pub rule: String,
    pub language: String,
    /// `false` when the rule was already stored
    pub inserted: bool,
}

/// Engine state for one project session
pub struct RuleSession {
    context: SessionContext,
    store: ContextStore,
    classifier: RuleClassifier,
    cycle: ExtractionCycle,
    messages: Vec<String>,
    auto_capture: bool,
    max_scan_files: usize,
}

impl RuleSession {
    pub fn new(project_root: &Path, config: &AppConfig) -> AppResult<Self> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let context = SessionContext::new(session_id, project_root)?;
        Ok(Self {
            store: ContextStore::for_project(context.project_root(), &config.context_dir),
            context,
            classifier: RuleClassifier::new(config.min_rule_length, config.max_rule_length),
            cycle: ExtractionCycle::new(config.max_batch_messages),
            messages: Vec::new(),
            auto_capture: config.auto_capture,
            max_scan_files: config.max_scan_files,
        })
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn active_languages(&self) -> &ActiveLanguageSet {
        self.context.active_languages()
    }

    /// User messages buffered for model-assisted extraction
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn cycle(&self) -> &ExtractionCycle {
        &self.cycle
    }

    // ── Active language seeding ────────────────────────────────────────

    /// Seed the active set from a project scan, once per session.
    ///
    /// A failed scan is logged and not retried.
    pub fn ensure_initialized(&mut self) {
        if self.context.is_seeded() {
            return;
        }
        self.context.mark_seeded();

        match collect_project_files(self.context.project_root(), self.max_scan_files) {
            Ok(files) => {
                let added = self.seed_from_files(&files);
                tracing::info!(
                    session_id = %self.context.session_id(),
                    files = files.len(),
                    languages = ?self.active_languages().to_vec(),
                    added,
                    "agent context session initialized"
                );
            }
            Err(e) => {
                tracing::debug!(error = %e, "could not auto-detect project languages");
            }
        }
    }

    /// Add the languages and frameworks indicated by `files`.
    pub fn seed_from_files<S: AsRef<str>>(&mut self, files: &[S]) -> usize {
        let languages = languages_for_files(files);
        let frameworks = frameworks_for_files(files);
        self.context
            .active_languages_mut()
            .extend(languages.into_iter().chain(frameworks))
    }

    // ── Host events ────────────────────────────────────────────────────

    /// Buffer a user message and save it right away if it reads like a rule.
    pub fn on_user_message(&mut self, text: &str) -> AppResult<Option<SavedRule>> {
        self.ensure_initialized();
        self.buffer_message(text);

        if !self.auto_capture || !self.classifier.is_memorable(text) {
            return Ok(None);
        }

        let classified = self
            .classifier
            .extract_with_language(text, language_from_utterance);
        let language = classified
            .language
            .unwrap_or_else(|| GENERAL_TAG.to_string());
        let saved = self.save(&language, classified.text)?;
        if saved.inserted {
            tracing::info!(language = %saved.language, rule = %saved.rule, "saved rule");
        }
        Ok(Some(saved))
    }

    /// Track the language of a file the agent read.
    pub fn on_file_read(&mut self, path: &str) -> Option<&'static str> {
        self.ensure_initialized();
        let language = language_for_extension(path)?;
        if self.context.active_languages_mut().insert(language) {
            tracing::debug!(language, path, "language activated by file read");
        }
        Some(language)
    }

    /// Context strings to carry across a compaction.
    pub fn on_compacting(&mut self) -> AppResult<Vec<String>> {
        self.ensure_initialized();
        let languages = self.active_languages().to_vec();
        let context = build_compact_context_string(&self.store, &languages)?;
        tracing::debug!(
            languages = ?languages,
            context_count = context.len(),
            "injected context into compaction"
        );
        Ok(context)
    }

    /// Full injection block for the current active languages.
    pub fn context_injection(&mut self) -> AppResult<String> {
        self.ensure_initialized();
        build_context_injection(&self.store, &self.active_languages().to_vec())
    }

    /// Run one model-assisted extraction over the buffered messages.
    pub async fn on_idle<P>(&mut self, provider: &P) -> AppResult<CycleOutcome>
    where
        P: ModelSessionProvider + ?Sized,
    {
        self.ensure_initialized();
        let outcome = self.cycle.run(&self.messages, &self.store, provider).await?;
        self.drop_handled_messages();
        if let CycleOutcome::Applied { saved } = &outcome {
            let active = self.context.active_languages_mut();
            for rule in saved {
                active.insert(&rule.language);
            }
        }
        Ok(outcome)
    }

    /// Messages below the watermark are never sent again, and only the
    /// newest `max_batch` pending ones ever reach the model.
    fn buffer_message(&mut self, text: &str) {
        self.drop_handled_messages();
        self.messages.push(text.to_string());
        let overflow = self.messages.len().saturating_sub(self.cycle.max_batch());
        if overflow > 0 {
            self.messages.drain(..overflow);
        }
    }

    fn drop_handled_messages(&mut self) {
        let handled = self.cycle.watermark().min(self.messages.len());
        if handled > 0 {
            self.messages.drain(..handled);
            self.cycle.rebase(handled);
        }
    }

    // ── Tools ──────────────────────────────────────────────────────────

    /// The `remember` tool: save a rule explicitly.
    ///
    /// Returns the text shown to the user. An explicit language that
    /// sanitizes to nothing is an error.
    pub fn remember(&mut self, rule: &str, language: Option<&str>) -> AppResult<String> {
        let language = match language.map(str::trim).filter(|l| !l.is_empty()) {
            Some(l) => validate_tag(l)?,
            None => GENERAL_TAG.to_string(),
        };

        let cleaned = normalize(rule);
        if cleaned.is_empty() {
            return Ok(REMEMBER_USAGE.to_string());
        }

        let saved = self.save(&language, cleaned)?;
        if saved.inserted {
            Ok(format!("Rule saved to {} context:\n> {}", saved.language, saved.rule))
        } else {
            Ok(format!(
                "Rule already saved in {} context:\n> {}",
                saved.language, saved.rule
            ))
        }
    }

    /// The `context` tool: every saved rule, grouped by language.
    pub fn context_overview(&self) -> AppResult<String> {
        let all = self.store.get_all_rules()?;
        if all.is_empty() {
            return Ok(NO_RULES_HINT.to_string());
        }

        let sections: Vec<String> = all
            .iter()
            .map(|(language, rules)| {
                let list: Vec<String> = rules.iter().map(|r| format!("- {}", r)).collect();
                format!("### {}\n{}", capitalize(language), list.join("\n"))
            })
            .collect();

        Ok(format!("## Saved Context Rules\n\n{}", sections.join("\n\n")))
    }

    fn save(&mut self, language: &str, rule: String) -> AppResult<SavedRule> {
        let language = ContextStore::storage_key(language);
        let inserted = self.store.add_rule(&language, &rule)?;
        self.context.active_languages_mut().insert(&language);
        Ok(SavedRule {
            rule,
            language,
            inserted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::AppError;

    fn session() -> (tempfile::TempDir, RuleSession) {
        let tmp = tempfile::tempdir().unwrap();
        let session = RuleSession::new(tmp.path(), &AppConfig::default()).unwrap();
        (tmp, session)
    }

    #[test]
    fn test_memorable_message_is_saved_under_detected_language() {
        let (_tmp, mut session) = session();
        let saved = session
            .on_user_message("In Go, always wrap returned errors with context")
            .unwrap()
            .unwrap();
        assert_eq!(saved.language, "go");
        assert_eq!(saved.rule, "In Go, always wrap returned errors with context.");
        assert!(saved.inserted);
        assert!(session.active_languages().contains("go"));
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_message_without_language_goes_to_general() {
        let (_tmp, mut session) = session();
        let saved = session
            .on_user_message("remember that we never force-push to main")
            .unwrap()
            .unwrap();
        assert_eq!(saved.language, "general");
        assert_eq!(saved.rule, "We never force-push to main.");
        assert_eq!(
            session.store().read_rules("general").unwrap(),
            vec!["We never force-push to main."]
        );
    }

    #[test]
    fn test_noise_is_buffered_but_not_saved() {
        let (_tmp, mut session) = session();
        assert!(session.on_user_message("fix the bug in user.ts").unwrap().is_none());
        assert!(session.on_user_message("ok").unwrap().is_none());
        assert_eq!(session.messages().len(), 2);
        assert!(session.store().get_all_rules().unwrap().is_empty());
    }

    #[test]
    fn test_auto_capture_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig {
            auto_capture: false,
            ..Default::default()
        };
        let mut session = RuleSession::new(tmp.path(), &config).unwrap();
        assert!(session
            .on_user_message("always use named exports because it aids refactors")
            .unwrap()
            .is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_message_buffer_is_capped_to_batch_size() {
        let tmp = tempfile::tempdir().unwrap();
        let config = AppConfig {
            max_batch_messages: 3,
            ..Default::default()
        };
        let mut session = RuleSession::new(tmp.path(), &config).unwrap();
        for text in ["one", "two", "three", "four", "five"] {
            session.on_user_message(text).unwrap();
        }
        assert_eq!(session.messages(), ["three", "four", "five"]);
    }

    #[tokio::test]
    async fn test_idle_drops_handled_messages() {
        struct EmptyReply;

        #[async_trait::async_trait]
        impl ModelSessionProvider for EmptyReply {
            fn name(&self) -> &'static str {
                "empty"
            }
            async fn create_session(&self) -> agent_context_llm::LlmResult<String> {
                Ok("s".to_string())
            }
            async fn prompt(
                &self,
                _id: &str,
                _system: Option<&str>,
                _text: &str,
            ) -> agent_context_llm::LlmResult<serde_json::Value> {
                Ok(serde_json::json!({"text": "[]"}))
            }
            async fn delete_session(&self, _id: &str) -> agent_context_llm::LlmResult<()> {
                Ok(())
            }
        }

        let (_tmp, mut session) = session();
        session.on_user_message("first").unwrap();
        session.on_user_message("second").unwrap();

        assert_eq!(session.on_idle(&EmptyReply).await.unwrap(), CycleOutcome::Empty);
        assert!(session.messages().is_empty());
        assert_eq!(session.cycle().watermark(), 0);

        session.on_user_message("third").unwrap();
        assert_eq!(session.messages(), ["third"]);
        assert!(session.cycle().is_due(session.messages().len()));
    }

    #[test]
    fn test_file_reads_and_project_scan_activate_languages() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("main.py"), "").unwrap();
        std::fs::write(tmp.path().join("tailwind.config.js"), "").unwrap();
        let mut session = RuleSession::new(tmp.path(), &AppConfig::default()).unwrap();

        assert_eq!(session.on_file_read("src/lib.rs"), Some("rust"));
        assert_eq!(session.on_file_read("README.md"), None);

        let active = session.active_languages();
        assert!(active.contains("python"));
        assert!(active.contains("javascript"));
        assert!(active.contains("tailwind"));
        assert!(active.contains("rust"));
    }

    #[test]
    fn test_compaction_injects_active_and_general_rules() {
        let (_tmp, mut session) = session();
        assert!(session.on_compacting().unwrap().is_empty());

        session.remember("keep commits small", None).unwrap();
        session.store().add_rule("python", "Use ruff.").unwrap();
        session.store().add_rule("rust", "Never use unwrap.").unwrap();
        session.on_file_read("src/main.rs");

        let context = session.on_compacting().unwrap();
        assert_eq!(context.len(), 1);
        assert!(context[0].contains("Keep commits small."));
        assert!(context[0].contains("Never use unwrap."));
        assert!(!context[0].contains("Use ruff."));
    }

    #[test]
    fn test_remember_tool_messages() {
        let (_tmp, mut session) = session();
        assert_eq!(session.remember("   ", None).unwrap(), REMEMBER_USAGE);
        assert_eq!(session.remember("remember that", None).unwrap(), REMEMBER_USAGE);

        assert_eq!(
            session.remember("prefer interfaces over types", Some("TypeScript")).unwrap(),
            "Rule saved to typescript context:\n> Prefer interfaces over types."
        );
        assert_eq!(
            session.remember("Prefer interfaces over types.", Some("typescript")).unwrap(),
            "Rule already saved in typescript context:\n> Prefer interfaces over types."
        );
        assert!(session.active_languages().contains("typescript"));
    }

    #[test]
    fn test_remember_rejects_unusable_language() {
        let (_tmp, mut session) = session();
        let err = session.remember("use tabs", Some("???")).unwrap_err();
        assert!(matches!(err, AppError::Core(_)));
        // blank language falls back to general
        assert!(session.remember("use tabs", Some("  ")).unwrap().contains("general"));
    }

    #[test]
    fn test_context_overview() {
        let (_tmp, mut session) = session();
        assert_eq!(session.context_overview().unwrap(), NO_RULES_HINT);

        session.remember("use tabs", None).unwrap();
        session.remember("wrap errors", Some("go")).unwrap();
        session.remember("check err", Some("go")).unwrap();

        assert_eq!(
            session.context_overview().unwrap(),
            "## Saved Context Rules\n\n### General\n- Use tabs.\n\n### Go\n- Wrap errors.\n- Check err."
        );
    }
}
