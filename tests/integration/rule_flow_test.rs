//! Rule Flow Integration Tests
//!
//! Drives a project session through the command layer the way a host would.

use agent_context::commands::{self, HostEvent};
use agent_context::models::settings::SettingsUpdate;
use agent_context::services::rules::{ContextStore, INJECTION_HEADER, NO_RULES_HINT};
use agent_context::state::AppState;
use agent_context::storage::ConfigService;

async fn project_state(files: &[&str]) -> (tempfile::TempDir, AppState) {
    let tmp = tempfile::tempdir().unwrap();
    let project = tmp.path().join("project");
    std::fs::create_dir_all(&project).unwrap();
    for file in files {
        let path = project.join(file);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }
    let config = ConfigService::open(tmp.path().join("config.json")).unwrap();
    let state = AppState::new();
    state.initialize(&project, config).await.unwrap();
    (tmp, state)
}

// ============================================================================
// Capture
// ============================================================================

#[tokio::test]
async fn test_user_message_rule_lands_in_language_document() {
    let (tmp, state) = project_state(&[]).await;

    let reply = commands::record_user_message(
        &state,
        "In Rust, never use unwrap in library code".to_string(),
    )
    .await;
    let saved = reply.data.unwrap().unwrap();
    assert_eq!(saved.language, "rust");
    assert!(saved.inserted);

    let document =
        std::fs::read_to_string(tmp.path().join("project/.agent-context/context/rust.md")).unwrap();
    assert_eq!(
        document,
        "# Rust Rules\n\n- In Rust, never use unwrap in library code.\n"
    );
}

#[tokio::test]
async fn test_task_requests_are_not_captured() {
    let (_tmp, state) = project_state(&[]).await;
    for text in ["fix the failing test", "can you add a button?", "thanks"] {
        let reply = commands::record_user_message(&state, text.to_string()).await;
        assert!(reply.success);
        assert!(reply.data.unwrap().is_none(), "captured: {}", text);
    }
    let overview = commands::get_context_overview(&state).await;
    assert_eq!(overview.data.unwrap(), NO_RULES_HINT);
}

#[tokio::test]
async fn test_remember_deduplicates_case_insensitively() {
    let (_tmp, state) = project_state(&[]).await;
    let first = commands::remember_rule(&state, "use pnpm".to_string(), None).await;
    assert_eq!(first.data.unwrap(), "Rule saved to general context:\n> Use pnpm.");

    let second = commands::remember_rule(&state, "USE PNPM.".to_string(), None).await;
    assert!(second.data.unwrap().starts_with("Rule already saved"));

    let rules = commands::list_rules(&state).await.data.unwrap();
    assert_eq!(rules["general"], vec!["Use pnpm."]);
}

#[tokio::test]
async fn test_remember_with_unusable_language_fails() {
    let (_tmp, state) = project_state(&[]).await;
    let reply = commands::remember_rule(&state, "use tabs".to_string(), Some("!!".to_string())).await;
    assert!(!reply.success);
    assert!(reply.error.unwrap().contains("Invalid language tag"));
}

// ============================================================================
// Injection
// ============================================================================

#[tokio::test]
async fn test_injection_follows_project_languages() {
    let (_tmp, state) = project_state(&["src/main.rs", "Cargo.toml"]).await;
    commands::remember_rule(&state, "prefer small commits".to_string(), None).await;
    commands::remember_rule(&state, "avoid clone in loops".to_string(), Some("rust".into())).await;
    commands::remember_rule(&state, "use ruff".to_string(), Some("python".into())).await;

    let block = commands::build_context(&state, None, true).await.data.unwrap();
    assert!(block.starts_with(INJECTION_HEADER));
    assert!(block.contains("- Prefer small commits."));
    assert!(block.contains("- Avoid clone in loops."));
    assert!(!block.contains("Use ruff."));
}

#[tokio::test]
async fn test_injection_with_explicit_languages() {
    let (_tmp, state) = project_state(&["src/main.rs"]).await;
    commands::remember_rule(&state, "use ruff".to_string(), Some("python".into())).await;
    commands::remember_rule(&state, "avoid clone in loops".to_string(), Some("rust".into())).await;

    let block = commands::build_context(&state, Some(vec!["Python".to_string()]), true)
        .await
        .data
        .unwrap();
    assert!(block.contains("Use ruff."));
    assert!(!block.contains("Avoid clone in loops."));
}

#[tokio::test]
async fn test_injection_without_scan_only_has_general() {
    let (tmp, state) = project_state(&["lib/app.dart"]).await;
    let store = ContextStore::for_project(&tmp.path().join("project"), ".agent-context/context");
    store.add_rule("dart", "Prefer const constructors.").unwrap();

    let block = commands::build_context(&state, None, false).await.data.unwrap();
    assert_eq!(block, "");

    let block = commands::build_context(&state, None, true).await.data.unwrap();
    assert!(block.contains("Prefer const constructors."));
}

#[tokio::test]
async fn test_file_reads_widen_compaction_context() {
    let (_tmp, state) = project_state(&[]).await;
    commands::remember_rule(&state, "check every error".to_string(), Some("go".into())).await;

    let context = commands::compaction_context(&state).await.data.unwrap();
    // remembering activates the language for the session
    assert_eq!(context.len(), 1);

    let language = commands::record_file_read(&state, "web/app.tsx".to_string()).await;
    assert_eq!(language.data.unwrap().as_deref(), Some("typescript"));
    let report = commands::detect_languages(&state).await.data.unwrap();
    assert!(report.active.contains(&"typescript".to_string()));
    assert!(report.active.contains(&"go".to_string()));
    assert!(report.supported.contains(&"rust".to_string()));
}

// ============================================================================
// Host protocol and settings
// ============================================================================

#[tokio::test]
async fn test_host_context_event() {
    let (_tmp, state) = project_state(&[]).await;
    commands::dispatch(
        &state,
        HostEvent::Remember {
            rule: "keep functions short".to_string(),
            language: None,
        },
    )
    .await;
    let reply = commands::dispatch(&state, HostEvent::Context).await;
    assert_eq!(
        reply.data.unwrap(),
        "## Saved Context Rules\n\n### General\n- Keep functions short."
    );
}

#[tokio::test]
async fn test_settings_update_is_validated_and_persisted() {
    let (tmp, state) = project_state(&[]).await;

    let bad = commands::update_settings(
        &state,
        SettingsUpdate {
            min_rule_length: Some(600),
            ..Default::default()
        },
    )
    .await;
    assert!(!bad.success);

    let good = commands::update_settings(
        &state,
        SettingsUpdate {
            auto_capture: Some(false),
            ..Default::default()
        },
    )
    .await;
    assert!(good.success);
    assert!(!commands::get_settings(&state).await.data.unwrap().auto_capture);

    let reloaded = ConfigService::open(tmp.path().join("config.json")).unwrap();
    assert!(!reloaded.get_config_clone().auto_capture);
}
