//! Extraction Integration Tests
//!
//! Model-assisted extraction through `AppState`, with a scripted provider
//! standing in for the model.

use std::sync::{Arc, Mutex};

use agent_context::commands::{self, HostEvent};
use agent_context::services::rules::{CycleOutcome, ExtractedRule};
use agent_context::state::AppState;
use agent_context::storage::ConfigService;
use agent_context_llm::{LlmError, LlmResult, ModelSessionProvider};
use async_trait::async_trait;
use serde_json::{json, Value};

struct ScriptedProvider {
    replies: Mutex<Vec<LlmResult<Value>>>,
    prompts: Mutex<Vec<String>>,
    open_sessions: Mutex<usize>,
}

impl ScriptedProvider {
    fn new(replies: Vec<LlmResult<Value>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
            open_sessions: Mutex::new(0),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelSessionProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn create_session(&self) -> LlmResult<String> {
        *self.open_sessions.lock().unwrap() += 1;
        Ok("scratch".to_string())
    }

    async fn prompt(&self, _id: &str, _system: Option<&str>, text: &str) -> LlmResult<Value> {
        self.prompts.lock().unwrap().push(text.to_string());
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Ok(json!({"text": "[]"}));
        }
        replies.remove(0)
    }

    async fn delete_session(&self, _id: &str) -> LlmResult<()> {
        *self.open_sessions.lock().unwrap() -= 1;
        Ok(())
    }
}

async fn state_with(provider: Arc<ScriptedProvider>) -> (tempfile::TempDir, AppState) {
    let tmp = tempfile::tempdir().unwrap();
    let config = ConfigService::open(tmp.path().join("config.json")).unwrap();
    let state = AppState::new();
    state.initialize(tmp.path(), config).await.unwrap();
    state.set_provider(Some(provider)).await;
    (tmp, state)
}

async fn say(state: &AppState, text: &str) {
    assert!(commands::record_user_message(state, text.to_string()).await.success);
}

#[tokio::test]
async fn test_idle_learns_rules_and_activates_languages() {
    let provider = ScriptedProvider::new(vec![Ok(json!({
        "parts": [{
            "type": "text",
            "text": "```json\n[{\"rule\": \"use sqlx for database access\", \"language\": \"Rust\"}]\n```"
        }]
    }))]);
    let (_tmp, state) = state_with(provider.clone()).await;
    say(&state, "the repo talks to postgres").await;
    say(&state, "we went with sqlx there").await;

    let outcome = commands::run_extraction(&state).await.data.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Applied {
            saved: vec![ExtractedRule {
                rule: "Use sqlx for database access.".to_string(),
                language: "rust".to_string(),
            }]
        }
    );
    assert_eq!(*provider.open_sessions.lock().unwrap(), 0);

    let block = commands::build_context(&state, None, false).await.data.unwrap();
    assert!(block.contains("- Use sqlx for database access."));

    let prompt = &provider.prompts()[0];
    assert!(prompt.contains("[1] the repo talks to postgres"));
    assert!(prompt.contains("[2] we went with sqlx there"));
}

#[tokio::test]
async fn test_failed_call_keeps_messages_for_retry() {
    let provider = ScriptedProvider::new(vec![
        Err(LlmError::ServerError {
            message: "overloaded".to_string(),
            status: Some(529),
        }),
        Ok(json!({"text": "[]"})),
    ]);
    let (_tmp, state) = state_with(provider.clone()).await;
    say(&state, "tests live next to the code").await;

    let first = commands::run_extraction(&state).await.data.unwrap();
    assert!(matches!(first, CycleOutcome::Failed { .. }));

    let second = commands::run_extraction(&state).await.data.unwrap();
    assert_eq!(second, CycleOutcome::Empty);

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("[1] tests live next to the code"));

    // nothing new since the last readable reply
    let third = commands::run_extraction(&state).await.data.unwrap();
    assert_eq!(third, CycleOutcome::NotDue);
    assert_eq!(provider.prompts().len(), 2);
}

#[tokio::test]
async fn test_known_rules_are_sent_and_not_duplicated() {
    let provider = ScriptedProvider::new(vec![Ok(json!({
        "text": "[{\"rule\": \"Use pnpm.\", \"language\": \"general\"}, {\"rule\": \"prefer vitest\"}]"
    }))]);
    let (_tmp, state) = state_with(provider.clone()).await;
    commands::remember_rule(&state, "use pnpm".to_string(), None).await;
    say(&state, "and vitest for unit tests").await;

    let outcome = commands::run_extraction(&state).await.data.unwrap();
    let CycleOutcome::Applied { saved } = outcome else {
        panic!("expected applied outcome");
    };
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].rule, "Prefer vitest.");
    assert_eq!(saved[0].language, "general");

    assert!(provider.prompts()[0].contains("- Use pnpm."));
    let rules = commands::list_rules(&state).await.data.unwrap();
    assert_eq!(rules["general"], vec!["Use pnpm.", "Prefer vitest."]);
}

#[tokio::test]
async fn test_idle_host_event_reports_outcome() {
    let provider = ScriptedProvider::new(vec![Ok(json!({"info": "no text here"}))]);
    let (_tmp, state) = state_with(provider).await;
    say(&state, "the api uses cursor pagination").await;

    let reply = commands::dispatch(&state, HostEvent::Idle).await;
    assert!(reply.success);
    assert_eq!(reply.data.unwrap()["outcome"], "failed");
}
