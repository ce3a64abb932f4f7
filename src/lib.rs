//! Agent Context - Rule Memory Engine
//!
//! Learns coding rules from a user's conversation with an agent, keeps them
//! as per-language markdown documents inside the project, and injects the
//! relevant ones back into the agent's context.
//!
//! It includes:
//! - Command handlers for hosts and the CLI
//! - The rule engine services
//! - Storage layer (config)
//! - Data models and utilities

pub mod commands;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

// Re-export commonly used items from commands
pub use commands::{
    // Rule commands
    build_context, compaction_context, detect_languages, get_context_overview, list_rules,
    record_file_read, record_user_message, remember_rule, run_extraction,
    // Settings commands
    get_settings, update_settings,
    // Host protocol
    dispatch, serve, serve_stdio, HostEvent,
};
pub use models::response::*;
pub use models::settings::{AppConfig, SettingsUpdate};
pub use services::rules::{ContextStore, CycleOutcome, RuleClassifier, RuleReasoner, RuleSession};
pub use state::AppState;
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
