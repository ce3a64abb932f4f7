//! Agent Context Core
//!
//! Foundational error types and the per-session context shared by the
//! Agent Context workspace. This crate has no dependencies on model
//! providers, storage or the command-line host.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `context` - Session context (`ExecutionContext`, `SessionContext`, `ActiveLanguageSet`)

pub mod context;
pub mod error;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Session Context ────────────────────────────────────────────────────
pub use context::{
    sanitize_tag, validate_tag, ActiveLanguageSet, ExecutionContext, SessionContext, GENERAL_TAG,
};
