//! Rule Memory Engine
//!
//! Learns coding rules from user conversation, persists them as per-language
//! markdown documents, and injects the relevant ones back into the agent's
//! context.
//!
//! ## Module Structure
//!
//! - `detector` - Language tags from file paths, project listings and utterances
//! - `classifier` - Heuristic fast path: is a message a rule, and its canonical form
//! - `store` - One markdown document per language tag
//! - `injector` - "Remembered Rules" block for the active languages
//! - `reasoner` - Model-assisted slow path: prompts and response parsing
//! - `cycle` - Watermarked extraction cycle around a model session
//! - `session` - Per-session wiring of host events and tools

pub mod classifier;
pub mod cycle;
pub mod detector;
pub mod injector;
pub mod reasoner;
pub mod session;
pub mod store;

pub use classifier::{normalize, ClassifiedRule, RuleClassifier};
pub use cycle::{CycleOutcome, CycleState, ExtractionCycle};
pub use detector::{
    collect_project_files, frameworks_for_files, language_for_extension, language_from_utterance,
    languages_for_files, supported_languages,
};
pub use injector::{build_compact_context_string, build_context_injection, INJECTION_HEADER};
pub use reasoner::{ExtractedRule, ResultShape, RuleReasoner};
pub use session::{RuleSession, SavedRule, NO_RULES_HINT, REMEMBER_USAGE};
pub use store::{parse_rules, ContextStore};
