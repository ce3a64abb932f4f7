//! Agent Context LLM
//!
//! Model session abstraction used by the rule reasoner, plus one concrete
//! provider for OpenAI-compatible chat completions endpoints (OpenAI itself,
//! or local gateways such as Ollama and LM Studio).
//!
//! Also includes the HTTP client factory.

pub mod http_client;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export main types
pub use http_client::build_http_client;
pub use openai::OpenAICompatibleProvider;
pub use provider::{missing_api_key_error, parse_http_error, ModelSessionProvider};
pub use types::*;
