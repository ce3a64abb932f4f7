//! Model Session Provider Trait
//!
//! Defines the interface the rule reasoner uses to talk to a model: open a
//! scratch session, prompt it, and release it again.

use async_trait::async_trait;

use super::types::{LlmError, LlmResult};

/// Trait that all model session providers must implement.
///
/// Results of [`prompt`](ModelSessionProvider::prompt) are opaque JSON values;
/// callers extract the text they need from whatever shape the provider
/// returns.
#[async_trait]
pub trait ModelSessionProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Open a new session and return its id.
    async fn create_session(&self) -> LlmResult<String>;

    /// Send one user turn to the session.
    ///
    /// # Arguments
    /// * `session_id` - Id returned by `create_session`
    /// * `system` - Optional system prompt for this turn
    /// * `text` - User text
    async fn prompt(
        &self,
        session_id: &str,
        system: Option<&str>,
        text: &str,
    ) -> LlmResult<serde_json::Value>;

    /// Release a session. Deleting an unknown session is an error.
    async fn delete_session(&self, session_id: &str) -> LlmResult<()>;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
