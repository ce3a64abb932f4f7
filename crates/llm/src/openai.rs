//! OpenAI-Compatible Session Provider
//!
//! Implements [`ModelSessionProvider`] on top of a stateless chat completions
//! endpoint. Sessions are emulated by keeping each session's history in
//! memory and replaying it on every prompt.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::provider::{missing_api_key_error, parse_http_error, ModelSessionProvider};
use super::types::{ChatMessage, ChatRole, LlmError, LlmResult, ProviderConfig};
use crate::http_client::build_http_client;

/// Default OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Provider for any endpoint speaking the OpenAI chat completions protocol
pub struct OpenAICompatibleProvider {
    config: ProviderConfig,
    client: reqwest::Client,
    sessions: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl OpenAICompatibleProvider {
    /// Create a new provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(config.proxy.as_deref())?;
        Ok(Self {
            config,
            client,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Get the API endpoint
    fn endpoint(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// Only the default endpoint insists on a key; local gateways often run without one.
    fn requires_api_key(&self) -> bool {
        self.config.base_url.is_none()
    }

    /// Build the request body for the API
    fn build_request_body(&self, system: Option<&str>, history: &[ChatMessage]) -> serde_json::Value {
        let mut messages: Vec<serde_json::Value> = Vec::with_capacity(history.len() + 1);
        if let Some(sys) = system {
            messages.push(serde_json::json!({
                "role": "system",
                "content": sys
            }));
        }
        messages.extend(history.iter().map(|m| serde_json::json!(m)));

        serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "stream": false,
            "messages": messages,
        })
    }

    /// Pull the assistant text out of a completions response.
    ///
    /// A completion without string content (null content, truncated or
    /// filtered output) is a parse error, never an empty reply.
    fn reply_text(response: &serde_json::Value) -> LlmResult<String> {
        let choice = response.get("choices").and_then(|c| c.get(0));
        let content = choice
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str());
        match content {
            Some(text) => Ok(text.to_string()),
            None => {
                let finish_reason = choice
                    .and_then(|c| c.get("finish_reason"))
                    .and_then(|r| r.as_str())
                    .unwrap_or("unknown");
                Err(LlmError::ParseError {
                    message: format!(
                        "Completion carried no message content (finish_reason: {})",
                        finish_reason
                    ),
                })
            }
        }
    }
}

#[async_trait]
impl ModelSessionProvider for OpenAICompatibleProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn create_session(&self) -> LlmResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions.lock().await.insert(id.clone(), Vec::new());
        tracing::debug!(session_id = %id, provider = self.name(), "model session created");
        Ok(id)
    }

    async fn prompt(
        &self,
        session_id: &str,
        system: Option<&str>,
        text: &str,
    ) -> LlmResult<serde_json::Value> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) => Some(key),
            None if self.requires_api_key() => return Err(missing_api_key_error(self.name())),
            None => None,
        };

        // Snapshot the history so the lock is not held across the request.
        let history = {
            let mut sessions = self.sessions.lock().await;
            let history = sessions
                .get_mut(session_id)
                .ok_or_else(|| LlmError::SessionNotFound {
                    session_id: session_id.to_string(),
                })?;
            history.push(ChatMessage::new(ChatRole::User, text));
            history.clone()
        };

        let body = self.build_request_body(system, &history);
        let mut request = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if status != 200 {
            return Err(parse_http_error(status, &body_text, self.name()));
        }

        let raw: serde_json::Value =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        let reply = Self::reply_text(&raw).inspect_err(|e| {
            tracing::debug!(session_id, error = %e, "unusable completion");
        })?;

        if let Some(history) = self.sessions.lock().await.get_mut(session_id) {
            history.push(ChatMessage::new(ChatRole::Assistant, reply.clone()));
        }

        Ok(serde_json::json!({
            "parts": [{ "type": "text", "text": reply }],
            "model": self.config.model,
        }))
    }

    async fn delete_session(&self, session_id: &str) -> LlmResult<()> {
        match self.sessions.lock().await.remove(session_id) {
            Some(_) => {
                tracing::debug!(session_id, "model session deleted");
                Ok(())
            }
            None => Err(LlmError::SessionNotFound {
                session_id: session_id.to_string(),
            }),
        }
    }
}
