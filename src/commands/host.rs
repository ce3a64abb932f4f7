//! Host Protocol
//!
//! JSON-lines bridge between an agent host and the rule session. Each input
//! line is one event; each event is answered by exactly one output line
//! holding a `CommandResponse`.
//!
//! ```text
//! > {"type":"user_message","text":"always use tabs in Go files"}
//! < {"success":true,"data":{"rule":"...","language":"go","inserted":true},"error":null}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::commands::rules;
use crate::models::response::CommandResponse;
use crate::state::AppState;
use crate::utils::error::AppResult;

/// Events a host can send
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    UserMessage { text: String },
    FileRead { path: String },
    Compacting,
    Idle,
    Remember {
        rule: String,
        #[serde(default)]
        language: Option<String>,
    },
    Context,
}

fn to_value<T: Serialize>(response: CommandResponse<T>) -> CommandResponse<Value> {
    match response.data {
        Some(data) => match serde_json::to_value(data) {
            Ok(value) => CommandResponse::ok(value),
            Err(e) => CommandResponse::err(e.to_string()),
        },
        None => CommandResponse {
            success: response.success,
            data: None,
            error: response.error,
        },
    }
}

/// Route one event to its command
pub async fn dispatch(state: &AppState, event: HostEvent) -> CommandResponse<Value> {
    match event {
        HostEvent::UserMessage { text } => to_value(rules::record_user_message(state, text).await),
        HostEvent::FileRead { path } => to_value(rules::record_file_read(state, path).await),
        HostEvent::Compacting => to_value(rules::compaction_context(state).await),
        HostEvent::Idle => to_value(rules::run_extraction(state).await),
        HostEvent::Remember { rule, language } => {
            to_value(rules::remember_rule(state, rule, language).await)
        }
        HostEvent::Context => to_value(rules::get_context_overview(state).await),
    }
}

/// Answer a single raw input line
pub async fn handle_line(state: &AppState, line: &str) -> CommandResponse<Value> {
    match serde_json::from_str::<HostEvent>(line) {
        Ok(event) => {
            tracing::trace!(event = ?event, "host event");
            dispatch(state, event).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "malformed host event");
            CommandResponse::err(format!("Invalid event: {}", e))
        }
    }
}

/// Serve events until the reader is exhausted. Blank lines are ignored.
pub async fn serve<R, W>(state: &AppState, reader: R, mut writer: W) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = handle_line(state, line).await;
        let mut encoded = serde_json::to_string(&reply)?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
    }
    tracing::info!("host closed input, shutting down");
    Ok(())
}

/// Serve on the process's stdin and stdout
pub async fn serve_stdio(state: &AppState) -> AppResult<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve(state, stdin, tokio::io::stdout()).await
}
