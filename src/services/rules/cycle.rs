//! Extraction Cycle
//!
//! Drives one model-assisted extraction over the messages buffered since the
//! last successful cycle:
//!
//! ```text
//! Idle -> PromptBuilt -> AwaitingModel -> ResponseParsed -> Applied | Skipped -> Idle
//! ```
//!
//! The watermark moves only when the model produced readable text. A failed
//! call leaves it where it was so the same messages are retried on the next
//! idle trigger; a readable reply with zero rules still advances it.

use agent_context_llm::{LlmResult, ModelSessionProvider};
use serde::{Deserialize, Serialize};

use crate::services::rules::reasoner::{ExtractedRule, RuleReasoner};
use crate::services::rules::store::ContextStore;
use crate::utils::error::AppResult;

/// Phase of the cycle currently in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    PromptBuilt,
    AwaitingModel,
    ResponseParsed,
    Applied,
    Skipped,
}

/// What a call to [`ExtractionCycle::run`] did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// No messages arrived since the watermark; the model was not called
    NotDue,
    /// The model call failed or returned nothing readable; watermark kept
    Failed { reason: String },
    /// The model answered with no rules; watermark advanced
    Empty,
    /// Rules were parsed and stored; `saved` lists only newly written ones
    Applied { saved: Vec<ExtractedRule> },
}

/// Watermark and state of the extraction cycle for one session
#[derive(Debug, Clone)]
pub struct ExtractionCycle {
    watermark: usize,
    state: CycleState,
    max_batch: usize,
}

impl ExtractionCycle {
    pub fn new(max_batch: usize) -> Self {
        Self {
            watermark: 0,
            state: CycleState::Idle,
            max_batch: max_batch.max(1),
        }
    }

    /// Number of buffered messages already handled
    pub fn watermark(&self) -> usize {
        self.watermark
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }

    /// Shift the watermark after the caller dropped `dropped` leading
    /// messages from its buffer.
    pub fn rebase(&mut self, dropped: usize) {
        self.watermark = self.watermark.saturating_sub(dropped);
    }

    /// Whether `message_count` has moved past the watermark
    pub fn is_due(&self, message_count: usize) -> bool {
        message_count > self.watermark
    }

    fn transition(&mut self, next: CycleState) {
        tracing::debug!(from = ?self.state, to = ?next, "extraction cycle transition");
        self.state = next;
    }

    fn finish(&mut self, outcome: CycleOutcome) -> CycleOutcome {
        self.transition(CycleState::Idle);
        outcome
    }

    /// Run one cycle over `messages`, the full session buffer.
    ///
    /// Only messages after the watermark are sent, at most `max_batch` of
    /// them (the newest). Storage failures propagate and leave the watermark
    /// unchanged; model failures are reported as [`CycleOutcome::Failed`].
    pub async fn run<P>(
        &mut self,
        messages: &[String],
        store: &ContextStore,
        provider: &P,
    ) -> AppResult<CycleOutcome>
    where
        P: ModelSessionProvider + ?Sized,
    {
        if !self.is_due(messages.len()) {
            tracing::debug!(watermark = self.watermark, "no new messages, skipping extraction");
            return Ok(CycleOutcome::NotDue);
        }

        let pending = &messages[self.watermark..];
        let batch = &pending[pending.len().saturating_sub(self.max_batch)..];
        let existing: Vec<String> = store.get_all_rules()?.into_values().flatten().collect();
        let prompt = RuleReasoner::build_extraction_prompt(batch, &existing);
        self.transition(CycleState::PromptBuilt);

        self.transition(CycleState::AwaitingModel);
        let text = match invoke_model(provider, &prompt).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::warn!(provider = provider.name(), "model result carried no text");
                return Ok(self.finish(CycleOutcome::Failed {
                    reason: "model result carried no text".to_string(),
                }));
            }
            Err(e) => {
                tracing::warn!(provider = provider.name(), error = %e, "rule extraction call failed");
                return Ok(self.finish(CycleOutcome::Failed {
                    reason: e.to_string(),
                }));
            }
        };

        self.transition(CycleState::ResponseParsed);
        let extracted = RuleReasoner::parse_extraction_response(&text);
        if extracted.is_empty() {
            self.transition(CycleState::Skipped);
            self.watermark = messages.len();
            tracing::debug!(watermark = self.watermark, "model found no new rules");
            return Ok(self.finish(CycleOutcome::Empty));
        }

        let mut saved = Vec::new();
        for item in extracted {
            let rule = RuleReasoner::normalize_rule(&item.rule);
            let language = ContextStore::storage_key(&item.language);
            let inserted = match store.add_rule(&language, &rule) {
                Ok(inserted) => inserted,
                Err(e) => {
                    self.transition(CycleState::Idle);
                    return Err(e);
                }
            };
            if inserted {
                tracing::info!(language = %language, rule = %rule, "learned rule from conversation");
                saved.push(ExtractedRule { rule, language });
            }
        }

        self.transition(CycleState::Applied);
        self.watermark = messages.len();
        Ok(self.finish(CycleOutcome::Applied { saved }))
    }
}

/// Open a scratch session, prompt it once, and always try to delete it.
async fn invoke_model<P>(provider: &P, prompt: &str) -> LlmResult<Option<String>>
where
    P: ModelSessionProvider + ?Sized,
{
    let session_id = provider.create_session().await?;
    let result = provider
        .prompt(&session_id, Some(RuleReasoner::system_prompt()), prompt)
        .await;

    if let Err(e) = provider.delete_session(&session_id).await {
        tracing::warn!(session_id = %session_id, error = %e, "failed to delete model session");
    }

    Ok(RuleReasoner::extract_text_from_result(&result?))
}
