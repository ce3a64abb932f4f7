//! Settings Models
//!
//! Application configuration and settings data structures.

use agent_context_llm::ProviderConfig;
use serde::{Deserialize, Serialize};

use crate::utils::paths::DEFAULT_CONTEXT_DIR;

/// Application configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Rule storage directory, relative to the project root unless absolute
    pub context_dir: String,
    /// Shortest message (in characters, after trimming) the heuristic path accepts
    pub min_rule_length: usize,
    /// Longest message the heuristic path accepts
    pub max_rule_length: usize,
    /// Save rules detected by the heuristic classifier as messages arrive
    pub auto_capture: bool,
    /// Run model-assisted extraction cycles on idle
    pub reasoning_enabled: bool,
    /// Most recent new messages sent to the model in one cycle
    pub max_batch_messages: usize,
    /// Upper bound on files visited by the startup project scan
    pub max_scan_files: usize,
    /// Model used by extraction cycles; cycles are skipped without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            context_dir: DEFAULT_CONTEXT_DIR.to_string(),
            min_rule_length: 15,
            max_rule_length: 500,
            auto_capture: true,
            reasoning_enabled: true,
            max_batch_messages: 50,
            max_scan_files: 5000,
            provider: None,
        }
    }
}

/// Partial settings update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub context_dir: Option<String>,
    pub min_rule_length: Option<usize>,
    pub max_rule_length: Option<usize>,
    pub auto_capture: Option<bool>,
    pub reasoning_enabled: Option<bool>,
    pub max_batch_messages: Option<usize>,
    pub max_scan_files: Option<usize>,
    pub provider: Option<ProviderConfig>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(dir) = update.context_dir {
            self.context_dir = dir;
        }
        if let Some(min) = update.min_rule_length {
            self.min_rule_length = min;
        }
        if let Some(max) = update.max_rule_length {
            self.max_rule_length = max;
        }
        if let Some(auto_capture) = update.auto_capture {
            self.auto_capture = auto_capture;
        }
        if let Some(enabled) = update.reasoning_enabled {
            self.reasoning_enabled = enabled;
        }
        if let Some(batch) = update.max_batch_messages {
            self.max_batch_messages = batch;
        }
        if let Some(files) = update.max_scan_files {
            self.max_scan_files = files;
        }
        if let Some(provider) = update.provider {
            self.provider = Some(provider);
        }
    }

    /// Whether idle triggers should run extraction cycles
    pub fn reasoning_active(&self) -> bool {
        self.reasoning_enabled && self.provider.is_some()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.context_dir.trim().is_empty() {
            return Err("context_dir cannot be empty".to_string());
        }

        if self.min_rule_length >= self.max_rule_length {
            return Err(format!(
                "min_rule_length ({}) must be below max_rule_length ({})",
                self.min_rule_length, self.max_rule_length
            ));
        }

        if self.max_batch_messages == 0 {
            return Err("max_batch_messages must be at least 1".to_string());
        }

        if let Some(provider) = &self.provider {
            if provider.model.trim().is_empty() {
                return Err("provider.model cannot be empty".to_string());
            }
        }

        Ok(())
    }
}
