//! Application State
//!
//! Services shared by every command: configuration, the rule session for
//! the current project and the model provider used for extraction cycles.

use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use agent_context_llm::{ModelSessionProvider, OpenAICompatibleProvider};

use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::services::rules::RuleSession;
use crate::storage::ConfigService;
use crate::utils::error::{AppError, AppResult};

/// Application state
pub struct AppState {
    /// Configuration service for app settings
    config: Arc<RwLock<Option<ConfigService>>>,
    /// Rule session for the current project. A mutex, not a read-write lock:
    /// every event mutates the session, and extraction cycles must not overlap.
    session: Arc<Mutex<Option<RuleSession>>>,
    /// Model used by extraction cycles, if one is configured
    provider: Arc<RwLock<Option<Arc<dyn ModelSessionProvider>>>>,
    /// Whether the state has been initialized
    initialized: Arc<RwLock<bool>>,
}

impl AppState {
    /// Create a new uninitialized app state
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(None)),
            session: Arc::new(Mutex::new(None)),
            provider: Arc::new(RwLock::new(None)),
            initialized: Arc::new(RwLock::new(false)),
        }
    }

    /// Initialize all services for `project_root`
    pub async fn initialize(&self, project_root: &Path, config: ConfigService) -> AppResult<()> {
        let mut initialized = self.initialized.write().await;
        if *initialized {
            return Ok(());
        }

        let app_config = config.get_config_clone();

        {
            let session = RuleSession::new(project_root, &app_config)?;
            tracing::debug!(context_dir = %session.store().dir().display(), "rule store ready");
            *self.session.lock().await = Some(session);
        }

        {
            let mut provider_lock = self.provider.write().await;
            *provider_lock = match &app_config.provider {
                Some(provider_config) if app_config.reasoning_active() => {
                    let provider = OpenAICompatibleProvider::new(provider_config.clone())?;
                    tracing::info!(model = %provider_config.model, "rule extraction enabled");
                    Some(Arc::new(provider) as Arc<dyn ModelSessionProvider>)
                }
                _ => None,
            };
        }

        *self.config.write().await = Some(config);
        *initialized = true;
        Ok(())
    }

    /// Replace the model provider (used by hosts that bring their own)
    pub async fn set_provider(&self, provider: Option<Arc<dyn ModelSessionProvider>>) {
        *self.provider.write().await = provider;
    }

    /// Current model provider, if any
    pub async fn provider(&self) -> Option<Arc<dyn ModelSessionProvider>> {
        self.provider.read().await.clone()
    }

    /// Check if config is healthy
    pub fn is_config_healthy(&self) -> bool {
        if let Ok(guard) = self.config.try_read() {
            if let Some(ref config) = *guard {
                return config.is_healthy();
            }
        }
        false
    }

    /// Get the current configuration
    pub async fn get_config(&self) -> AppResult<AppConfig> {
        let guard = self.config.read().await;
        match &*guard {
            Some(config) => Ok(config.get_config_clone()),
            None => Err(AppError::config("Config service not initialized")),
        }
    }

    /// Update the configuration.
    ///
    /// Takes effect for the next session; the running one keeps its settings.
    pub async fn update_config(&self, update: SettingsUpdate) -> AppResult<AppConfig> {
        let mut guard = self.config.write().await;
        match &mut *guard {
            Some(config) => config.update_config(update),
            None => Err(AppError::config("Config service not initialized")),
        }
    }

    /// Run a closure against the rule session
    pub async fn with_session<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut RuleSession) -> AppResult<T>,
    {
        let mut guard = self.session.lock().await;
        match &mut *guard {
            Some(session) => f(session),
            None => Err(AppError::internal("Rule session not initialized")),
        }
    }

    /// Lock the rule session for an operation that awaits while holding it
    pub async fn session_guard(&self) -> tokio::sync::MutexGuard<'_, Option<RuleSession>> {
        self.session.lock().await
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("initialized", &self.initialized)
            .finish()
    }
}
