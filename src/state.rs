// src/state.rs
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::{Config, DEFAULT_REPORT_DIR};
use crate::error::{LlmError, TemplateError};
use crate::services::coach::CoachService;
use crate::services::llm_client::{DeepSeekClient, RetryPolicy};
use crate::services::metrics_manager::MetricsManager;
use crate::services::session_manager::SessionManager;
use crate::services::templates::TemplateStore;
use crate::services::usage::{UsageLimits, UsageTracker};

pub type SharedState = Arc<AppState>;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Templates(#[from] TemplateError),
    #[error(transparent)]
    Llm(#[from] LlmError),
}

pub struct AppState {
    pub sessions: SessionManager,
    pub metrics: MetricsManager,
    pub coach: CoachService,
    pub usage_limits: UsageLimits,
    pub admin_key: Option<String>,
    pub report_dir: PathBuf,
}

impl AppState {
    /// Offline state over the embedded templates.
    pub fn new(session_ttl: Duration) -> Result<Self, TemplateError> {
        let store = Arc::new(TemplateStore::embedded()?);
        let coach = CoachService::new(store);
        Ok(Self::with_coach(coach, session_ttl, UsageLimits::default()))
    }

    pub fn with_coach(
        coach: CoachService,
        session_ttl: Duration,
        usage_limits: UsageLimits,
    ) -> Self {
        Self {
            sessions: SessionManager::new(session_ttl, usage_limits),
            metrics: MetricsManager::new(),
            coach,
            usage_limits,
            admin_key: None,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let store = Arc::new(TemplateStore::load(config.template_dir.as_deref())?);
        let mut coach = CoachService::new(store);

        match config.api_key.as_deref() {
            Some(key) if config.remote_enabled() => {
                let client = DeepSeekClient::new(key, &config.api_base_url, &config.model)?;
                coach = coach.with_llm(Arc::new(client), RetryPolicy::default());
                info!(model = %config.model, "remote coach enabled");
            }
            None if config.ai_enabled => {
                info!("AI enabled but no API key set, coaching offline")
            }
            _ => info!("coaching offline from templates"),
        }

        let mut state = Self::with_coach(coach, config.session_ttl, config.usage_limits);
        state.admin_key = config.admin_key.clone();
        state.report_dir = config.report_dir.clone();
        Ok(state)
    }

    /// Tracker for one stateless request.
    pub fn request_usage(&self) -> UsageTracker {
        UsageTracker::new(self.usage_limits)
    }
}
