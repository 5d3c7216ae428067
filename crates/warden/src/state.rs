//! Application state and shared resources.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::events::EventLog;
use crate::token::TokenController;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Token lifecycle controller
    pub controller: Arc<TokenController>,

    /// Recent lifecycle events (debug endpoint)
    pub events: Arc<EventLog>,

    /// Boot timestamp (Unix epoch seconds)
    pub started_at: i64,
}

impl AppState {
    pub fn new(config: AppConfig, controller: Arc<TokenController>, events: Arc<EventLog>) -> Self {
        Self {
            config,
            controller,
            events,
            started_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Seconds since boot
    pub fn uptime_secs(&self) -> i64 {
        chrono::Utc::now().timestamp().saturating_sub(self.started_at)
    }
}
