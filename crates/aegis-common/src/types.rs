//! Core types shared across Aegis components.

use serde::{Deserialize, Serialize};

/// Value bound to the form field the widget validates against.
///
/// The host supplies it per execution; the validation formula runs over it.
pub type FieldValue = serde_json::Value;

/// Token lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    /// No token requested yet (or controller was reset)
    Idle,
    /// Provider request in flight
    Pending,
    /// Valid token held
    Ready,
    /// Last execution failed; retriable
    Error,
}

impl Default for TokenStatus {
    fn default() -> Self {
        Self::Idle
    }
}

/// State of a single token lifecycle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenState {
    /// Current token, if one is held
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Issuance timestamp (Unix epoch seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<i64>,

    /// Current status
    pub status: TokenStatus,

    /// Message from the last failed execution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl TokenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.status == TokenStatus::Ready
    }

    /// Seconds since issuance, or None if no token is held
    pub fn token_age_secs(&self) -> Option<i64> {
        let issued = self.issued_at?;
        let now = chrono::Utc::now().timestamp();
        Some(now.saturating_sub(issued))
    }

    /// Check if the held token is still within the provider's validity window
    pub fn has_live_token(&self, ttl_secs: u64) -> bool {
        match (self.token.as_ref(), self.token_age_secs()) {
            (Some(_), Some(age)) => self.is_ready() && age < ttl_secs as i64,
            _ => false,
        }
    }

    /// Transition to Pending for a new execution
    pub fn mark_pending(&mut self) {
        self.status = TokenStatus::Pending;
    }

    /// Commit a successful issuance
    pub fn mark_ready(&mut self, token: String, issued_at: i64) {
        self.token = Some(token);
        self.issued_at = Some(issued_at);
        self.status = TokenStatus::Ready;
        self.last_error = None;
    }

    /// Commit a failed execution
    pub fn mark_failed(&mut self, error: String) {
        self.status = TokenStatus::Error;
        self.last_error = Some(error);
    }

    /// Return to Idle, discarding any token
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Lifecycle event surfaced to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    /// A token was issued
    Generated { token: String },
    /// An execution failed
    Failed { error: String },
}

impl TokenEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Generated { .. } => EventKind::Generated,
            Self::Failed { .. } => EventKind::Failed,
        }
    }
}

/// Event names as the host observes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "tokenGenerated")]
    Generated,
    #[serde(rename = "error")]
    Failed,
}

/// Serializable record of an emitted event (debug endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Which event fired
    pub kind: EventKind,

    /// Token for Generated, error message for Failed
    pub detail: String,

    /// Emission timestamp (Unix epoch seconds)
    pub at: i64,
}

impl EventRecord {
    pub fn from_event(event: &TokenEvent) -> Self {
        let (kind, detail) = match event {
            TokenEvent::Generated { token } => (EventKind::Generated, token.clone()),
            TokenEvent::Failed { error } => (EventKind::Failed, error.clone()),
        };
        Self {
            kind,
            detail,
            at: chrono::Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let mut state = TokenState::new();
        assert_eq!(state.status, TokenStatus::Idle);

        state.mark_pending();
        assert_eq!(state.status, TokenStatus::Pending);

        state.mark_ready("tok-abc".to_string(), chrono::Utc::now().timestamp());
        assert!(state.is_ready());
        assert_eq!(state.token.as_deref(), Some("tok-abc"));
        assert!(state.last_error.is_none());

        state.mark_failed("provider unreachable".to_string());
        assert_eq!(state.status, TokenStatus::Error);
        assert_eq!(state.last_error.as_deref(), Some("provider unreachable"));

        state.clear();
        assert_eq!(state.status, TokenStatus::Idle);
        assert!(state.token.is_none());
        assert!(state.issued_at.is_none());
        assert!(state.last_error.is_none());
    }

    #[test]
    fn test_live_token_window() {
        let mut state = TokenState::new();
        assert!(!state.has_live_token(120));

        let now = chrono::Utc::now().timestamp();
        state.mark_ready("tok".to_string(), now);
        assert!(state.has_live_token(120));

        // Issued 3 minutes ago: outside the 2 minute window
        state.mark_ready("tok".to_string(), now - 180);
        assert!(!state.has_live_token(120));
    }

    #[test]
    fn test_event_kind_wire_names() {
        let generated = serde_json::to_string(&EventKind::Generated).unwrap();
        assert_eq!(generated, "\"tokenGenerated\"");
        let failed = serde_json::to_string(&EventKind::Failed).unwrap();
        assert_eq!(failed, "\"error\"");
    }

    #[test]
    fn test_event_record_from_event() {
        let record = EventRecord::from_event(&TokenEvent::Generated {
            token: "tok-1".to_string(),
        });
        assert_eq!(record.kind, EventKind::Generated);
        assert_eq!(record.detail, "tok-1");
    }
}
