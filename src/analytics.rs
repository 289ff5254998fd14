//! Analytics sink collaborator contract
//!
//! Emission is fire-and-forget and never awaited by, or allowed to block,
//! any protocol-critical path.

use chrono::{DateTime, Utc};

/// Observability events emitted along the authentication flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsEvent {
    ChallengePresented,
    FrictionlessFlow,
    FallbackRedirect,
    ChallengeCompleted,
    ChallengeCanceled,
    ChallengeTimedOut,
    ChallengeProtocolError,
    ChallengeRuntimeError,
}

/// Context attached to every emitted event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventContext {
    pub intent_id: String,
    pub live_mode: bool,
    pub emitted_at: DateTime<Utc>,
}

impl EventContext {
    #[must_use]
    pub fn new(intent_id: impl Into<String>, live_mode: bool) -> Self {
        Self {
            intent_id: intent_id.into(),
            live_mode,
            emitted_at: Utc::now(),
        }
    }
}

/// Fire-and-forget analytics collaborator; must never fail visibly
pub trait AnalyticsSink: Send + Sync {
    fn emit(&self, event: AnalyticsEvent, context: &EventContext);
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn emit(&self, _event: AnalyticsEvent, _context: &EventContext) {}
}
