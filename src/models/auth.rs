//! Common authentication result and error types
//!
//! This module provides the unified error type and outcome classification
//! shared by every authentication mechanism (bypass, redirect, 3DS2
//! challenge), making error handling consistent throughout the library.

use crate::api::ApiError;
use crate::correlation::{CorrelationError, ErrorPayload};
use crate::models::intent::IntentKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a finished authentication attempt
///
/// Supplied by the mechanism that drove the attempt and carried across the
/// result-channel boundary alongside the intent's client secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthOutcome {
    Succeeded,
    Failed,
    Canceled,
    TimedOut,
}

/// Successful terminal result of one authentication attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult<I> {
    /// The freshly re-fetched intent
    pub intent: I,
    /// Outcome classification supplied by the mechanism that ran
    pub outcome: AuthOutcome,
}

/// Common error type for authentication operations
///
/// Unifies every failure an attempt can surface, regardless of which
/// mechanism produced it. Every error is terminal to its attempt and is
/// delivered exactly once to the original caller.
#[derive(Debug)]
pub enum AuthError {
    /// Collaborator network failure
    Transport(String),
    /// Domain error reported by the API collaborator
    Api {
        code: Option<String>,
        message: String,
    },
    /// Malformed directory-server trust material; fatal to the 3DS2 path only
    Certificate(String),
    /// Challenge-engine protocol violation
    Protocol(String),
    /// Challenge-engine runtime failure
    Runtime(String),
    /// The API returned an intent kind inconsistent with the request
    TypeMismatch {
        expected: IntentKind,
        actual: IntentKind,
    },
    /// A result-channel payload could not be decoded
    Correlation(CorrelationError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Transport(msg) => write!(f, "Transport error: {msg}"),
            AuthError::Api { code, message } => match code {
                Some(code) => write!(f, "API error [{code}]: {message}"),
                None => write!(f, "API error: {message}"),
            },
            AuthError::Certificate(msg) => write!(f, "Certificate error: {msg}"),
            AuthError::Protocol(msg) => write!(f, "Challenge protocol error: {msg}"),
            AuthError::Runtime(msg) => write!(f, "Challenge runtime error: {msg}"),
            AuthError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected a {expected} intent, got {actual}")
            }
            AuthError::Correlation(err) => write!(f, "Correlation error: {err}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::Correlation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport(msg) => AuthError::Transport(msg),
            ApiError::Api { code, message } => AuthError::Api { code, message },
        }
    }
}

impl From<CorrelationError> for AuthError {
    fn from(err: CorrelationError) -> Self {
        AuthError::Correlation(err)
    }
}

impl From<ErrorPayload> for AuthError {
    fn from(payload: ErrorPayload) -> Self {
        payload.into_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_error_detail() {
        let err = AuthError::Api {
            code: Some("intent_unexpected_state".to_string()),
            message: "intent is already succeeded".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("intent_unexpected_state"));
        assert!(text.contains("already succeeded"));

        let mismatch = AuthError::TypeMismatch {
            expected: IntentKind::Payment,
            actual: IntentKind::Setup,
        };
        assert!(mismatch.to_string().contains("expected a payment intent"));
    }

    #[test]
    fn test_api_error_conversion() {
        let err: AuthError = ApiError::Transport("connection reset".to_string()).into();
        assert!(matches!(err, AuthError::Transport(_)));
    }
}
