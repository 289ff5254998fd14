//! Result channel codec
//!
//! Authentication results return on a different logical thread of control
//! than the call that launched them. The only thing that survives the
//! hand-off is an opaque payload; this module encodes and decodes the
//! correlation record it carries. Records are base64 over a compact JSON
//! body and must round-trip losslessly.

use crate::models::auth::{AuthError, AuthOutcome};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Correlation record carried across the UI hand-off boundary
///
/// `request_code` is purely a demultiplexing key distinguishing payment,
/// setup and source attempts; it is not a sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationRecord {
    pub request_code: u32,
    pub client_secret: String,
    pub source_id: Option<String>,
    /// Ask the finalization pipeline to unwind the dependent source once
    pub cancel_dependent: bool,
    pub outcome: Option<AuthOutcome>,
    pub error: Option<ErrorPayload>,
}

impl CorrelationRecord {
    /// A record carrying nothing but the attempt identity; finalization
    /// surfaces whatever state the re-fetch reports.
    #[must_use]
    pub fn bypass(request_code: u32, client_secret: impl Into<String>) -> Self {
        Self {
            request_code,
            client_secret: client_secret.into(),
            source_id: None,
            cancel_dependent: false,
            outcome: None,
            error: None,
        }
    }

    /// A record carrying a terminal error for the attempt
    #[must_use]
    pub fn failed(
        request_code: u32,
        client_secret: impl Into<String>,
        error: ErrorPayload,
    ) -> Self {
        Self {
            request_code,
            client_secret: client_secret.into(),
            source_id: None,
            cancel_dependent: false,
            outcome: None,
            error: Some(error),
        }
    }
}

/// Serializable projection of an [`AuthError`] for the hand-off boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorPayloadKind,
    pub code: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPayloadKind {
    Transport,
    Api,
    Certificate,
    Protocol,
    Runtime,
}

impl ErrorPayload {
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorPayloadKind::Protocol,
            code: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorPayloadKind::Runtime,
            code: None,
            message: message.into(),
        }
    }

    /// Project an error for the boundary. Kinds that never cross it
    /// (type mismatch, correlation) degrade to runtime errors.
    #[must_use]
    pub fn from_error(error: &AuthError) -> Self {
        match error {
            AuthError::Transport(msg) => Self {
                kind: ErrorPayloadKind::Transport,
                code: None,
                message: msg.clone(),
            },
            AuthError::Api { code, message } => Self {
                kind: ErrorPayloadKind::Api,
                code: code.clone(),
                message: message.clone(),
            },
            AuthError::Certificate(msg) => Self {
                kind: ErrorPayloadKind::Certificate,
                code: None,
                message: msg.clone(),
            },
            AuthError::Protocol(msg) => Self::protocol(msg.clone()),
            other => Self::runtime(other.to_string()),
        }
    }

    /// Reconstruct the [`AuthError`] on the receiving side
    #[must_use]
    pub fn into_error(self) -> AuthError {
        match self.kind {
            ErrorPayloadKind::Transport => AuthError::Transport(self.message),
            ErrorPayloadKind::Api => AuthError::Api {
                code: self.code,
                message: self.message,
            },
            ErrorPayloadKind::Certificate => AuthError::Certificate(self.message),
            ErrorPayloadKind::Protocol => AuthError::Protocol(self.message),
            ErrorPayloadKind::Runtime => AuthError::Runtime(self.message),
        }
    }
}

/// Failures decoding a result-channel payload
#[derive(Debug, Error)]
pub enum CorrelationError {
    #[error("payload is not valid base64: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    #[error("payload does not contain a correlation record: {0}")]
    MalformedRecord(#[from] serde_json::Error),
}

/// Encode a record into the opaque payload handed to the UI collaborator
///
/// # Errors
///
/// Returns an error if the record cannot be serialized; with the record
/// being plain data this does not happen outside of allocation failure.
pub fn encode(record: &CorrelationRecord) -> Result<String, CorrelationError> {
    let body = serde_json::to_vec(record)?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(body))
}

/// Decode a payload delivered back by the host
///
/// # Errors
///
/// Returns an error if the payload is not base64 or does not deserialize
/// into a correlation record.
pub fn decode(payload: &str) -> Result<CorrelationRecord, CorrelationError> {
    let body = general_purpose::URL_SAFE_NO_PAD.decode(payload)?;
    Ok(serde_json::from_slice(&body)?)
}
