//! API client collaborator contract
//!
//! The network transport and request/response serialization live behind the
//! [`ApiClient`] trait; this library never performs I/O of its own. Every
//! operation is asynchronous and fails with an [`ApiError`] that separates
//! transport failures from API-reported domain errors.

use crate::challenge::AuthRequestParams;
use crate::models::intent::{Intent, IntentKind};
use crate::models::source::Source;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Per-request authentication options for the API collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    pub api_key: String,
    pub account: Option<String>,
}

impl RequestOptions {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            account: None,
        }
    }

    #[must_use]
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
}

/// Parameters for confirming an intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmParams {
    pub kind: IntentKind,
    pub client_secret: String,
    pub payment_method_id: Option<String>,
    pub return_url: Option<Url>,
    /// Ask the API to resolve next actions with this SDK's native flow
    /// instead of a hosted page. Forced on before every confirmation.
    pub use_sdk: bool,
}

impl ConfirmParams {
    #[must_use]
    pub fn new(kind: IntentKind, client_secret: impl Into<String>) -> Self {
        Self {
            kind,
            client_secret: client_secret.into(),
            payment_method_id: None,
            return_url: None,
            use_sdk: false,
        }
    }

    #[must_use]
    pub fn with_native_sdk_flow(mut self) -> Self {
        self.use_sdk = true;
        self
    }
}

/// Request body for starting a 3DS2 authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDs2AuthParams {
    /// The attempt-source token from the directory-server fingerprint
    pub source_id: String,
    /// Device and SDK parameters derived from the challenge transaction
    pub sdk: AuthRequestParams,
    /// Bounded challenge timeout, in minutes
    pub max_timeout_minutes: u8,
}

/// Authentication-response (ARes) returned by the directory server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ares {
    pub acs_trans_id: String,
    pub server_trans_id: String,
    pub acs_signed_content: Option<String>,
    /// 3DS2 transaction status; `"C"` mandates a cardholder challenge
    pub trans_status: Option<String>,
}

impl Ares {
    /// Whether the directory server mandates an interactive challenge
    #[must_use]
    pub fn is_challenge(&self) -> bool {
        self.trans_status.as_deref() == Some("C")
    }
}

/// Response to a "start 3DS2 auth" call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDs2AuthResponse {
    pub ares: Option<Ares>,
    /// Hosted fallback when the device cannot run the native challenge
    pub fallback_redirect_url: Option<Url>,
}

/// Errors reported by the API collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("api error: {message}")]
    Api {
        code: Option<String>,
        message: String,
    },
}

/// Asynchronous API collaborator consumed by the orchestrator
///
/// Implementations own transport-level retry policy; this library never
/// retries a failed call beyond the bounded cancel-and-recheck sequence of
/// the finalization pipeline.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Confirm an intent, returning its refreshed state
    async fn confirm(
        &self,
        params: &ConfirmParams,
        options: &RequestOptions,
    ) -> Result<Intent, ApiError>;

    /// Fetch the current state of an intent by client secret
    async fn retrieve_intent(
        &self,
        client_secret: &str,
        options: &RequestOptions,
    ) -> Result<Intent, ApiError>;

    /// Fetch the current state of a source
    async fn retrieve_source(
        &self,
        source_id: &str,
        client_secret: &str,
        options: &RequestOptions,
    ) -> Result<Source, ApiError>;

    /// Cancel the dependent authentication source of an intent
    async fn cancel_intent_source(
        &self,
        intent: &Intent,
        source_id: &str,
        options: &RequestOptions,
    ) -> Result<Intent, ApiError>;

    /// Submit device parameters to start a 3DS2 authentication
    async fn start_3ds2_auth(
        &self,
        params: &ThreeDs2AuthParams,
        intent_id: &str,
        options: &RequestOptions,
    ) -> Result<ThreeDs2AuthResponse, ApiError>;

    /// Tell the API side that a challenge reached a terminal event
    async fn complete_3ds2_auth(
        &self,
        source_id: &str,
        options: &RequestOptions,
    ) -> Result<bool, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_sdk_flow_is_forced_on() {
        let params = ConfirmParams::new(IntentKind::Payment, "pi_1_secret_2");
        assert!(!params.use_sdk);
        assert!(params.with_native_sdk_flow().use_sdk);
    }

    #[test]
    fn test_ares_challenge_detection() {
        let mut ares = Ares {
            acs_trans_id: "acs_1".to_string(),
            server_trans_id: "3ds_1".to_string(),
            acs_signed_content: None,
            trans_status: Some("C".to_string()),
        };
        assert!(ares.is_challenge());

        ares.trans_status = Some("Y".to_string());
        assert!(!ares.is_challenge());

        ares.trans_status = None;
        assert!(!ares.is_challenge());
    }
}
