//! Challenge engine collaborator contract
//!
//! The engine owns the EMV 3DS2 cryptography and challenge UI. It is
//! modeled as: create a transaction from directory-server parameters,
//! execute the challenge, deliver one terminal outcome.

use crate::classifier::DirectoryServerFingerprint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Parameters for creating one challenge transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub directory_server_id: String,
    pub message_version: String,
    pub live_mode: bool,
    pub network_name: String,
    pub root_certs: Vec<Vec<u8>>,
    pub server_public_key: Vec<u8>,
    pub key_id: Option<String>,
}

impl TransactionRequest {
    #[must_use]
    pub fn from_fingerprint(fingerprint: &DirectoryServerFingerprint, live_mode: bool) -> Self {
        Self {
            directory_server_id: fingerprint.directory_server_id.clone(),
            message_version: fingerprint.message_version.clone(),
            live_mode,
            network_name: fingerprint.network_name.clone(),
            root_certs: fingerprint.root_certs.clone(),
            server_public_key: fingerprint.server_public_key.clone(),
            key_id: fingerprint.key_id.clone(),
        }
    }
}

/// Device and SDK parameters the engine derives for the authentication request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequestParams {
    pub sdk_app_id: String,
    pub sdk_reference_number: String,
    pub sdk_transaction_id: String,
    pub device_data: String,
    pub sdk_ephemeral_public_key: String,
    pub message_version: String,
}

/// ACS parameters handed to the transaction for challenge execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeParameters {
    pub acs_signed_content: Option<String>,
    pub acs_trans_id: String,
    pub server_trans_id: String,
}

/// Which challenge UI the transaction will present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeUiType {
    Text,
    SingleSelect,
    MultiSelect,
    OutOfBand,
    Html,
}

/// The single terminal event of a challenge transaction
///
/// Produced exactly once per transaction, possibly on a different execution
/// context than the one that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Completed { success: bool },
    Cancelled,
    TimedOut,
    ProtocolError(String),
    RuntimeError(String),
}

/// Transaction creation failure: malformed directory-server trust material
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("challenge transaction rejected directory server material: {0}")]
pub struct TransactionCreateError(pub String);

/// External 3DS2 challenge engine
#[async_trait]
pub trait ChallengeEngine: Send + Sync {
    /// Create a transaction for one authentication attempt.
    ///
    /// # Errors
    ///
    /// Returns a [`TransactionCreateError`] when the engine rejects the
    /// directory-server certificate material. The failure is fatal to the
    /// attempt only; it is never retried.
    async fn create_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<Box<dyn ChallengeTransaction>, TransactionCreateError>;
}

/// One challenge transaction, owned by a single attempt
#[async_trait]
pub trait ChallengeTransaction: Send + Sync {
    /// Device parameters for the "start 3DS2 auth" API call
    fn auth_request_params(&self) -> AuthRequestParams;

    /// Which UI the challenge will present
    fn ui_type(&self) -> ChallengeUiType;

    /// Execute the challenge. Consumes the transaction: one attempt gets
    /// one execution and one terminal outcome, never a reuse.
    async fn execute(
        self: Box<Self>,
        params: ChallengeParameters,
        timeout: Duration,
    ) -> ChallengeOutcome;
}
