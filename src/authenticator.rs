//! Top-level authentication orchestrator
//!
//! The public entry surface. Owns request-code correlation, sequences
//! classification, the mechanism-specific sub-flow, and finalization, and is
//! the only component wired to every asynchronous collaborator. One
//! authenticator serves any number of concurrent attempts; each attempt owns
//! its own transaction, fingerprint, and correlation record.

use crate::analytics::AnalyticsSink;
use crate::api::{ApiClient, ConfirmParams, RequestOptions};
use crate::challenge::{ChallengeEngine, ChallengeFlow, FlowHandle};
use crate::classifier::{classify, Action};
use crate::correlation::{self, CorrelationRecord, ErrorPayload};
use crate::finalize::Finalizer;
use crate::launcher::{launch_with_record, LaunchKind, UiLauncher};
use crate::models::auth::{AuthError, AuthOutcome, AuthResult};
use crate::models::intent::{Intent, IntentKind, PaymentIntent, SetupIntent};
use crate::models::source::Source;
use crate::settings::PayauthSettings;
use log::{debug, error, warn};
use std::sync::Arc;

/// Orchestrates payment, setup, and source authentication flows
pub struct PaymentAuthenticator {
    api: Arc<dyn ApiClient>,
    launcher: Arc<dyn UiLauncher>,
    challenge: ChallengeFlow,
    finalizer: Finalizer,
    settings: PayauthSettings,
}

impl PaymentAuthenticator {
    #[must_use]
    pub fn new(
        api: Arc<dyn ApiClient>,
        engine: Arc<dyn ChallengeEngine>,
        launcher: Arc<dyn UiLauncher>,
        analytics: Arc<dyn AnalyticsSink>,
        settings: PayauthSettings,
    ) -> Self {
        let challenge = ChallengeFlow::new(
            Arc::clone(&api),
            engine,
            Arc::clone(&launcher),
            analytics,
            settings.challenge.timeout_minutes,
            settings.challenge.ui_delay(),
        );
        let finalizer = Finalizer::new(Arc::clone(&api));

        Self {
            api,
            launcher,
            challenge,
            finalizer,
            settings,
        }
    }

    /// Confirm an intent, then drive whatever verification it requires.
    ///
    /// The native-SDK flow flag is forced on before submission. A failed
    /// confirmation short-circuits to an error relay without consulting the
    /// classifier; the error surfaces from the matching result handler.
    pub async fn confirm_and_authenticate(
        &self,
        params: ConfirmParams,
        options: &RequestOptions,
    ) -> FlowHandle {
        let params = params.with_native_sdk_flow();
        let request_code = self.request_code(params.kind);

        match self.api.confirm(&params, options).await {
            Ok(intent) => self.dispatch(request_code, intent, options).await,
            Err(err) => {
                error!("confirmation failed for {} intent: {err}", params.kind);
                launch_with_record(
                    self.launcher.as_ref(),
                    LaunchKind::Relay,
                    &CorrelationRecord::failed(
                        request_code,
                        params.client_secret,
                        ErrorPayload::from_error(&err.into()),
                    ),
                );
                FlowHandle::inert()
            }
        }
    }

    /// Authenticate an already-confirmed intent: fetch, classify, dispatch.
    pub async fn authenticate_existing_intent(
        &self,
        kind: IntentKind,
        client_secret: &str,
        options: &RequestOptions,
    ) -> FlowHandle {
        let request_code = self.request_code(kind);

        match self.api.retrieve_intent(client_secret, options).await {
            Ok(intent) => self.dispatch(request_code, intent, options).await,
            Err(err) => {
                error!("intent retrieval failed: {err}");
                launch_with_record(
                    self.launcher.as_ref(),
                    LaunchKind::Relay,
                    &CorrelationRecord::failed(
                        request_code,
                        client_secret,
                        ErrorPayload::from_error(&err.into()),
                    ),
                );
                FlowHandle::inert()
            }
        }
    }

    /// Authenticate a source: redirect-flow sources launch the redirect,
    /// every other flow kind bypasses straight back to the result handler.
    pub async fn authenticate_source(
        &self,
        source_id: &str,
        client_secret: &str,
        options: &RequestOptions,
    ) {
        let request_code = self.settings.request_codes.source;

        match self
            .api
            .retrieve_source(source_id, client_secret, options)
            .await
        {
            Ok(source) => {
                let record = CorrelationRecord {
                    request_code,
                    client_secret: source.client_secret.clone(),
                    source_id: Some(source.id.clone()),
                    cancel_dependent: false,
                    outcome: None,
                    error: None,
                };

                if let (true, Some(redirect)) = (source.requires_redirect(), &source.redirect) {
                    debug!("launching redirect for source {}", source.id);
                    launch_with_record(
                        self.launcher.as_ref(),
                        LaunchKind::Redirect {
                            url: redirect.url.clone(),
                            return_url: redirect.return_url.clone(),
                        },
                        &record,
                    );
                } else {
                    debug!("source {} needs no redirect; bypassing", source.id);
                    launch_with_record(self.launcher.as_ref(), LaunchKind::Relay, &record);
                }
            }
            Err(err) => {
                error!("source retrieval failed for {source_id}: {err}");
                let mut record = CorrelationRecord::failed(
                    request_code,
                    client_secret,
                    ErrorPayload::from_error(&err.into()),
                );
                record.source_id = Some(source_id.to_string());
                launch_with_record(self.launcher.as_ref(), LaunchKind::Relay, &record);
            }
        }
    }

    /// Handle a correlated payment result payload.
    ///
    /// Returns `Ok(None)` when the payload's request code belongs to a
    /// different attempt kind ("not applicable").
    ///
    /// # Errors
    ///
    /// Returns the record's own error, a decode failure, or any error the
    /// finalization pipeline surfaces.
    pub async fn handle_payment_result(
        &self,
        payload: &str,
        options: &RequestOptions,
    ) -> Result<Option<AuthResult<PaymentIntent>>, AuthError> {
        match self
            .handle_intent_result(IntentKind::Payment, payload, options)
            .await?
        {
            Some((Intent::Payment(intent), outcome)) => Ok(Some(AuthResult { intent, outcome })),
            Some((other, _)) => Err(AuthError::TypeMismatch {
                expected: IntentKind::Payment,
                actual: other.kind(),
            }),
            None => Ok(None),
        }
    }

    /// Handle a correlated setup result payload.
    ///
    /// Returns `Ok(None)` when the payload's request code belongs to a
    /// different attempt kind ("not applicable").
    ///
    /// # Errors
    ///
    /// Returns the record's own error, a decode failure, or any error the
    /// finalization pipeline surfaces.
    pub async fn handle_setup_result(
        &self,
        payload: &str,
        options: &RequestOptions,
    ) -> Result<Option<AuthResult<SetupIntent>>, AuthError> {
        match self
            .handle_intent_result(IntentKind::Setup, payload, options)
            .await?
        {
            Some((Intent::Setup(intent), outcome)) => Ok(Some(AuthResult { intent, outcome })),
            Some((other, _)) => Err(AuthError::TypeMismatch {
                expected: IntentKind::Setup,
                actual: other.kind(),
            }),
            None => Ok(None),
        }
    }

    /// Handle a correlated source result payload by re-fetching the source.
    ///
    /// Returns `Ok(None)` when the payload's request code belongs to a
    /// different attempt kind ("not applicable").
    ///
    /// # Errors
    ///
    /// Returns the record's own error, a decode failure, or the re-fetch
    /// failure.
    pub async fn handle_source_result(
        &self,
        payload: &str,
        options: &RequestOptions,
    ) -> Result<Option<Source>, AuthError> {
        let record = correlation::decode(payload)?;
        if record.request_code != self.settings.request_codes.source {
            return Ok(None);
        }

        if let Some(error) = record.error {
            return Err(error.into_error());
        }

        let Some(source_id) = record.source_id else {
            return Err(AuthError::Runtime(
                "source result record carries no source id".to_string(),
            ));
        };

        let source = self
            .api
            .retrieve_source(&source_id, &record.client_secret, options)
            .await?;
        Ok(Some(source))
    }

    /// Classify the intent and dispatch to the matching sub-flow
    async fn dispatch(
        &self,
        request_code: u32,
        intent: Intent,
        options: &RequestOptions,
    ) -> FlowHandle {
        match classify(&intent) {
            Action::Bypass => {
                debug!("no verification mechanism applies to {}; bypassing", intent.id());
                launch_with_record(
                    self.launcher.as_ref(),
                    LaunchKind::Relay,
                    &CorrelationRecord::bypass(request_code, intent.client_secret()),
                );
                FlowHandle::inert()
            }
            Action::Fail(err) => {
                warn!("classification failed for {}: {err}", intent.id());
                launch_with_record(
                    self.launcher.as_ref(),
                    LaunchKind::Relay,
                    &CorrelationRecord::failed(
                        request_code,
                        intent.client_secret(),
                        ErrorPayload::from_error(&err),
                    ),
                );
                FlowHandle::inert()
            }
            Action::BeginRedirect { url, return_url } => {
                debug!("launching redirect for {}", intent.id());
                launch_with_record(
                    self.launcher.as_ref(),
                    LaunchKind::Redirect { url, return_url },
                    &CorrelationRecord::bypass(request_code, intent.client_secret()),
                );
                FlowHandle::inert()
            }
            Action::Begin3ds2(fingerprint) => {
                self.challenge
                    .begin(request_code, &intent, *fingerprint, options)
                    .await
            }
        }
    }

    async fn handle_intent_result(
        &self,
        expected: IntentKind,
        payload: &str,
        options: &RequestOptions,
    ) -> Result<Option<(Intent, AuthOutcome)>, AuthError> {
        let record = correlation::decode(payload)?;
        if record.request_code != self.request_code(expected) {
            return Ok(None);
        }

        let result = self.finalizer.finalize_intent(expected, record, options).await?;
        Ok(Some(result))
    }

    fn request_code(&self, kind: IntentKind) -> u32 {
        match kind {
            IntentKind::Payment => self.settings.request_codes.payment,
            IntentKind::Setup => self.settings.request_codes.setup,
        }
    }
}
