//! Challenge flow orchestration
//!
//! Creates the challenge transaction, starts the 3DS2 authentication with
//! the API collaborator, and drives the challenge to its terminal outcome.
//! Every path out of this module emits exactly one finalize launch (or, for
//! an abandoned flow, none at all).

use crate::analytics::{AnalyticsEvent, AnalyticsSink, EventContext};
use crate::api::{ApiClient, RequestOptions, ThreeDs2AuthParams};
use crate::challenge::engine::{
    ChallengeEngine, ChallengeOutcome, ChallengeParameters, ChallengeTransaction,
    TransactionRequest,
};
use crate::classifier::DirectoryServerFingerprint;
use crate::correlation::{CorrelationRecord, ErrorPayload, ErrorPayloadKind};
use crate::launcher::{launch_with_record, LaunchKind, UiLauncher};
use crate::models::auth::AuthOutcome;
use crate::models::intent::Intent;
use log::{debug, error, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Handle to an in-flight authentication flow
///
/// Only the 3DS2 path is abandonable: calling [`FlowHandle::abandon`]
/// before the pre-challenge delay elapses prevents the challenge from
/// executing. Once the challenge is under way, abandonment has no effect;
/// the terminal outcome is still relayed and the host may drop it.
#[derive(Debug)]
pub struct FlowHandle {
    abandon: Option<Arc<Notify>>,
}

impl FlowHandle {
    pub(crate) fn inert() -> Self {
        Self { abandon: None }
    }

    pub(crate) fn abandonable(notify: Arc<Notify>) -> Self {
        Self {
            abandon: Some(notify),
        }
    }

    /// Abandon the flow if it is still waiting on the challenge hand-off
    pub fn abandon(&self) {
        if let Some(notify) = &self.abandon {
            notify.notify_one();
        }
    }

    #[must_use]
    pub fn is_abandonable(&self) -> bool {
        self.abandon.is_some()
    }
}

/// Orchestrates one 3DS2 challenge attempt
#[derive(Clone)]
pub struct ChallengeFlow {
    api: Arc<dyn ApiClient>,
    engine: Arc<dyn ChallengeEngine>,
    launcher: Arc<dyn UiLauncher>,
    analytics: Arc<dyn AnalyticsSink>,
    timeout_minutes: u8,
    ui_delay: Duration,
}

impl ChallengeFlow {
    pub(crate) fn new(
        api: Arc<dyn ApiClient>,
        engine: Arc<dyn ChallengeEngine>,
        launcher: Arc<dyn UiLauncher>,
        analytics: Arc<dyn AnalyticsSink>,
        timeout_minutes: u8,
        ui_delay: Duration,
    ) -> Self {
        Self {
            api,
            engine,
            launcher,
            analytics,
            timeout_minutes,
            ui_delay,
        }
    }

    /// Begin a challenge attempt for the given intent.
    ///
    /// Failures before a transaction-level outcome exists (transaction
    /// creation, the auth API call, a response with neither ares nor
    /// fallback) relay an error immediately and never execute a challenge.
    pub(crate) async fn begin(
        &self,
        request_code: u32,
        intent: &Intent,
        fingerprint: DirectoryServerFingerprint,
        options: &RequestOptions,
    ) -> FlowHandle {
        let context = EventContext::new(intent.id(), intent.live_mode());
        let client_secret = intent.client_secret().to_string();

        let request = TransactionRequest::from_fingerprint(&fingerprint, intent.live_mode());
        let transaction = match self.engine.create_transaction(request).await {
            Ok(transaction) => transaction,
            Err(err) => {
                error!(
                    "challenge transaction creation failed for {}: {err}",
                    intent.id()
                );
                self.relay_failure(
                    request_code,
                    &client_secret,
                    ErrorPayload {
                        kind: ErrorPayloadKind::Certificate,
                        code: None,
                        message: err.to_string(),
                    },
                );
                return FlowHandle::inert();
            }
        };

        // Transient indicator while the authentication request is in flight
        self.launcher.show_preparing();

        let auth_params = ThreeDs2AuthParams {
            source_id: fingerprint.source.clone(),
            sdk: transaction.auth_request_params(),
            max_timeout_minutes: self.timeout_minutes,
        };

        let response = match self
            .api
            .start_3ds2_auth(&auth_params, intent.id(), options)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!("3DS2 authentication start failed for {}: {err}", intent.id());
                self.relay_failure(
                    request_code,
                    &client_secret,
                    ErrorPayload::from_error(&err.into()),
                );
                return FlowHandle::inert();
            }
        };

        match (response.ares, response.fallback_redirect_url) {
            (Some(ares), _) if ares.is_challenge() => {
                debug!("challenge mandated for {}", intent.id());
                let challenge_params = ChallengeParameters {
                    acs_signed_content: ares.acs_signed_content,
                    acs_trans_id: ares.acs_trans_id,
                    server_trans_id: ares.server_trans_id,
                };

                let notify = Arc::new(Notify::new());
                let flow = self.clone();
                let abandon = Arc::clone(&notify);
                let source = fingerprint.source;
                let options = options.clone();
                tokio::spawn(async move {
                    flow.run_challenge(
                        transaction,
                        challenge_params,
                        request_code,
                        client_secret,
                        source,
                        options,
                        context,
                        abandon,
                    )
                    .await;
                });
                FlowHandle::abandonable(notify)
            }
            (Some(_), _) => {
                // Frictionless: the directory server authenticated without
                // an interactive challenge.
                debug!("frictionless authentication for {}", intent.id());
                self.analytics
                    .emit(AnalyticsEvent::FrictionlessFlow, &context);
                launch_with_record(
                    self.launcher.as_ref(),
                    LaunchKind::Relay,
                    &CorrelationRecord {
                        request_code,
                        client_secret,
                        source_id: Some(fingerprint.source),
                        cancel_dependent: false,
                        outcome: Some(AuthOutcome::Succeeded),
                        error: None,
                    },
                );
                FlowHandle::inert()
            }
            (None, Some(url)) => {
                debug!("falling back to hosted redirect for {}", intent.id());
                self.analytics
                    .emit(AnalyticsEvent::FallbackRedirect, &context);
                launch_with_record(
                    self.launcher.as_ref(),
                    LaunchKind::Redirect {
                        url,
                        return_url: None,
                    },
                    &CorrelationRecord {
                        request_code,
                        client_secret,
                        source_id: Some(fingerprint.source),
                        cancel_dependent: false,
                        outcome: None,
                        error: None,
                    },
                );
                FlowHandle::inert()
            }
            (None, None) => {
                self.relay_failure(
                    request_code,
                    &client_secret,
                    ErrorPayload::protocol(
                        "authentication response carried neither an ares nor a fallback redirect",
                    ),
                );
                FlowHandle::inert()
            }
        }
    }

    /// Delayed challenge execution, off the calling context.
    ///
    /// The delay keeps the challenge UI from visibly racing the preparing
    /// indicator's dismissal; it is not on any correctness path. An
    /// abandon signal that arrives first wins and the challenge never runs.
    #[allow(clippy::too_many_arguments)]
    async fn run_challenge(
        self,
        transaction: Box<dyn ChallengeTransaction>,
        params: ChallengeParameters,
        request_code: u32,
        client_secret: String,
        source: String,
        options: RequestOptions,
        context: EventContext,
        abandon: Arc<Notify>,
    ) {
        tokio::select! {
            () = tokio::time::sleep(self.ui_delay) => {}
            () = abandon.notified() => {
                debug!("flow abandoned before challenge hand-off for {source}");
                return;
            }
        }

        self.analytics
            .emit(AnalyticsEvent::ChallengePresented, &context);

        let timeout = Duration::from_secs(u64::from(self.timeout_minutes) * 60);
        let outcome = transaction.execute(params, timeout).await;

        // The single point mapping each terminal variant to its finalize
        // relay. The outcome is consumed here; one transaction, one relay.
        let (classification, cancel_dependent, event) = match outcome {
            ChallengeOutcome::Completed { success: true } => (
                Ok(AuthOutcome::Succeeded),
                false,
                AnalyticsEvent::ChallengeCompleted,
            ),
            ChallengeOutcome::Completed { success: false } => (
                Ok(AuthOutcome::Failed),
                false,
                AnalyticsEvent::ChallengeCompleted,
            ),
            ChallengeOutcome::Cancelled => (
                Ok(AuthOutcome::Canceled),
                true,
                AnalyticsEvent::ChallengeCanceled,
            ),
            ChallengeOutcome::TimedOut => (
                Ok(AuthOutcome::TimedOut),
                false,
                AnalyticsEvent::ChallengeTimedOut,
            ),
            ChallengeOutcome::ProtocolError(detail) => (
                Err(ErrorPayload::protocol(detail)),
                false,
                AnalyticsEvent::ChallengeProtocolError,
            ),
            ChallengeOutcome::RuntimeError(detail) => (
                Err(ErrorPayload::runtime(detail)),
                false,
                AnalyticsEvent::ChallengeRuntimeError,
            ),
        };

        // Tell the API side the challenge ended. Best-effort: a failure
        // here must never block the finalize relay.
        if let Err(err) = self.api.complete_3ds2_auth(&source, &options).await {
            warn!("challenge completion notification failed for {source}: {err}");
        }

        self.analytics.emit(event, &context);

        let (outcome, error) = match classification {
            Ok(outcome) => (Some(outcome), None),
            Err(payload) => (None, Some(payload)),
        };
        launch_with_record(
            self.launcher.as_ref(),
            LaunchKind::Relay,
            &CorrelationRecord {
                request_code,
                client_secret,
                source_id: Some(source),
                cancel_dependent,
                outcome,
                error,
            },
        );
    }

    fn relay_failure(&self, request_code: u32, client_secret: &str, error: ErrorPayload) {
        launch_with_record(
            self.launcher.as_ref(),
            LaunchKind::Relay,
            &CorrelationRecord::failed(request_code, client_secret, error),
        );
    }
}
