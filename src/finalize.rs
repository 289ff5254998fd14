//! Finalization pipeline
//!
//! Turns a correlated result record into the caller-facing outcome: always
//! re-fetch the intent (the challenge may have changed server-side state),
//! verify the fetched kind, unwind the dependent source at most once, and
//! wrap the fresh intent with the supplied outcome classification.

use crate::api::{ApiClient, RequestOptions};
use crate::correlation::CorrelationRecord;
use crate::models::auth::{AuthError, AuthOutcome};
use crate::models::intent::{Intent, IntentKind};
use log::{debug, warn};
use std::sync::Arc;

/// Applies the re-fetch and cancel-once policy for one attempt
pub struct Finalizer {
    api: Arc<dyn ApiClient>,
}

impl Finalizer {
    #[must_use]
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self { api }
    }

    /// Produce the terminal result for a correlated record.
    ///
    /// The record's `cancel_dependent` flag is honored at most once: if the
    /// freshly fetched intent still requires action after the cancellation
    /// round trip, the second fetch's state is surfaced as-is. A record
    /// carrying an error delivers it verbatim without any fetch.
    ///
    /// # Errors
    ///
    /// Returns the record's own error, any API failure from the re-fetch or
    /// cancel calls, or a type mismatch when the API returns an intent kind
    /// inconsistent with `expected`.
    pub async fn finalize_intent(
        &self,
        expected: IntentKind,
        record: CorrelationRecord,
        options: &RequestOptions,
    ) -> Result<(Intent, AuthOutcome), AuthError> {
        if let Some(error) = record.error {
            return Err(error.into_error());
        }

        // The bypass relay carries no classification; surfacing the fresh
        // state as a success is what "no further challenge" means.
        let outcome = record.outcome.unwrap_or(AuthOutcome::Succeeded);
        let mut cancel_dependent = record.cancel_dependent;

        loop {
            let intent = self
                .api
                .retrieve_intent(&record.client_secret, options)
                .await?;

            if intent.kind() != expected {
                return Err(AuthError::TypeMismatch {
                    expected,
                    actual: intent.kind(),
                });
            }

            if cancel_dependent && intent.requires_action() {
                // One cancellation per logical flow, no matter what the
                // server reports afterwards.
                cancel_dependent = false;

                if let Some(source_id) = &record.source_id {
                    debug!("canceling dependent source {source_id} for {}", intent.id());
                    let _ = self
                        .api
                        .cancel_intent_source(&intent, source_id, options)
                        .await?;
                    continue;
                }
                warn!(
                    "cancel requested for {} without a dependent source id; skipping",
                    intent.id()
                );
            }

            return Ok((intent, outcome));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::correlation::ErrorPayload;
    use crate::testing::fixtures;
    use crate::testing::mock::MockApiClient;
    use std::sync::atomic::Ordering;

    fn record_with(
        source_id: Option<&str>,
        cancel_dependent: bool,
        outcome: Option<AuthOutcome>,
    ) -> CorrelationRecord {
        CorrelationRecord {
            request_code: 50_000,
            client_secret: "pi_123_secret_456".to_string(),
            source_id: source_id.map(ToString::to_string),
            cancel_dependent,
            outcome,
            error: None,
        }
    }

    #[tokio::test]
    async fn test_error_record_skips_fetch_and_cancel() {
        let api = Arc::new(MockApiClient::new());
        let finalizer = Finalizer::new(Arc::clone(&api) as Arc<dyn ApiClient>);

        let mut record = record_with(None, true, None);
        record.error = Some(ErrorPayload::protocol("ares missing"));

        let result = finalizer
            .finalize_intent(IntentKind::Payment, record, &fixtures::request_options())
            .await;

        assert!(matches!(result, Err(AuthError::Protocol(_))));
        assert_eq!(api.retrieve_intent_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.cancel_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces_without_cancellation() {
        let api = Arc::new(
            MockApiClient::new()
                .script_retrieve_intent(Err(ApiError::Transport("dns failure".to_string()))),
        );
        let finalizer = Finalizer::new(Arc::clone(&api) as Arc<dyn ApiClient>);

        let result = finalizer
            .finalize_intent(
                IntentKind::Payment,
                record_with(Some("src_1"), true, Some(AuthOutcome::Canceled)),
                &fixtures::request_options(),
            )
            .await;

        assert!(matches!(result, Err(AuthError::Transport(_))));
        assert_eq!(api.cancel_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_a_contract_violation() {
        let api = Arc::new(
            MockApiClient::new()
                .script_retrieve_intent(Ok(Intent::Setup(fixtures::setup_intent_no_action()))),
        );
        let finalizer = Finalizer::new(Arc::clone(&api) as Arc<dyn ApiClient>);

        let result = finalizer
            .finalize_intent(
                IntentKind::Payment,
                record_with(None, false, None),
                &fixtures::request_options(),
            )
            .await;

        assert!(matches!(
            result,
            Err(AuthError::TypeMismatch {
                expected: IntentKind::Payment,
                actual: IntentKind::Setup,
            })
        ));
    }

    #[tokio::test]
    async fn test_cancel_issued_once_then_second_fetch_wins() {
        // Server keeps reporting "requires action" even after cancellation;
        // the pipeline must not loop.
        let still_pending = Intent::Payment(fixtures::payment_intent_redirect());
        let api = Arc::new(
            MockApiClient::new()
                .script_retrieve_intent(Ok(still_pending.clone()))
                .script_retrieve_intent(Ok(still_pending.clone()))
                .script_cancel(Ok(still_pending.clone())),
        );
        let finalizer = Finalizer::new(Arc::clone(&api) as Arc<dyn ApiClient>);

        let (intent, outcome) = finalizer
            .finalize_intent(
                IntentKind::Payment,
                record_with(Some("src_1"), true, Some(AuthOutcome::Canceled)),
                &fixtures::request_options(),
            )
            .await
            .unwrap();

        assert_eq!(api.cancel_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.retrieve_intent_calls.load(Ordering::SeqCst), 2);
        assert_eq!(intent, still_pending);
        assert_eq!(outcome, AuthOutcome::Canceled);
        assert_eq!(
            api.last_canceled_source.lock().unwrap().as_deref(),
            Some("src_1")
        );
    }

    #[tokio::test]
    async fn test_resolved_intent_skips_cancellation() {
        let api = Arc::new(
            MockApiClient::new()
                .script_retrieve_intent(Ok(Intent::Payment(fixtures::payment_intent_no_action()))),
        );
        let finalizer = Finalizer::new(Arc::clone(&api) as Arc<dyn ApiClient>);

        let (_, outcome) = finalizer
            .finalize_intent(
                IntentKind::Payment,
                record_with(Some("src_1"), true, Some(AuthOutcome::Canceled)),
                &fixtures::request_options(),
            )
            .await
            .unwrap();

        assert_eq!(api.cancel_calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome, AuthOutcome::Canceled);
    }

    #[tokio::test]
    async fn test_cancel_without_source_id_is_skipped() {
        let api = Arc::new(
            MockApiClient::new()
                .script_retrieve_intent(Ok(Intent::Payment(fixtures::payment_intent_redirect()))),
        );
        let finalizer = Finalizer::new(Arc::clone(&api) as Arc<dyn ApiClient>);

        let (_, outcome) = finalizer
            .finalize_intent(
                IntentKind::Payment,
                record_with(None, true, None),
                &fixtures::request_options(),
            )
            .await
            .unwrap();

        assert_eq!(api.cancel_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.retrieve_intent_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome, AuthOutcome::Succeeded);
    }

    #[tokio::test]
    async fn test_cancel_failure_is_delivered_verbatim() {
        let api = Arc::new(
            MockApiClient::new()
                .script_retrieve_intent(Ok(Intent::Payment(fixtures::payment_intent_redirect())))
                .script_cancel(Err(ApiError::Api {
                    code: Some("source_not_cancelable".to_string()),
                    message: "source cannot be canceled".to_string(),
                })),
        );
        let finalizer = Finalizer::new(Arc::clone(&api) as Arc<dyn ApiClient>);

        let result = finalizer
            .finalize_intent(
                IntentKind::Payment,
                record_with(Some("src_1"), true, Some(AuthOutcome::Canceled)),
                &fixtures::request_options(),
            )
            .await;

        assert!(matches!(
            result,
            Err(AuthError::Api { code: Some(code), .. }) if code == "source_not_cancelable"
        ));
    }
}
