//! Mock collaborators for isolated testing
//!
//! Scriptable implementations of the external collaborator traits. Each
//! mock records its calls so tests can assert exactly-once properties.

use crate::analytics::{AnalyticsEvent, AnalyticsSink, EventContext};
use crate::api::{
    ApiClient, ApiError, ConfirmParams, RequestOptions, ThreeDs2AuthParams, ThreeDs2AuthResponse,
};
use crate::challenge::{
    AuthRequestParams, ChallengeEngine, ChallengeOutcome, ChallengeParameters,
    ChallengeTransaction, ChallengeUiType, TransactionCreateError, TransactionRequest,
};
use crate::launcher::{LaunchKind, LaunchRequest, UiLauncher};
use crate::models::intent::Intent;
use crate::models::source::Source;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

fn unscripted(operation: &str) -> ApiError {
    ApiError::Transport(format!("mock: no scripted response for {operation}"))
}

/// Pop the next scripted response; the final one repeats forever so
/// re-fetch loops can observe a stable server state.
fn next_response<T: Clone>(
    queue: &Mutex<VecDeque<Result<T, ApiError>>>,
    operation: &str,
) -> Result<T, ApiError> {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front().unwrap()
    } else {
        queue.front().cloned().unwrap_or_else(|| Err(unscripted(operation)))
    }
}

/// Scriptable API collaborator
#[derive(Default)]
pub struct MockApiClient {
    confirm_response: Mutex<Option<Result<Intent, ApiError>>>,
    retrieve_intent_responses: Mutex<VecDeque<Result<Intent, ApiError>>>,
    retrieve_source_responses: Mutex<VecDeque<Result<Source, ApiError>>>,
    cancel_response: Mutex<Option<Result<Intent, ApiError>>>,
    auth_response: Mutex<Option<Result<ThreeDs2AuthResponse, ApiError>>>,
    complete_response: Mutex<Option<Result<bool, ApiError>>>,

    pub confirm_calls: AtomicUsize,
    pub retrieve_intent_calls: AtomicUsize,
    pub retrieve_source_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub auth_calls: AtomicUsize,
    pub complete_calls: AtomicUsize,

    pub last_confirm_params: Mutex<Option<ConfirmParams>>,
    pub last_auth_params: Mutex<Option<ThreeDs2AuthParams>>,
    pub last_canceled_source: Mutex<Option<String>>,
}

impl MockApiClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn script_confirm(self, response: Result<Intent, ApiError>) -> Self {
        *self.confirm_response.lock().unwrap() = Some(response);
        self
    }

    /// Append a retrieve-intent response; the last one repeats
    #[must_use]
    pub fn script_retrieve_intent(self, response: Result<Intent, ApiError>) -> Self {
        self.retrieve_intent_responses
            .lock()
            .unwrap()
            .push_back(response);
        self
    }

    /// Append a retrieve-source response; the last one repeats
    #[must_use]
    pub fn script_retrieve_source(self, response: Result<Source, ApiError>) -> Self {
        self.retrieve_source_responses
            .lock()
            .unwrap()
            .push_back(response);
        self
    }

    #[must_use]
    pub fn script_cancel(self, response: Result<Intent, ApiError>) -> Self {
        *self.cancel_response.lock().unwrap() = Some(response);
        self
    }

    #[must_use]
    pub fn script_auth(self, response: Result<ThreeDs2AuthResponse, ApiError>) -> Self {
        *self.auth_response.lock().unwrap() = Some(response);
        self
    }

    #[must_use]
    pub fn script_complete(self, response: Result<bool, ApiError>) -> Self {
        *self.complete_response.lock().unwrap() = Some(response);
        self
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn confirm(
        &self,
        params: &ConfirmParams,
        _options: &RequestOptions,
    ) -> Result<Intent, ApiError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_confirm_params.lock().unwrap() = Some(params.clone());
        self.confirm_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(unscripted("confirm")))
    }

    async fn retrieve_intent(
        &self,
        _client_secret: &str,
        _options: &RequestOptions,
    ) -> Result<Intent, ApiError> {
        self.retrieve_intent_calls.fetch_add(1, Ordering::SeqCst);
        next_response(&self.retrieve_intent_responses, "retrieve_intent")
    }

    async fn retrieve_source(
        &self,
        _source_id: &str,
        _client_secret: &str,
        _options: &RequestOptions,
    ) -> Result<Source, ApiError> {
        self.retrieve_source_calls.fetch_add(1, Ordering::SeqCst);
        next_response(&self.retrieve_source_responses, "retrieve_source")
    }

    async fn cancel_intent_source(
        &self,
        _intent: &Intent,
        source_id: &str,
        _options: &RequestOptions,
    ) -> Result<Intent, ApiError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_canceled_source.lock().unwrap() = Some(source_id.to_string());
        self.cancel_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(unscripted("cancel_intent_source")))
    }

    async fn start_3ds2_auth(
        &self,
        params: &ThreeDs2AuthParams,
        _intent_id: &str,
        _options: &RequestOptions,
    ) -> Result<ThreeDs2AuthResponse, ApiError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_auth_params.lock().unwrap() = Some(params.clone());
        self.auth_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(unscripted("start_3ds2_auth")))
    }

    async fn complete_3ds2_auth(
        &self,
        _source_id: &str,
        _options: &RequestOptions,
    ) -> Result<bool, ApiError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        // Completion notification is best-effort; default to success
        self.complete_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Ok(true))
    }
}

/// Scriptable challenge engine delivering a fixed terminal outcome
pub struct MockChallengeEngine {
    outcome: Mutex<ChallengeOutcome>,
    creation_failure: Mutex<Option<String>>,

    pub create_calls: AtomicUsize,
    pub executions: Arc<AtomicUsize>,
    pub last_request: Mutex<Option<TransactionRequest>>,
    pub last_challenge_params: Arc<Mutex<Option<ChallengeParameters>>>,
    pub last_timeout: Arc<Mutex<Option<Duration>>>,
}

impl MockChallengeEngine {
    /// Engine whose challenges complete with the given terminal outcome
    #[must_use]
    pub fn with_outcome(outcome: ChallengeOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            creation_failure: Mutex::new(None),
            create_calls: AtomicUsize::new(0),
            executions: Arc::new(AtomicUsize::new(0)),
            last_request: Mutex::new(None),
            last_challenge_params: Arc::new(Mutex::new(None)),
            last_timeout: Arc::new(Mutex::new(None)),
        }
    }

    /// Engine whose challenges complete successfully
    #[must_use]
    pub fn completing() -> Self {
        Self::with_outcome(ChallengeOutcome::Completed { success: true })
    }

    /// Engine that rejects transaction creation (malformed certificates)
    #[must_use]
    pub fn failing_creation(message: &str) -> Self {
        let engine = Self::completing();
        *engine.creation_failure.lock().unwrap() = Some(message.to_string());
        engine
    }
}

#[async_trait]
impl ChallengeEngine for MockChallengeEngine {
    async fn create_transaction(
        &self,
        request: TransactionRequest,
    ) -> Result<Box<dyn ChallengeTransaction>, TransactionCreateError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);

        if let Some(message) = self.creation_failure.lock().unwrap().clone() {
            return Err(TransactionCreateError(message));
        }

        Ok(Box::new(MockTransaction {
            outcome: self.outcome.lock().unwrap().clone(),
            executions: Arc::clone(&self.executions),
            last_challenge_params: Arc::clone(&self.last_challenge_params),
            last_timeout: Arc::clone(&self.last_timeout),
        }))
    }
}

struct MockTransaction {
    outcome: ChallengeOutcome,
    executions: Arc<AtomicUsize>,
    last_challenge_params: Arc<Mutex<Option<ChallengeParameters>>>,
    last_timeout: Arc<Mutex<Option<Duration>>>,
}

#[async_trait]
impl ChallengeTransaction for MockTransaction {
    fn auth_request_params(&self) -> AuthRequestParams {
        AuthRequestParams {
            sdk_app_id: "mock-sdk-app".to_string(),
            sdk_reference_number: "MOCK_3DS2_SDK_REF".to_string(),
            sdk_transaction_id: uuid::Uuid::new_v4().to_string(),
            device_data: "eyJkZXZpY2UiOiJtb2NrIn0".to_string(),
            sdk_ephemeral_public_key: "{\"kty\":\"EC\",\"crv\":\"P-256\"}".to_string(),
            message_version: "2.1.0".to_string(),
        }
    }

    fn ui_type(&self) -> ChallengeUiType {
        ChallengeUiType::Text
    }

    async fn execute(
        self: Box<Self>,
        params: ChallengeParameters,
        timeout: Duration,
    ) -> ChallengeOutcome {
        *self.last_challenge_params.lock().unwrap() = Some(params);
        *self.last_timeout.lock().unwrap() = Some(timeout);
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.outcome
    }
}

/// UI collaborator that records every launch
#[derive(Default)]
pub struct RecordingLauncher {
    pub launches: Mutex<Vec<LaunchRequest>>,
    pub preparing_count: AtomicUsize,
}

impl RecordingLauncher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    #[must_use]
    pub fn relay_count(&self) -> usize {
        self.launches
            .lock()
            .unwrap()
            .iter()
            .filter(|launch| launch.kind == LaunchKind::Relay)
            .count()
    }

    /// Payload of the most recent relay launch, if any
    #[must_use]
    pub fn last_relay_payload(&self) -> Option<String> {
        self.launches
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|launch| launch.kind == LaunchKind::Relay)
            .map(|launch| launch.payload.clone())
    }

    /// URL pair of the most recent redirect launch, if any
    #[must_use]
    pub fn last_redirect(&self) -> Option<(Url, Option<Url>)> {
        self.launches
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|launch| match &launch.kind {
                LaunchKind::Redirect { url, return_url } => {
                    Some((url.clone(), return_url.clone()))
                }
                LaunchKind::Relay => None,
            })
    }
}

impl UiLauncher for RecordingLauncher {
    fn show_preparing(&self) {
        self.preparing_count.fetch_add(1, Ordering::SeqCst);
    }

    fn launch(&self, request: LaunchRequest) {
        self.launches.lock().unwrap().push(request);
    }
}

/// Analytics sink that records every emitted event
#[derive(Default)]
pub struct RecordingAnalytics {
    pub events: Mutex<Vec<(AnalyticsEvent, EventContext)>>,
}

impl RecordingAnalytics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn emitted(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(event, _)| *event)
            .collect()
    }

    #[must_use]
    pub fn contains(&self, event: AnalyticsEvent) -> bool {
        self.emitted().contains(&event)
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn emit(&self, event: AnalyticsEvent, context: &EventContext) {
        self.events.lock().unwrap().push((event, context.clone()));
    }
}
