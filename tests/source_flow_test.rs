// Integration tests for the source authentication flow: fetch the source,
// launch its redirect when the flow kind asks for one, bypass otherwise.
use payauth::analytics::AnalyticsSink;
use payauth::api::{ApiClient, ApiError, RequestOptions};
use payauth::challenge::ChallengeEngine;
use payauth::launcher::UiLauncher;
use payauth::models::auth::AuthError;
use payauth::settings::PayauthSettings;
use payauth::testing::fixtures;
use payauth::testing::{MockApiClient, MockChallengeEngine, RecordingAnalytics, RecordingLauncher};
use payauth::PaymentAuthenticator;
use std::sync::atomic::Ordering;
use std::sync::Arc;

struct Harness {
    api: Arc<MockApiClient>,
    launcher: Arc<RecordingLauncher>,
    authenticator: PaymentAuthenticator,
    options: RequestOptions,
}

fn harness(api: MockApiClient) -> Harness {
    let api = Arc::new(api);
    let launcher = Arc::new(RecordingLauncher::new());

    let authenticator = PaymentAuthenticator::new(
        Arc::clone(&api) as Arc<dyn ApiClient>,
        Arc::new(MockChallengeEngine::completing()) as Arc<dyn ChallengeEngine>,
        Arc::clone(&launcher) as Arc<dyn UiLauncher>,
        Arc::new(RecordingAnalytics::new()) as Arc<dyn AnalyticsSink>,
        PayauthSettings::default(),
    );

    Harness {
        api,
        launcher,
        authenticator,
        options: fixtures::request_options(),
    }
}

#[tokio::test]
async fn redirect_source_launches_its_redirect() {
    let source = fixtures::redirect_source();
    let h = harness(MockApiClient::new().script_retrieve_source(Ok(source.clone())));

    h.authenticator
        .authenticate_source(&source.id, &source.client_secret, &h.options)
        .await;

    let (url, return_url) = h.launcher.last_redirect().expect("redirect launched");
    assert_eq!(url.as_str(), "https://pay.example.com/authorize/src_redirect_1");
    assert_eq!(return_url.unwrap().as_str(), "myapp://source-complete");

    // The host redelivers the launch payload; the handler re-fetches
    let payload = h.launcher.launches.lock().unwrap().last().unwrap().payload.clone();
    let fetched = h
        .authenticator
        .handle_source_result(&payload, &h.options)
        .await
        .unwrap()
        .expect("source result applies");
    assert_eq!(fetched.id, source.id);
    assert_eq!(h.api.retrieve_source_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_redirect_source_bypasses() {
    let source = fixtures::chargeable_source();
    let h = harness(MockApiClient::new().script_retrieve_source(Ok(source.clone())));

    h.authenticator
        .authenticate_source(&source.id, &source.client_secret, &h.options)
        .await;

    assert!(h.launcher.last_redirect().is_none());
    let payload = h.launcher.last_relay_payload().expect("bypass relay");

    let fetched = h
        .authenticator
        .handle_source_result(&payload, &h.options)
        .await
        .unwrap()
        .expect("source result applies");
    assert_eq!(fetched.id, source.id);
}

#[tokio::test]
async fn source_retrieval_failure_relays_the_error() {
    let h = harness(
        MockApiClient::new()
            .script_retrieve_source(Err(ApiError::Transport("tls handshake failed".to_string()))),
    );

    h.authenticator
        .authenticate_source("src_down_1", "src_down_1_secret", &h.options)
        .await;

    let payload = h.launcher.last_relay_payload().expect("error relay");
    let result = h
        .authenticator
        .handle_source_result(&payload, &h.options)
        .await;
    assert!(matches!(result, Err(AuthError::Transport(_))));
    // The error came from the launch record; only the original fetch ran
    assert_eq!(h.api.retrieve_source_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn payment_handler_ignores_source_payloads() {
    let source = fixtures::chargeable_source();
    let h = harness(MockApiClient::new().script_retrieve_source(Ok(source.clone())));

    h.authenticator
        .authenticate_source(&source.id, &source.client_secret, &h.options)
        .await;
    let payload = h.launcher.last_relay_payload().expect("bypass relay");

    let result = h
        .authenticator
        .handle_payment_result(&payload, &h.options)
        .await
        .unwrap();
    assert!(result.is_none());
}
