//! Shared fixtures for authentication flow tests

use crate::api::{Ares, RequestOptions, ThreeDs2AuthResponse};
use crate::models::intent::{IntentStatus, NextAction, PaymentIntent, SdkData, SetupIntent};
use crate::models::source::{Source, SourceFlow, SourceRedirect, SourceStatus};
use base64::{engine::general_purpose, Engine as _};

/// Attempt-source token used by every 3DS2 fixture
pub const THREE_DS2_SOURCE: &str = "src_3ds2_attempt_1";

#[must_use]
pub fn request_options() -> RequestOptions {
    RequestOptions::new("sk_test_mock_key")
}

/// Minimal base64 DER material; a well-formed outer SEQUENCE is enough
/// structure for fingerprint validation
#[must_use]
pub fn der_material() -> String {
    general_purpose::STANDARD.encode([0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x2A])
}

fn base_payment_intent() -> PaymentIntent {
    PaymentIntent {
        id: "pi_123".to_string(),
        client_secret: "pi_123_secret_456".to_string(),
        live_mode: false,
        status: IntentStatus::RequiresAction,
        next_action: None,
        amount: Some(1099),
        currency: Some("usd".to_string()),
    }
}

#[must_use]
pub fn payment_intent_no_action() -> PaymentIntent {
    PaymentIntent {
        status: IntentStatus::Succeeded,
        ..base_payment_intent()
    }
}

#[must_use]
pub fn payment_intent_redirect() -> PaymentIntent {
    PaymentIntent {
        next_action: Some(NextAction::RedirectToUrl {
            url: "https://hooks.example.com/redirect/authenticate"
                .parse()
                .unwrap(),
            return_url: Some("myapp://payment-complete".parse().unwrap()),
        }),
        ..base_payment_intent()
    }
}

#[must_use]
pub fn payment_intent_3ds1() -> PaymentIntent {
    PaymentIntent {
        next_action: Some(NextAction::UseSdk(SdkData::ThreeDs1 {
            url: "https://hooks.example.com/3ds1/authenticate".parse().unwrap(),
        })),
        ..base_payment_intent()
    }
}

#[must_use]
pub fn three_ds2_sdk_data() -> SdkData {
    SdkData::ThreeDs2 {
        source: THREE_DS2_SOURCE.to_string(),
        directory_server_id: "A000000003".to_string(),
        directory_server_name: "visa".to_string(),
        server_key: der_material(),
        key_id: Some("7c4debe3f4af7f9d1569a2ffea4343c2566826ee".to_string()),
        root_certs: vec![der_material(), der_material()],
        message_version: "2.1.0".to_string(),
    }
}

#[must_use]
pub fn payment_intent_3ds2() -> PaymentIntent {
    PaymentIntent {
        next_action: Some(NextAction::UseSdk(three_ds2_sdk_data())),
        ..base_payment_intent()
    }
}

#[must_use]
pub fn payment_intent_3ds2_malformed() -> PaymentIntent {
    PaymentIntent {
        next_action: Some(NextAction::UseSdk(SdkData::ThreeDs2 {
            source: THREE_DS2_SOURCE.to_string(),
            directory_server_id: "A000000003".to_string(),
            directory_server_name: "visa".to_string(),
            server_key: der_material(),
            key_id: None,
            root_certs: vec!["%%% not base64 %%%".to_string()],
            message_version: "2.1.0".to_string(),
        })),
        ..base_payment_intent()
    }
}

#[must_use]
pub fn payment_intent_unrecognized_action() -> PaymentIntent {
    PaymentIntent {
        next_action: Some(NextAction::UseSdk(SdkData::Unrecognized {
            kind: "hosted_voice_authentication".to_string(),
        })),
        ..base_payment_intent()
    }
}

#[must_use]
pub fn setup_intent_no_action() -> SetupIntent {
    SetupIntent {
        id: "seti_123".to_string(),
        client_secret: "seti_123_secret_456".to_string(),
        live_mode: false,
        status: IntentStatus::Succeeded,
        next_action: None,
    }
}

#[must_use]
pub fn setup_intent_3ds2() -> SetupIntent {
    SetupIntent {
        id: "seti_123".to_string(),
        client_secret: "seti_123_secret_456".to_string(),
        live_mode: false,
        status: IntentStatus::RequiresAction,
        next_action: Some(NextAction::UseSdk(three_ds2_sdk_data())),
    }
}

#[must_use]
pub fn ares_challenge() -> Ares {
    Ares {
        acs_trans_id: "acs_trans_1".to_string(),
        server_trans_id: "3ds_server_trans_1".to_string(),
        acs_signed_content: Some("eyJhbGciOiJQUzI1NiJ9.payload.sig".to_string()),
        trans_status: Some("C".to_string()),
    }
}

#[must_use]
pub fn ares_frictionless() -> Ares {
    Ares {
        acs_trans_id: "acs_trans_1".to_string(),
        server_trans_id: "3ds_server_trans_1".to_string(),
        acs_signed_content: None,
        trans_status: Some("Y".to_string()),
    }
}

#[must_use]
pub fn auth_response_challenge() -> ThreeDs2AuthResponse {
    ThreeDs2AuthResponse {
        ares: Some(ares_challenge()),
        fallback_redirect_url: None,
    }
}

#[must_use]
pub fn auth_response_frictionless() -> ThreeDs2AuthResponse {
    ThreeDs2AuthResponse {
        ares: Some(ares_frictionless()),
        fallback_redirect_url: None,
    }
}

#[must_use]
pub fn auth_response_fallback() -> ThreeDs2AuthResponse {
    ThreeDs2AuthResponse {
        ares: None,
        fallback_redirect_url: Some("https://hooks.example.com/3ds2/fallback".parse().unwrap()),
    }
}

#[must_use]
pub fn auth_response_empty() -> ThreeDs2AuthResponse {
    ThreeDs2AuthResponse {
        ares: None,
        fallback_redirect_url: None,
    }
}

#[must_use]
pub fn redirect_source() -> Source {
    Source {
        id: "src_redirect_1".to_string(),
        client_secret: "src_redirect_1_secret_2".to_string(),
        live_mode: false,
        status: SourceStatus::Pending,
        flow: SourceFlow::Redirect,
        redirect: Some(SourceRedirect {
            url: "https://pay.example.com/authorize/src_redirect_1"
                .parse()
                .unwrap(),
            return_url: Some("myapp://source-complete".parse().unwrap()),
        }),
    }
}

#[must_use]
pub fn chargeable_source() -> Source {
    Source {
        id: "src_card_1".to_string(),
        client_secret: "src_card_1_secret_2".to_string(),
        live_mode: false,
        status: SourceStatus::Chargeable,
        flow: SourceFlow::None,
        redirect: None,
    }
}
