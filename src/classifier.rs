//! Action classifier
//!
//! Pure decision function mapping the current intent state to the
//! verification mechanism that applies. No I/O happens here; directory
//! server trust material is validated up front so a malformed certificate
//! short-circuits before any transaction is created.

use crate::models::auth::AuthError;
use crate::models::intent::{Intent, NextAction, SdkData};
use base64::{engine::general_purpose, Engine as _};
use url::Url;

/// Trust and routing material needed to start one 3DS2 transaction
///
/// Derived exactly once from the intent's next-action data and owned by the
/// attempt it was derived for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryServerFingerprint {
    pub directory_server_id: String,
    pub network_name: String,
    /// Decoded DER root certificates
    pub root_certs: Vec<Vec<u8>>,
    /// Decoded DER directory-server public key
    pub server_public_key: Vec<u8>,
    pub key_id: Option<String>,
    /// Token identifying the authentication attempt on the API side
    pub source: String,
    pub message_version: String,
}

/// Which mechanism the classifier selected
#[derive(Debug)]
pub enum Action {
    /// No further challenge; surface the current intent state
    Bypass,
    /// Drive a native 3DS2 challenge transaction
    Begin3ds2(Box<DirectoryServerFingerprint>),
    /// Hand the customer to a browser redirect
    BeginRedirect {
        url: Url,
        return_url: Option<Url>,
    },
    /// The attempt cannot proceed; deliver this error
    Fail(AuthError),
}

/// Classify the intent's required next action.
///
/// Decision table, evaluated in order: no outstanding action bypasses;
/// 3DS2 data begins a challenge (or fails on malformed trust material);
/// legacy 3DS1 and generic redirects launch the redirect sub-flow; any
/// unrecognized action kind degrades to bypass, never to an error.
#[must_use]
pub fn classify(intent: &Intent) -> Action {
    if !intent.requires_action() {
        return Action::Bypass;
    }

    match intent.next_action() {
        Some(NextAction::UseSdk(SdkData::ThreeDs2 {
            source,
            directory_server_id,
            directory_server_name,
            server_key,
            key_id,
            root_certs,
            message_version,
        })) => match parse_fingerprint(
            source,
            directory_server_id,
            directory_server_name,
            server_key,
            key_id.as_deref(),
            root_certs,
            message_version,
        ) {
            Ok(fingerprint) => Action::Begin3ds2(Box::new(fingerprint)),
            Err(err) => Action::Fail(err),
        },
        Some(NextAction::UseSdk(SdkData::ThreeDs1 { url })) => Action::BeginRedirect {
            url: url.clone(),
            return_url: None,
        },
        Some(NextAction::RedirectToUrl { url, return_url }) => Action::BeginRedirect {
            url: url.clone(),
            return_url: return_url.clone(),
        },
        // Unrecognized SDK action kinds and a vanished descriptor both
        // degrade to bypass for forward compatibility.
        Some(NextAction::UseSdk(SdkData::Unrecognized { .. })) | None => Action::Bypass,
    }
}

/// Build a [`DirectoryServerFingerprint`] from raw 3DS2 next-action data.
///
/// # Errors
///
/// Returns [`AuthError::Certificate`] when the server key or any root
/// certificate is not valid base64 DER.
pub fn parse_fingerprint(
    source: &str,
    directory_server_id: &str,
    network_name: &str,
    server_key: &str,
    key_id: Option<&str>,
    root_certs: &[String],
    message_version: &str,
) -> Result<DirectoryServerFingerprint, AuthError> {
    if root_certs.is_empty() {
        return Err(AuthError::Certificate(
            "directory server data contains no root certificates".to_string(),
        ));
    }

    let server_public_key = decode_der("directory server public key", server_key)?;
    let root_certs = root_certs
        .iter()
        .map(|cert| decode_der("root certificate", cert))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DirectoryServerFingerprint {
        directory_server_id: directory_server_id.to_string(),
        network_name: network_name.to_string(),
        root_certs,
        server_public_key,
        key_id: key_id.map(ToString::to_string),
        source: source.to_string(),
        message_version: message_version.to_string(),
    })
}

/// Decode one piece of base64 DER material, checking the outer structure
fn decode_der(label: &str, material: &str) -> Result<Vec<u8>, AuthError> {
    let der = general_purpose::STANDARD
        .decode(material.trim())
        .map_err(|err| AuthError::Certificate(format!("{label} is not valid base64: {err}")))?;

    // Every certificate and SPKI body is an outer DER SEQUENCE
    if der.len() < 2 || der[0] != 0x30 {
        return Err(AuthError::Certificate(format!(
            "{label} is not DER-encoded"
        )));
    }

    Ok(der)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::intent::{IntentStatus, PaymentIntent};
    use crate::testing::fixtures;

    #[test]
    fn test_resolved_intent_bypasses_regardless_of_action_contents() {
        // A leftover 3DS2 descriptor on a succeeded intent must not start
        // a challenge.
        let intent = Intent::Payment(PaymentIntent {
            status: IntentStatus::Succeeded,
            ..fixtures::payment_intent_3ds2()
        });
        assert!(matches!(classify(&intent), Action::Bypass));

        let no_action = Intent::Payment(fixtures::payment_intent_no_action());
        assert!(matches!(classify(&no_action), Action::Bypass));
    }

    #[test]
    fn test_well_formed_3ds2_data_begins_a_challenge() {
        let intent = Intent::Payment(fixtures::payment_intent_3ds2());
        match classify(&intent) {
            Action::Begin3ds2(fingerprint) => {
                assert_eq!(fingerprint.directory_server_id, "A000000003");
                assert_eq!(fingerprint.network_name, "visa");
                assert_eq!(fingerprint.source, fixtures::THREE_DS2_SOURCE);
                assert_eq!(fingerprint.root_certs.len(), 2);
                assert_eq!(fingerprint.server_public_key[0], 0x30);
            }
            other => panic!("expected Begin3ds2, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_certificate_fails_without_a_challenge() {
        let intent = Intent::Payment(fixtures::payment_intent_3ds2_malformed());
        match classify(&intent) {
            Action::Fail(AuthError::Certificate(msg)) => {
                assert!(msg.contains("root certificate"));
            }
            other => panic!("expected certificate failure, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_root_certificates_fail() {
        let result = parse_fingerprint(
            "src_1",
            "A000000003",
            "visa",
            &fixtures::der_material(),
            None,
            &[],
            "2.1.0",
        );
        assert!(matches!(result, Err(AuthError::Certificate(_))));
    }

    #[test]
    fn test_non_der_material_fails() {
        // Valid base64, wrong structure
        let flat = general_purpose::STANDARD.encode([0x02u8, 0x01, 0x01]);
        let result = parse_fingerprint(
            "src_1",
            "A000000003",
            "visa",
            &flat,
            None,
            &[fixtures::der_material()],
            "2.1.0",
        );
        assert!(matches!(result, Err(AuthError::Certificate(_))));
    }

    #[test]
    fn test_legacy_3ds1_maps_to_redirect_without_return_url() {
        let intent = Intent::Payment(fixtures::payment_intent_3ds1());
        match classify(&intent) {
            Action::BeginRedirect { url, return_url } => {
                assert_eq!(url.as_str(), "https://hooks.example.com/3ds1/authenticate");
                assert!(return_url.is_none());
            }
            other => panic!("expected BeginRedirect, got {other:?}"),
        }
    }

    #[test]
    fn test_generic_redirect_keeps_the_exact_url_pair() {
        let intent = Intent::Payment(fixtures::payment_intent_redirect());
        match classify(&intent) {
            Action::BeginRedirect { url, return_url } => {
                assert_eq!(url.as_str(), "https://hooks.example.com/redirect/authenticate");
                assert_eq!(
                    return_url.unwrap().as_str(),
                    "myapp://payment-complete",
                );
            }
            other => panic!("expected BeginRedirect, got {other:?}"),
        }
    }

    #[test]
    fn test_unrecognized_action_kind_degrades_to_bypass() {
        let intent = Intent::Payment(fixtures::payment_intent_unrecognized_action());
        assert!(matches!(classify(&intent), Action::Bypass));
    }
}
