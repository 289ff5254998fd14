//! Intent models
//!
//! An intent is the server-side record of an in-progress payment or setup
//! operation. The core only ever reads intents; fresher copies arrive from
//! re-fetches through the API client.

use serde::{Deserialize, Serialize};
use url::Url;

/// Status of an intent on the API side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
}

/// The verification step the server asks the client to perform next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NextAction {
    /// Send the customer through a browser redirect
    RedirectToUrl {
        url: Url,
        return_url: Option<Url>,
    },
    /// Drive the authentication with the native SDK flow
    UseSdk(SdkData),
}

/// Payload attached to a [`NextAction::UseSdk`] action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version", rename_all = "snake_case")]
pub enum SdkData {
    /// Legacy 3-D Secure 1: the SDK is handed a redirect URL
    ThreeDs1 { url: Url },
    /// 3-D Secure 2: directory-server material for a challenge transaction
    ThreeDs2 {
        /// Token identifying the authentication attempt on the API side
        source: String,
        directory_server_id: String,
        directory_server_name: String,
        /// Base64 DER directory-server public key
        server_key: String,
        key_id: Option<String>,
        /// Base64 DER root certificates
        root_certs: Vec<String>,
        message_version: String,
    },
    /// An SDK action kind this library does not know how to drive.
    /// Classification degrades these to bypass, never to an error.
    Unrecognized { kind: String },
}

/// An in-progress payment confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub live_mode: bool,
    pub status: IntentStatus,
    pub next_action: Option<NextAction>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

/// An in-progress setup (off-session payment method) confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupIntent {
    pub id: String,
    pub client_secret: String,
    pub live_mode: bool,
    pub status: IntentStatus,
    pub next_action: Option<NextAction>,
}

/// Which flavor of intent an attempt is operating on
///
/// The kind selects the correlation request code and the typed result that
/// wraps the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Payment,
    Setup,
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentKind::Payment => write!(f, "payment"),
            IntentKind::Setup => write!(f, "setup"),
        }
    }
}

/// Either flavor of intent, as returned by the API client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "object")]
pub enum Intent {
    #[serde(rename = "payment_intent")]
    Payment(PaymentIntent),
    #[serde(rename = "setup_intent")]
    Setup(SetupIntent),
}

impl Intent {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Intent::Payment(intent) => &intent.id,
            Intent::Setup(intent) => &intent.id,
        }
    }

    #[must_use]
    pub fn client_secret(&self) -> &str {
        match self {
            Intent::Payment(intent) => &intent.client_secret,
            Intent::Setup(intent) => &intent.client_secret,
        }
    }

    #[must_use]
    pub fn live_mode(&self) -> bool {
        match self {
            Intent::Payment(intent) => intent.live_mode,
            Intent::Setup(intent) => intent.live_mode,
        }
    }

    #[must_use]
    pub fn status(&self) -> IntentStatus {
        match self {
            Intent::Payment(intent) => intent.status,
            Intent::Setup(intent) => intent.status,
        }
    }

    #[must_use]
    pub fn next_action(&self) -> Option<&NextAction> {
        match self {
            Intent::Payment(intent) => intent.next_action.as_ref(),
            Intent::Setup(intent) => intent.next_action.as_ref(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::Payment(_) => IntentKind::Payment,
            Intent::Setup(_) => IntentKind::Setup,
        }
    }

    /// Whether the server still requires a verification step from the client.
    ///
    /// True iff the next-action descriptor is present and not already
    /// resolved by a status transition.
    #[must_use]
    pub fn requires_action(&self) -> bool {
        self.status() == IntentStatus::RequiresAction && self.next_action().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_intent(status: IntentStatus, next_action: Option<NextAction>) -> Intent {
        Intent::Payment(PaymentIntent {
            id: "pi_123".to_string(),
            client_secret: "pi_123_secret_456".to_string(),
            live_mode: false,
            status,
            next_action,
            amount: Some(1099),
            currency: Some("usd".to_string()),
        })
    }

    #[test]
    fn test_requires_action_needs_status_and_descriptor() {
        let action = NextAction::RedirectToUrl {
            url: "https://hooks.example.com/redirect".parse().unwrap(),
            return_url: None,
        };

        let pending = payment_intent(IntentStatus::RequiresAction, Some(action.clone()));
        assert!(pending.requires_action());

        // Status resolved: the stale descriptor no longer counts
        let resolved = payment_intent(IntentStatus::Succeeded, Some(action));
        assert!(!resolved.requires_action());

        // Status says action but nothing describes it
        let empty = payment_intent(IntentStatus::RequiresAction, None);
        assert!(!empty.requires_action());
    }

    #[test]
    fn test_intent_kind_accessors() {
        let payment = payment_intent(IntentStatus::Succeeded, None);
        assert_eq!(payment.kind(), IntentKind::Payment);
        assert_eq!(payment.id(), "pi_123");

        let setup = Intent::Setup(SetupIntent {
            id: "seti_123".to_string(),
            client_secret: "seti_123_secret_456".to_string(),
            live_mode: true,
            status: IntentStatus::RequiresAction,
            next_action: None,
        });
        assert_eq!(setup.kind(), IntentKind::Setup);
        assert!(setup.live_mode());
    }
}
