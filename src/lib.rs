#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the payauth library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod analytics;
pub mod api;
pub mod authenticator;
pub mod challenge;
pub mod classifier;
pub mod correlation;
pub mod finalize;
pub mod launcher;
pub mod models;
pub mod settings;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use authenticator::PaymentAuthenticator;
pub use challenge::{ChallengeEngine, ChallengeOutcome, ChallengeTransaction, FlowHandle};
pub use classifier::{classify, Action, DirectoryServerFingerprint};
pub use correlation::CorrelationRecord;
pub use models::auth::{AuthError, AuthOutcome, AuthResult};
pub use models::intent::{Intent, IntentKind, PaymentIntent, SetupIntent};
pub use settings::PayauthSettings;
