//! Data models for payment authentication
//!
//! Intents, sources, and the unified result/error types shared by every
//! authentication mechanism.

pub mod auth;
pub mod intent;
pub mod source;

pub use auth::{AuthError, AuthOutcome, AuthResult};
pub use intent::{Intent, IntentKind, IntentStatus, NextAction, PaymentIntent, SdkData, SetupIntent};
pub use source::{Source, SourceFlow, SourceRedirect, SourceStatus};
