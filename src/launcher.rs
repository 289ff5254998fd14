//! UI launcher collaborator contract
//!
//! The host owns every visible surface. This library only hands it launch
//! requests; results come back later on a different call path, never as a
//! return value. Every launch carries the encoded correlation payload the
//! host must redeliver to the matching result handler.

use crate::correlation::{self, CorrelationRecord};
use log::error;
use url::Url;

/// What the host should put on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchKind {
    /// Open the given URL and bring the customer back to `return_url`
    Redirect {
        url: Url,
        return_url: Option<Url>,
    },
    /// Nothing to show: redeliver the payload straight back to the result
    /// handler. Used for bypasses, errors, and challenge completions.
    Relay,
}

/// A single fire-and-forget launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub kind: LaunchKind,
    /// Demultiplexing key the host passes back with the result payload
    pub request_code: u32,
    /// Opaque correlation payload to redeliver with the result
    pub payload: String,
}

/// Fire-and-forget UI collaborator
///
/// Both operations must return immediately; the host owns retry and
/// back-navigation semantics. Neither can fail visibly.
pub trait UiLauncher: Send + Sync {
    /// Show a transient "preparing" indicator ahead of a challenge
    fn show_preparing(&self);

    /// Launch a redirect page or a result relay
    fn launch(&self, request: LaunchRequest);
}

/// Encode a correlation record and hand it to the UI collaborator.
///
/// Encoding a plain record does not fail in practice; if it ever does the
/// launch is dropped and logged, matching the "result delivery may be
/// dropped silently" contract of the hand-off boundary.
pub(crate) fn launch_with_record(
    launcher: &dyn UiLauncher,
    kind: LaunchKind,
    record: &CorrelationRecord,
) {
    match correlation::encode(record) {
        Ok(payload) => launcher.launch(LaunchRequest {
            kind,
            request_code: record.request_code,
            payload,
        }),
        Err(err) => error!(
            "dropping launch for request code {}: {err}",
            record.request_code
        ),
    }
}
