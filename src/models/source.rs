//! Source models
//!
//! Sources are standalone payment instruments with their own authentication
//! flow descriptor. Only the redirect flow involves this library; every
//! other flow kind bypasses straight back to the caller.

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Canceled,
    Chargeable,
    Consumed,
    Failed,
    Pending,
}

/// How a source expects to be authenticated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFlow {
    Redirect,
    Receiver,
    CodeVerification,
    None,
}

/// Redirect details attached to a [`SourceFlow::Redirect`] source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRedirect {
    pub url: Url,
    pub return_url: Option<Url>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub client_secret: String,
    pub live_mode: bool,
    pub status: SourceStatus,
    pub flow: SourceFlow,
    pub redirect: Option<SourceRedirect>,
}

impl Source {
    /// Whether authenticating this source means launching a redirect
    #[must_use]
    pub fn requires_redirect(&self) -> bool {
        self.flow == SourceFlow::Redirect && self.redirect.is_some()
    }
}
