//! Outcomes and errors.
//!
//! - [`NavigationOutcome`] — what an interceptor entry point did with a
//!   navigation attempt (`Committed`, `Redirected`, `Deferred`, `Passthrough`,
//!   `Blocked`).
//! - [`DecodeError`] — why a credential could not be decoded.
//! - [`TransportError`] — failures of the HTTP seam.
//! - [`GateError`] — errors surfaced by gated operations (fetch, configuration).
//! - [`AuthError`] — login/signup failures surfaced to the login UI.
//!
//! None of these ever reach the host page as a panic. Credential problems
//! collapse into a deny decision and registry problems into the configured
//! failure policy; only fetch, login and signup return `Err` to their caller.
//!
//! # Examples
//!
//! ```
//! use route_gate::NavigationOutcome;
//!
//! let outcome = NavigationOutcome::Redirected {
//!     from: "/dashboard".into(),
//!     to: "/login?redirect=%2Fdashboard".into(),
//! };
//! assert!(outcome.is_redirected());
//! assert_eq!(outcome.redirect_path(), Some("/login?redirect=%2Fdashboard"));
//! ```

use thiserror::Error;

// ============================================================================
// Navigation outcome
// ============================================================================

/// Result of one navigation attempt through the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The attempt was allowed and the underlying operation ran.
    Committed { path: String },
    /// The attempt was denied; the original operation did not run (or, for
    /// back/forward, was corrected) and the location was replaced.
    Redirected { from: String, to: String },
    /// The registry is still loading and the attempt was buffered.
    Deferred { path: String },
    /// A back/forward or initial-load attempt arrived while a redirect was in
    /// progress and was applied without a check.
    Passthrough { path: String },
    /// The attempt arrived while a redirect was in progress and was denied.
    /// The operation did not run and no second redirect was issued.
    Blocked { path: String, redirect: String },
}

impl NavigationOutcome {
    /// Check if the underlying operation ran after a successful check.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }

    /// Check if the attempt ended in a redirect.
    pub fn is_redirected(&self) -> bool {
        matches!(self, Self::Redirected { .. })
    }

    /// Check if the attempt was buffered until the registry is ready.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred { .. })
    }

    /// Check if the attempt bypassed the gate because of reentrancy.
    pub fn is_passthrough(&self) -> bool {
        matches!(self, Self::Passthrough { .. })
    }

    /// Check if the attempt was denied during a redirect already in progress.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    /// Redirect target, if the attempt was redirected.
    pub fn redirect_path(&self) -> Option<&str> {
        match self {
            Self::Redirected { to, .. } => Some(to),
            _ => None,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a credential's claim payload could not be read.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token must have 3 dot-separated segments, found {segments}")]
    Malformed { segments: usize },

    #[error("claim segment is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("claim segment is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("claims carry no 'exp' value")]
    MissingExpiry,

    #[error("'exp' value {0} is outside the representable range")]
    ExpiryOutOfRange(f64),
}

/// Failure of the HTTP seam itself (as opposed to a non-success status).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Errors returned by gated operations.
#[derive(Debug, Error)]
pub enum GateError {
    /// The navigation was denied; the location has been replaced with `redirect`.
    #[error("unauthorized: redirected to {redirect}")]
    Unauthorized { redirect: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid gate policy: {0}")]
    Config(String),
}

/// Errors surfaced to the login UI by [`AuthClient`](crate::session::AuthClient).
#[derive(Debug, Error)]
pub enum AuthError {
    /// The server answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The server answered with success but the body was unusable.
    #[error("malformed auth response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ============================================================================
// Tests
// ============================================================================
