//! Navigation requests and the allow/deny decision.
//!
//! - [`NavigationRequest`] — one attempt to change the visible route, tagged
//!   with the [`EntryPoint`] it came through.
//! - [`AuthDecision`] — the answer produced by the gate and by every
//!   [`NavigationHook`](crate::hooks::NavigationHook). It is transient: computed
//!   per attempt and never stored.
//!
//! # Navigation pipeline
//!
//! For each attempt the interceptor runs:
//!
//! 1. **Resolve** the destination pathname for the entry point.
//! 2. **Hooks** in priority order; the first `Deny` wins.
//! 3. On `Allow`, **delegate** to the history primitive (push/replace), the
//!    transport (fetch) or the router callback (hand-off).
//! 4. On `Deny`, **redirect** with a location replace; the delegate never runs.
//!
//! Back/forward and the initial load have already changed the location when
//! they are observed, so for those step 3 is a no-op and step 4 corrects.

use std::fmt;

// ============================================================================
// EntryPoint
// ============================================================================

/// Mechanism through which the visible route is changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// First evaluation of the location the page was loaded at.
    InitialLoad,
    /// Programmatic `pushState`.
    Push,
    /// Programmatic `replaceState`.
    Replace,
    /// Back/forward, observed after the browser applied it.
    PopState,
    /// A data fetch that represents a route transition.
    Fetch,
    /// A third-party router setting its current route.
    RouteHandoff,
}

impl EntryPoint {
    /// Whether the location has already changed when this entry point is observed.
    ///
    /// Such transitions cannot be vetoed, only corrected.
    pub fn is_applied_before_check(self) -> bool {
        matches!(self, Self::InitialLoad | Self::PopState)
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InitialLoad => "initial-load",
            Self::Push => "push",
            Self::Replace => "replace",
            Self::PopState => "pop-state",
            Self::Fetch => "fetch",
            Self::RouteHandoff => "route-handoff",
        };
        f.write_str(name)
    }
}

// ============================================================================
// NavigationRequest
// ============================================================================

/// One navigation attempt, passed to every hook.
///
/// # Example
///
/// ```
/// use route_gate::{EntryPoint, NavigationRequest};
///
/// let request = NavigationRequest::new(EntryPoint::Push, "/dashboard");
/// assert_eq!(request.path, "/dashboard");
/// assert_eq!(request.to, "/dashboard");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    /// Monotonic navigation id assigned by the interceptor (0 when built by hand).
    pub id: usize,
    /// How the attempt arrived.
    pub entry: EntryPoint,
    /// Location before the attempt, if known.
    pub from: Option<String>,
    /// Raw destination as the caller supplied it (URL, relative path, ...).
    pub to: String,
    /// Resolved destination pathname; this is what gets classified.
    pub path: String,
}

impl NavigationRequest {
    /// Create a request whose destination is already a pathname.
    pub fn new(entry: EntryPoint, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: 0,
            entry,
            from: None,
            to: path.clone(),
            path,
        }
    }

    /// Set the raw destination when it differs from the resolved path.
    pub fn with_target(mut self, to: impl Into<String>) -> Self {
        self.to = to.into();
        self
    }

    /// Set the location the attempt starts from.
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Set the navigation id.
    pub fn with_id(mut self, id: usize) -> Self {
        self.id = id;
        self
    }
}

// ============================================================================
// AuthDecision
// ============================================================================

/// Allow/deny answer for a navigation attempt.
///
/// # Example
///
/// ```
/// use route_gate::AuthDecision;
///
/// let decision = AuthDecision::deny("/login?redirect=%2Fadmin", "credential invalid");
/// assert!(decision.is_deny());
/// assert_eq!(decision.redirect_target(), Some("/login?redirect=%2Fadmin"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Let the navigation proceed.
    Allow,

    /// Block the navigation and send the visitor to `redirect`.
    Deny {
        /// Where to send the visitor instead.
        redirect: String,
        /// Diagnostic reason; logged, never shown to the visitor.
        reason: String,
    },
}

impl AuthDecision {
    /// Allow navigation.
    pub fn allow() -> Self {
        Self::Allow
    }

    /// Deny navigation with a redirect target and a diagnostic reason.
    pub fn deny(redirect: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Deny {
            redirect: redirect.into(),
            reason: reason.into(),
        }
    }

    /// Check if this decision allows navigation.
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Check if this decision denies navigation.
    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny { .. })
    }

    /// Redirect target of a deny decision.
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Deny { redirect, .. } => Some(redirect.as_str()),
            Self::Allow => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
