//! Pre-navigation hooks.
//!
//! Every navigation attempt runs through an ordered [`HookChain`] before the
//! underlying operation is allowed to happen. A hook inspects the
//! [`NavigationRequest`] and answers with an [`AuthDecision`].
//!
//! All hook methods are **synchronous**: a veto has to be decided before the
//! push/replace it guards returns.
//!
//! # Execution order
//!
//! Hooks run in **priority order** (higher value first; registration order
//! breaks ties). The first `Deny` short-circuits the chain. The built-in
//! [`GateHook`] runs at priority 100.
//!
//! # Idempotent registration
//!
//! Hooks are keyed by [`name`](NavigationHook::name). Registering a second
//! hook under a name already present is a no-op, which is what makes
//! installing the gate twice equivalent to installing it once.
//!
//! # Example
//!
//! ```
//! use route_gate::{hook_fn, AuthDecision, EntryPoint, HookChain, NavigationRequest};
//!
//! let mut chain = HookChain::new();
//! chain.register(hook_fn("maintenance", |request| {
//!     if request.path.starts_with("/billing") {
//!         AuthDecision::deny("/maintenance", "billing is down")
//!     } else {
//!         AuthDecision::Allow
//!     }
//! }));
//!
//! let request = NavigationRequest::new(EntryPoint::Push, "/billing/invoices");
//! assert_eq!(chain.check(&request).redirect_target(), Some("/maintenance"));
//! ```

use crate::decision::{AuthDecision, NavigationRequest};
use crate::gate::GateController;
use crate::{debug_log, trace_log};
use std::sync::Arc;

// ============================================================================
// NavigationHook trait
// ============================================================================

/// A check that runs before navigation proceeds.
pub trait NavigationHook: Send + Sync + 'static {
    /// Decide on a navigation attempt.
    fn check(&self, request: &NavigationRequest) -> AuthDecision;

    /// Identity used for de-duplication and logs.
    fn name(&self) -> &'static str {
        "NavigationHook"
    }

    /// Higher runs first. Default is 0.
    fn priority(&self) -> i32 {
        0
    }
}

// ============================================================================
// hook_fn helper
// ============================================================================

/// Create a named hook from a closure.
pub const fn hook_fn<F>(name: &'static str, f: F) -> FnHook<F>
where
    F: Fn(&NavigationRequest) -> AuthDecision + Send + Sync + 'static,
{
    FnHook {
        name,
        priority: 0,
        f,
    }
}

/// Hook created from a closure via [`hook_fn`].
pub struct FnHook<F> {
    name: &'static str,
    priority: i32,
    f: F,
}

impl<F> FnHook<F> {
    /// Set the execution priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl<F> NavigationHook for FnHook<F>
where
    F: Fn(&NavigationRequest) -> AuthDecision + Send + Sync + 'static,
{
    fn check(&self, request: &NavigationRequest) -> AuthDecision {
        (self.f)(request)
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

// ============================================================================
// GateHook
// ============================================================================

/// The protected-path/credential check as a hook.
///
/// Uses [`GateController::evaluate`]; the interceptor performs the redirect
/// once the whole chain has answered.
pub struct GateHook {
    gate: Arc<GateController>,
}

impl GateHook {
    pub const NAME: &'static str = "GateHook";

    pub fn new(gate: Arc<GateController>) -> Self {
        Self { gate }
    }
}

impl NavigationHook for GateHook {
    fn check(&self, request: &NavigationRequest) -> AuthDecision {
        self.gate.evaluate(&request.path)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        100
    }
}

// ============================================================================
// HookChain
// ============================================================================

/// Ordered, de-duplicated list of hooks.
#[derive(Default)]
pub struct HookChain {
    hooks: Vec<Box<dyn NavigationHook>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook. Returns `false` (and drops `hook`) if a hook with the same
    /// name is already registered.
    pub fn register<H: NavigationHook>(&mut self, hook: H) -> bool {
        if self.contains(hook.name()) {
            debug_log!("Hook '{}' already registered, ignoring", hook.name());
            return false;
        }
        let priority = hook.priority();
        // Insert after every hook of equal or higher priority.
        let index = self
            .hooks
            .iter()
            .position(|h| h.priority() < priority)
            .unwrap_or(self.hooks.len());
        self.hooks.insert(index, Box::new(hook));
        true
    }

    /// Remove a hook by name. Returns whether one was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|h| h.name() != name);
        before != self.hooks.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.iter().any(|h| h.name() == name)
    }

    /// Names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run hooks in order; the first deny wins.
    pub fn check(&self, request: &NavigationRequest) -> AuthDecision {
        for hook in &self.hooks {
            let decision = hook.check(request);
            trace_log!(
                "Hook '{}' (priority {}) on #{} '{}' → {:?}",
                hook.name(),
                hook.priority(),
                request.id,
                request.path,
                decision
            );
            if decision.is_deny() {
                return decision;
            }
        }
        AuthDecision::Allow
    }
}

impl std::fmt::Debug for HookChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookChain")
            .field("hooks", &self.names())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::EntryPoint;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request(path: &str) -> NavigationRequest {
        NavigationRequest::new(EntryPoint::Push, path)
    }

    #[test]
    fn test_empty_chain_allows() {
        let chain = HookChain::new();
        assert!(chain.check(&request("/x")).is_allow());
    }

    #[test]
    fn test_hook_fn_defaults() {
        let hook = hook_fn("noop", |_| AuthDecision::Allow);
        assert_eq!(hook.name(), "noop");
        assert_eq!(hook.priority(), 0);
        assert_eq!(hook.with_priority(5).priority(), 5);
    }

    #[test]
    fn test_duplicate_names_are_ignored() {
        let mut chain = HookChain::new();
        assert!(chain.register(hook_fn("a", |_| AuthDecision::Allow)));
        assert!(!chain.register(hook_fn("a", |_| AuthDecision::deny("/x", "dup"))));
        assert_eq!(chain.len(), 1);
        assert!(chain.check(&request("/")).is_allow());
    }

    #[test]
    fn test_priority_order_first_deny_wins() {
        let mut chain = HookChain::new();
        chain.register(hook_fn("low", |_| AuthDecision::deny("/low", "low")).with_priority(1));
        chain.register(hook_fn("high", |_| AuthDecision::deny("/high", "high")).with_priority(10));
        assert_eq!(chain.names(), vec!["high", "low"]);
        assert_eq!(chain.check(&request("/")).redirect_target(), Some("/high"));
    }

    #[test]
    fn test_equal_priority_keeps_registration_order() {
        let mut chain = HookChain::new();
        chain.register(hook_fn("first", |_| AuthDecision::Allow));
        chain.register(hook_fn("second", |_| AuthDecision::Allow));
        chain.register(hook_fn("third", |_| AuthDecision::Allow));
        assert_eq!(chain.names(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_short_circuit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut chain = HookChain::new();
        chain.register(hook_fn("deny", |_| AuthDecision::deny("/x", "no")).with_priority(2));
        chain.register(hook_fn("count", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            AuthDecision::Allow
        }));
        assert!(chain.check(&request("/")).is_deny());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove() {
        let mut chain = HookChain::new();
        chain.register(hook_fn("a", |_| AuthDecision::Allow));
        assert!(chain.remove("a"));
        assert!(!chain.remove("a"));
        assert!(chain.is_empty());
    }
}
