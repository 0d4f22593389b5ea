//! The allow/deny decision and the deny redirect.
//!
//! [`GateController::evaluate`] is a pure function of the path, the current
//! protected set, and the stored credential:
//!
//! ```text
//! Deny  ⇔  registry.matches(path)  ∧  ¬validator.is_valid(stored token)
//! ```
//!
//! [`GateController::redirect`] is the only side effect: it *replaces* the
//! current location (no extra history entry). It refuses to run while
//! another redirect is in progress and is a no-op when the visitor is
//! already at the target, so repeated or reentrant denials redirect once.

use crate::decision::AuthDecision;
use crate::history::HistoryBackend;
use crate::matching::{resolve_path_and_query, MatchMode};
use crate::policy::GatePolicy;
use crate::registry::RouteRegistry;
use crate::storage::TokenStore;
use crate::token::{TokenStatus, TokenValidator};
use crate::{debug_log, info_log, trace_log};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Clears the in-progress flag however the redirect exits.
struct RedirectGuard<'a>(&'a AtomicBool);

impl Drop for RedirectGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Orchestrates registry lookup, credential validation, and redirects.
pub struct GateController {
    policy: Arc<GatePolicy>,
    registry: Arc<RouteRegistry>,
    validator: TokenValidator,
    tokens: TokenStore,
    history: Arc<dyn HistoryBackend>,
    redirecting: AtomicBool,
}

impl GateController {
    pub fn new(
        policy: Arc<GatePolicy>,
        registry: Arc<RouteRegistry>,
        validator: TokenValidator,
        tokens: TokenStore,
        history: Arc<dyn HistoryBackend>,
    ) -> Self {
        Self {
            policy,
            registry,
            validator,
            tokens,
            history,
            redirecting: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> &Arc<GatePolicy> {
        &self.policy
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        &self.registry
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    pub fn history(&self) -> &Arc<dyn HistoryBackend> {
        &self.history
    }

    /// Whether the stored credential is currently usable.
    pub fn is_authenticated(&self) -> bool {
        self.validator.is_valid(self.tokens.read().as_deref())
    }

    /// Decide without side effects.
    pub fn evaluate(&self, path: &str) -> AuthDecision {
        if !self.registry.matches(path) {
            trace_log!("'{}' is not protected", path);
            return AuthDecision::Allow;
        }

        // Fail-closed protects everything; the login page and the deny
        // redirect's landing page must stay reachable.
        if self.registry.snapshot().protects_everything()
            && (MatchMode::Exact.matches(&self.policy.login_path, path)
                || MatchMode::Exact.matches(&self.policy.landing_path(), path))
        {
            return AuthDecision::Allow;
        }

        let status = self.validator.status(self.tokens.read().as_deref());
        if status.is_valid() {
            debug_log!("'{}' is protected; credential valid", path);
            return AuthDecision::Allow;
        }

        let reason = match status {
            TokenStatus::Absent => "no credential",
            TokenStatus::Malformed => "credential malformed",
            TokenStatus::Expired => "credential expired",
            TokenStatus::Valid => "credential valid",
        };
        debug_log!("'{}' is protected; {}", path, reason);
        AuthDecision::deny(self.policy.redirect_for(path), reason)
    }

    /// Decide, and on deny replace the location with the redirect target.
    pub fn authorize(&self, path: &str) -> AuthDecision {
        let decision = self.evaluate(path);
        if let AuthDecision::Deny { redirect, .. } = &decision {
            self.redirect(redirect);
        }
        decision
    }

    /// Replace the current location with `target`.
    ///
    /// Returns `false` when skipped: a redirect is already running, or the
    /// location already is `target`.
    pub fn redirect(&self, target: &str) -> bool {
        if self.redirecting.swap(true, Ordering::SeqCst) {
            debug_log!("Redirect to '{}' skipped: another redirect is running", target);
            return false;
        }
        let _guard = RedirectGuard(&self.redirecting);

        let current = self.history.location();
        if resolve_path_and_query(&current, &current) == resolve_path_and_query(&current, target) {
            debug_log!("Already at '{}', not redirecting", target);
            return false;
        }

        info_log!("Redirecting '{}' → '{}'", current, target);
        self.history.replace_state(target);
        true
    }

    /// Whether a redirect is running right now (reentrancy check).
    pub fn is_redirecting(&self) -> bool {
        self.redirecting.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for GateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateController")
            .field("registry", &self.registry)
            .field("tokens", &self.tokens)
            .field("redirecting", &self.is_redirecting())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{HistoryOp, MemoryHistory};
    use crate::storage::MemoryStore;
    use crate::token::FixedClock;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    fn token_expiring(at: DateTime<Utc>) -> String {
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, at.timestamp()));
        format!("eyJhbGciOiJIUzI1NiJ9.{payload}.sig")
    }

    fn gate(policy: GatePolicy, history: Arc<MemoryHistory>) -> GateController {
        let policy = Arc::new(policy);
        let registry = Arc::new(RouteRegistry::new(&policy, None));
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()), policy.storage_key.clone());
        let validator = TokenValidator::new(Arc::new(FixedClock::new(now())));
        GateController::new(policy, registry, validator, tokens, history)
    }

    #[test]
    fn test_unprotected_allows_without_credential() {
        let gate = gate(GatePolicy::new().protect("/dashboard"), Arc::new(MemoryHistory::default()));
        assert!(gate.evaluate("/about").is_allow());
        assert!(gate.evaluate("/").is_allow());
    }

    #[test]
    fn test_protected_without_credential_denies_with_encoded_target() {
        let gate = gate(GatePolicy::new().protect("/dashboard"), Arc::new(MemoryHistory::default()));
        let decision = gate.evaluate("/dashboard");
        assert_eq!(decision.redirect_target(), Some("/login?redirect=%2Fdashboard"));
    }

    #[test]
    fn test_decision_table() {
        let gate = gate(GatePolicy::new().protect("/app"), Arc::new(MemoryHistory::default()));
        let cases = [
            (None, "/app/x", false),
            (None, "/home", true),
            (Some(token_expiring(now() - Duration::seconds(1))), "/app", false),
            (Some(token_expiring(now() + Duration::hours(1))), "/app", true),
            (Some("junk".to_string()), "/app", false),
            (Some("junk".to_string()), "/public", true),
        ];
        for (token, path, allowed) in cases {
            match &token {
                Some(t) => gate.tokens().write(t),
                None => gate.tokens().clear(),
            }
            assert_eq!(gate.evaluate(path).is_allow(), allowed, "{token:?} {path}");
        }
    }

    #[test]
    fn test_authorize_replaces_location() {
        let history = Arc::new(MemoryHistory::new("/dashboard"));
        let gate = gate(GatePolicy::new().protect("/dashboard"), history.clone());
        assert!(gate.authorize("/dashboard").is_deny());
        assert_eq!(history.location(), "/login?redirect=%2Fdashboard");
        assert_eq!(history.len(), 1);
        assert_eq!(
            history.operations(),
            vec![HistoryOp::Replace("/login?redirect=%2Fdashboard".into())]
        );
    }

    #[test]
    fn test_repeated_authorize_redirects_once() {
        let history = Arc::new(MemoryHistory::new("/dashboard"));
        let gate = gate(GatePolicy::new().protect("/dashboard"), history.clone());
        gate.authorize("/dashboard");
        gate.authorize("/dashboard");
        assert_eq!(history.replace_count(), 1);
    }

    #[test]
    fn test_evaluate_has_no_side_effects() {
        let history = Arc::new(MemoryHistory::new("/dashboard"));
        let gate = gate(GatePolicy::new().protect("/dashboard"), history.clone());
        assert!(gate.evaluate("/dashboard").is_deny());
        assert!(history.operations().is_empty());
    }

    #[test]
    fn test_custom_template_and_login() {
        let gate = gate(
            GatePolicy::new()
                .protect("/admin")
                .login_path("/signin")
                .redirect_template(crate::RedirectTemplate::new("{login}?next={path}")),
            Arc::new(MemoryHistory::default()),
        );
        assert_eq!(
            gate.evaluate("/admin/users").redirect_target(),
            Some("/signin?next=%2Fadmin%2Fusers")
        );
    }

    #[test]
    fn test_fail_closed_keeps_redirect_landing_reachable() {
        let gate = gate(
            GatePolicy::new()
                .remote_routes("/api/protected-routes")
                .on_registry_failure(crate::RegistryFailurePolicy::FailClosed)
                .redirect_template(crate::RedirectTemplate::new("/auth/signin?next={path}")),
            Arc::new(MemoryHistory::default()),
        );
        assert!(pollster::block_on(gate.registry.load()).protects_everything());

        assert_eq!(
            gate.evaluate("/pricing").redirect_target(),
            Some("/auth/signin?next=%2Fpricing")
        );
        assert!(gate.evaluate("/auth/signin").is_allow());
        assert!(gate.evaluate("/login").is_allow());
        assert!(gate.evaluate("/auth/signin/other").is_deny());
    }
}
