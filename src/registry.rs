//! Protected route registry.
//!
//! The registry owns the [`ProtectedRouteSet`] and its load state machine:
//!
//! ```text
//! Uninitialized ──load()──▶ Loading ──fetch settles──▶ Ready
//! ```
//!
//! A static source starts (and stays) `Ready`. A remote source is fetched at
//! most once per registry; a failed fetch is never retried and resolves to
//! the set chosen by [`RegistryFailurePolicy`]. A load whose future is
//! dropped before the fetch settles counts as failed. Until the registry is
//! `Ready`, [`matches`](RouteRegistry::matches) answers against the empty set,
//! which is the bootstrap window the interceptor's buffering policy closes.

use crate::error::TransportError;
use crate::matching::MatchMode;
use crate::policy::{GatePolicy, RegistryFailurePolicy, RouteSource};
use crate::transport::{HttpRequest, Transport};
use crate::{debug_log, info_log, warn_log};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

#[cfg(feature = "cache")]
use crate::cache::{CacheStats, MatchCache};
#[cfg(feature = "cache")]
use parking_lot::Mutex;

// ============================================================================
// ProtectedRouteSet
// ============================================================================

/// Immutable set of protected entries.
///
/// # Example
///
/// ```
/// use route_gate::{MatchMode, ProtectedRouteSet};
///
/// let set = ProtectedRouteSet::new(["/dashboard", " /admin ", ""]);
/// assert_eq!(set.entries(), ["/dashboard", "/admin"]);
/// assert!(set.matches(MatchMode::Prefix, "/admin/users"));
/// assert!(!set.matches(MatchMode::Prefix, "/about"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtectedRouteSet {
    entries: Vec<String>,
    everything: bool,
}

impl ProtectedRouteSet {
    /// Build a set; entries are trimmed, blanks and duplicates dropped.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if !entry.is_empty() && !out.iter().any(|e| e == entry) {
                out.push(entry.to_string());
            }
        }
        Self {
            entries: out,
            everything: false,
        }
    }

    /// Nothing protected.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every path protected (fail-closed).
    pub fn everything() -> Self {
        Self {
            entries: Vec::new(),
            everything: true,
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        !self.everything && self.entries.is_empty()
    }

    pub fn protects_everything(&self) -> bool {
        self.everything
    }

    pub fn matches(&self, mode: MatchMode, path: &str) -> bool {
        self.everything || self.entries.iter().any(|entry| mode.matches(entry, path))
    }
}

// ============================================================================
// RegistryState
// ============================================================================

/// Load state of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    Uninitialized,
    Loading,
    Ready,
}

impl fmt::Display for RegistryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Loading => f.write_str("loading"),
            Self::Ready => f.write_str("ready"),
        }
    }
}

// ============================================================================
// RouteRegistry
// ============================================================================

/// Holds the protected set and loads it from its source.
pub struct RouteRegistry {
    source: RouteSource,
    mode: MatchMode,
    on_failure: RegistryFailurePolicy,
    transport: Option<Arc<dyn Transport>>,
    set: RwLock<Arc<ProtectedRouteSet>>,
    state: watch::Sender<RegistryState>,
    #[cfg(feature = "cache")]
    cache: Mutex<MatchCache>,
}

impl RouteRegistry {
    /// Registry for `policy`. A remote source needs a transport; without
    /// one its load fails and the failure policy applies.
    pub fn new(policy: &GatePolicy, transport: Option<Arc<dyn Transport>>) -> Self {
        let (set, state) = match policy.route_source {
            RouteSource::Static => (
                ProtectedRouteSet::new(&policy.protected_prefixes),
                RegistryState::Ready,
            ),
            RouteSource::Remote { .. } => (ProtectedRouteSet::empty(), RegistryState::Uninitialized),
        };
        let (state, _) = watch::channel(state);
        Self {
            source: policy.route_source.clone(),
            mode: policy.match_mode,
            on_failure: policy.on_registry_failure,
            transport,
            set: RwLock::new(Arc::new(set)),
            state,
            #[cfg(feature = "cache")]
            cache: Mutex::new(MatchCache::new()),
        }
    }

    /// Ready registry over a fixed list.
    pub fn fixed<I, S>(entries: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let policy = GatePolicy::new().match_mode(mode);
        let registry = Self::new(&policy, None);
        registry.install(ProtectedRouteSet::new(entries));
        registry
    }

    pub fn state(&self) -> RegistryState {
        *self.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == RegistryState::Ready
    }

    pub fn match_mode(&self) -> MatchMode {
        self.mode
    }

    /// Current set; empty before a remote load completes.
    pub fn snapshot(&self) -> Arc<ProtectedRouteSet> {
        Arc::clone(&self.set.read())
    }

    /// Whether `path` is protected by the current set.
    #[cfg(feature = "cache")]
    pub fn matches(&self, path: &str) -> bool {
        let mut cache = self.cache.lock();
        if let Some(protected) = cache.get(path) {
            return protected;
        }
        let protected = self.snapshot().matches(self.mode, path);
        cache.insert(path.to_string(), protected);
        protected
    }

    /// Whether `path` is protected by the current set.
    #[cfg(not(feature = "cache"))]
    pub fn matches(&self, path: &str) -> bool {
        self.snapshot().matches(self.mode, path)
    }

    /// Load the set from its source and move to `Ready`.
    ///
    /// Never fails: a remote failure resolves to the failure policy's set.
    /// Only the first call on a remote registry fetches; any later or
    /// concurrent call returns the current set.
    pub async fn load(&self) -> Arc<ProtectedRouteSet> {
        let endpoint = match &self.source {
            RouteSource::Static => return self.snapshot(),
            RouteSource::Remote { endpoint } => endpoint.clone(),
        };

        let claimed = self.state.send_if_modified(|state| {
            if *state == RegistryState::Uninitialized {
                *state = RegistryState::Loading;
                true
            } else {
                false
            }
        });
        if !claimed {
            debug_log!("Route list load already {}, not fetching again", self.state());
            return self.snapshot();
        }

        let mut guard = LoadGuard {
            registry: self,
            settled: false,
        };
        info_log!("Loading protected routes from '{}'", endpoint);
        let fetched = self.fetch(&endpoint).await;
        guard.settled = true;

        let set = match fetched {
            Ok(set) => {
                info_log!("Loaded {} protected route(s)", set.entries().len());
                set
            }
            Err(reason) => {
                warn_log!(
                    "Protected route load failed ({}); applying {:?}",
                    reason,
                    self.on_failure
                );
                self.failure_set()
            }
        };
        self.install(set)
    }

    /// Resolve once the registry is `Ready`.
    ///
    /// For a remote registry this waits for a [`load`](Self::load) that
    /// someone else drives; it does not start one.
    pub async fn wait_ready(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|state| *state == RegistryState::Ready).await;
    }

    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats().clone()
    }

    async fn fetch(&self, endpoint: &str) -> Result<ProtectedRouteSet, String> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| "no transport configured".to_string())?;
        let response = transport
            .send(HttpRequest::get(endpoint))
            .await
            .map_err(|e: TransportError| e.to_string())?;
        if !response.is_success() {
            return Err(format!("status {}", response.status));
        }
        let entries: Vec<String> = response
            .json()
            .map_err(|e| format!("unparseable body: {e}"))?;
        Ok(ProtectedRouteSet::new(entries))
    }

    fn failure_set(&self) -> ProtectedRouteSet {
        match self.on_failure {
            RegistryFailurePolicy::FailOpen => ProtectedRouteSet::empty(),
            RegistryFailurePolicy::FailClosed => ProtectedRouteSet::everything(),
        }
    }

    fn install(&self, set: ProtectedRouteSet) -> Arc<ProtectedRouteSet> {
        let set = Arc::new(set);
        {
            #[cfg(feature = "cache")]
            let mut cache = self.cache.lock();
            *self.set.write() = Arc::clone(&set);
            #[cfg(feature = "cache")]
            cache.clear();
        }
        self.state.send_replace(RegistryState::Ready);
        set
    }
}

/// Settles a claimed load whose future was dropped mid-fetch, so waiters on
/// `Ready` are released and the fetch is not retried.
struct LoadGuard<'a> {
    registry: &'a RouteRegistry,
    settled: bool,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn_log!(
            "Protected route load cancelled; applying {:?}",
            self.registry.on_failure
        );
        self.registry.install(self.registry.failure_set());
    }
}

impl fmt::Debug for RouteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRegistry")
            .field("source", &self.source)
            .field("mode", &self.mode)
            .field("state", &self.state())
            .field("set", &self.snapshot())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpResponse;
    use async_trait::async_trait;

    struct Canned(Result<HttpResponse, TransportError>);

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.0.clone()
        }
    }

    fn remote(response: Result<HttpResponse, TransportError>) -> RouteRegistry {
        RouteRegistry::new(
            &GatePolicy::new().remote_routes("/api/protected-routes"),
            Some(Arc::new(Canned(response))),
        )
    }

    #[test]
    fn test_static_is_ready_immediately() {
        let registry = RouteRegistry::new(&GatePolicy::new().protect("/dashboard"), None);
        assert_eq!(registry.state(), RegistryState::Ready);
        assert!(registry.matches("/dashboard/x"));
        assert!(!registry.matches("/"));
    }

    #[test]
    fn test_remote_matches_nothing_before_load() {
        let registry = remote(Ok(HttpResponse::new(200, r#"["/dashboard"]"#)));
        assert_eq!(registry.state(), RegistryState::Uninitialized);
        assert!(!registry.matches("/dashboard"));
    }

    #[test]
    fn test_remote_load_success() {
        let registry = remote(Ok(HttpResponse::new(200, r#"["/dashboard","/admin"]"#)));
        let set = pollster::block_on(registry.load());
        assert_eq!(set.entries(), ["/dashboard", "/admin"]);
        assert!(registry.is_ready());
        assert!(registry.matches("/dashboard"));
    }

    #[test]
    fn test_remote_load_failures_are_empty() {
        for response in [
            Err(TransportError::Network("offline".into())),
            Ok(HttpResponse::new(500, r#"["/dashboard"]"#)),
            Ok(HttpResponse::new(200, "<html>")),
            Ok(HttpResponse::new(200, r#"{"routes":["/dashboard"]}"#)),
        ] {
            let registry = remote(response);
            let set = pollster::block_on(registry.load());
            assert!(set.is_empty());
            assert!(registry.is_ready());
            assert!(!registry.matches("/dashboard"));
        }
    }

    #[test]
    fn test_fail_closed_protects_everything() {
        let registry = RouteRegistry::new(
            &GatePolicy::new()
                .remote_routes("/api/protected-routes")
                .on_registry_failure(RegistryFailurePolicy::FailClosed),
            Some(Arc::new(Canned(Err(TransportError::Network("x".into()))))),
        );
        let set = pollster::block_on(registry.load());
        assert!(set.protects_everything());
        assert!(registry.matches("/anything"));
    }

    #[test]
    fn test_remote_without_transport_fails_open() {
        let registry = RouteRegistry::new(&GatePolicy::new().remote_routes("/routes"), None);
        let set = pollster::block_on(registry.load());
        assert!(set.is_empty());
        assert!(registry.is_ready());
    }

    #[test]
    fn test_load_happens_once() {
        let registry = remote(Ok(HttpResponse::new(200, r#"["/a"]"#)));
        pollster::block_on(registry.load());
        let again = pollster::block_on(registry.load());
        assert_eq!(again.entries(), ["/a"]);
    }

    struct Stalled;

    #[async_trait]
    impl Transport for Stalled {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            std::future::pending::<Result<HttpResponse, TransportError>>().await
        }
    }

    #[tokio::test]
    async fn test_cancelled_load_settles_with_failure_policy() {
        let registry = RouteRegistry::new(
            &GatePolicy::new()
                .remote_routes("/api/protected-routes")
                .on_registry_failure(RegistryFailurePolicy::FailClosed),
            Some(Arc::new(Stalled)),
        );

        let cancelled =
            tokio::time::timeout(std::time::Duration::from_millis(10), registry.load()).await;
        assert!(cancelled.is_err());

        assert!(registry.is_ready());
        assert!(registry.snapshot().protects_everything());
        // Already settled: neither waits nor fetches again.
        registry.wait_ready().await;
        assert!(registry.load().await.protects_everything());
    }

    #[test]
    fn test_exact_mode() {
        let registry = RouteRegistry::fixed(["/admin"], MatchMode::Exact);
        assert!(registry.matches("/admin"));
        assert!(!registry.matches("/admin/users"));
    }

    #[cfg(feature = "cache")]
    #[test]
    fn test_cache_is_invalidated_on_load() {
        let registry = remote(Ok(HttpResponse::new(200, r#"["/dashboard"]"#)));
        assert!(!registry.matches("/dashboard"));
        assert!(!registry.matches("/dashboard"));
        assert_eq!(registry.cache_stats().hits, 1);

        pollster::block_on(registry.load());
        assert!(registry.matches("/dashboard"));
        assert_eq!(registry.cache_stats().invalidations, 1);
    }
}
