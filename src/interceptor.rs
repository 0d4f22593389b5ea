//! Navigation interception.
//!
//! [`Interceptor`] is the single choke point every route change goes
//! through. The host wires its navigation primitives to the matching entry
//! point instead of patching globals:
//!
//! | Route change | Entry point |
//! |---|---|
//! | first page load | [`install`](Interceptor::install) |
//! | `history.pushState` / `replaceState` | [`push`](Interceptor::push) / [`replace`](Interceptor::replace) |
//! | back/forward (`popstate`) | [`pop_state`](Interceptor::pop_state) |
//! | route-transition data fetch | [`fetch`](Interceptor::fetch) / [`check_fetch`](Interceptor::check_fetch) |
//! | third-party router "set current route" | [`set_current_route`](Interceptor::set_current_route) |
//!
//! # Pipeline
//!
//! 1. **Reentrancy**: while the gate is replacing the location, initial-load
//!    and back/forward attempts pass through (`Passthrough`). Push, replace,
//!    fetch and hand-off are still checked; a deny drops them without a
//!    second redirect (`Blocked`).
//! 2. **Bootstrap**: under [`BootstrapPolicy::Buffer`] with the registry not
//!    yet ready, the attempt is parked (`Deferred`). One slot, last writer wins.
//! 3. **Hooks** in priority order; the gate hook is registered at build time.
//! 4. **Allow**: the delegate runs (`Committed`). **Deny**: the delegate is
//!    dropped and the location replaced (`Redirected`).
//!
//! Push, replace, fetch and route hand-off are vetoed before they happen.
//! Initial load and back/forward have already moved the location when they
//! are observed, so a deny there is a correcting redirect.
//!
//! # Example
//!
//! ```
//! use route_gate::{GatePolicy, Interceptor, MemoryHistory};
//! use route_gate::history::HistoryBackend;
//! use std::sync::Arc;
//!
//! let history = Arc::new(MemoryHistory::new("/"));
//! let interceptor = Interceptor::builder(GatePolicy::new().protect("/dashboard"))
//!     .history(history.clone())
//!     .build()
//!     .unwrap();
//! interceptor.install();
//!
//! let outcome = interceptor.push(Some("/dashboard"));
//! assert_eq!(outcome.redirect_path(), Some("/login?redirect=%2Fdashboard"));
//! assert_eq!(history.location(), "/login?redirect=%2Fdashboard");
//! ```

use crate::decision::{AuthDecision, EntryPoint, NavigationRequest};
use crate::error::{GateError, NavigationOutcome};
use crate::gate::GateController;
use crate::history::{HistoryBackend, MemoryHistory};
use crate::hooks::{GateHook, HookChain, NavigationHook};
use crate::matching::resolve_path;
use crate::policy::{BootstrapPolicy, GatePolicy};
use crate::registry::{RegistryState, RouteRegistry};
use crate::session::AuthClient;
use crate::storage::{KeyValueStore, MemoryStore, TokenStore};
use crate::token::{Clock, SystemClock, TokenValidator};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::{debug_log, info_log, trace_log, warn_log};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Delegate
// ============================================================================

/// The operation an attempt performs once allowed.
enum Delegate {
    /// The location has already changed (initial load, back/forward).
    Applied,
    Push(String),
    Replace(String),
    Handoff(Box<dyn FnOnce() + Send>),
}

impl Delegate {
    fn run(self, history: &dyn HistoryBackend) {
        match self {
            Self::Applied => {}
            Self::Push(url) => history.push_state(&url),
            Self::Replace(url) => history.replace_state(&url),
            Self::Handoff(apply) => apply(),
        }
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("Applied"),
            Self::Push(url) => f.debug_tuple("Push").field(url).finish(),
            Self::Replace(url) => f.debug_tuple("Replace").field(url).finish(),
            Self::Handoff(_) => f.write_str("Handoff(..)"),
        }
    }
}

/// An attempt parked until the registry is ready.
#[derive(Debug)]
struct PendingNavigation {
    request: NavigationRequest,
    delegate: Delegate,
}

// ============================================================================
// InterceptorBuilder
// ============================================================================

/// Assembles an [`Interceptor`] from a policy and host capabilities.
///
/// Anything not supplied gets an in-memory default: [`MemoryHistory`] at
/// `/`, [`MemoryStore`], [`SystemClock`], and no transport (a remote route
/// source then resolves through the failure policy).
pub struct InterceptorBuilder {
    policy: GatePolicy,
    history: Option<Arc<dyn HistoryBackend>>,
    store: Option<Arc<dyn KeyValueStore>>,
    transport: Option<Arc<dyn Transport>>,
    clock: Option<Arc<dyn Clock>>,
    hooks: HookChain,
}

impl InterceptorBuilder {
    pub fn history(mut self, history: Arc<dyn HistoryBackend>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Transport for the remote route list.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Register an extra pre-navigation hook.
    pub fn hook<H: NavigationHook>(mut self, hook: H) -> Self {
        self.hooks.register(hook);
        self
    }

    /// Validate the policy and assemble the interceptor.
    pub fn build(self) -> Result<Interceptor, GateError> {
        self.policy.validate()?;
        let policy = Arc::new(self.policy);

        let history = self
            .history
            .unwrap_or_else(|| Arc::new(MemoryHistory::default()));
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let registry = Arc::new(RouteRegistry::new(&policy, self.transport));
        let tokens = TokenStore::new(store, policy.storage_key.clone());
        let gate = Arc::new(GateController::new(
            Arc::clone(&policy),
            registry,
            TokenValidator::new(clock),
            tokens,
            history,
        ));

        let mut hooks = self.hooks;
        hooks.register(GateHook::new(Arc::clone(&gate)));
        debug_log!("Interceptor built with hooks {:?}", hooks.names());

        Ok(Interceptor {
            gate,
            hooks: RwLock::new(hooks),
            routes: RwLock::new(HashMap::new()),
            pending: Mutex::new(None),
            navigation_id: AtomicUsize::new(0),
            installed: AtomicBool::new(false),
        })
    }
}

// ============================================================================
// Interceptor
// ============================================================================

/// Funnels every route change through the hook chain.
pub struct Interceptor {
    gate: Arc<GateController>,
    hooks: RwLock<HookChain>,
    /// Route id → path, for third-party router hand-offs.
    routes: RwLock<HashMap<String, String>>,
    pending: Mutex<Option<PendingNavigation>>,
    navigation_id: AtomicUsize,
    installed: AtomicBool,
}

impl Interceptor {
    pub fn builder(policy: GatePolicy) -> InterceptorBuilder {
        InterceptorBuilder {
            policy,
            history: None,
            store: None,
            transport: None,
            clock: None,
            hooks: HookChain::new(),
        }
    }

    pub fn gate(&self) -> &Arc<GateController> {
        &self.gate
    }

    pub fn registry(&self) -> &Arc<RouteRegistry> {
        self.gate.registry()
    }

    pub fn policy(&self) -> &GatePolicy {
        self.gate.policy()
    }

    pub fn history(&self) -> &Arc<dyn HistoryBackend> {
        self.gate.history()
    }

    pub fn tokens(&self) -> &TokenStore {
        self.gate.tokens()
    }

    /// Login/signup/logout client sharing this gate's storage and history.
    pub fn auth_client(&self, transport: Arc<dyn Transport>) -> AuthClient {
        AuthClient::new(
            transport,
            self.tokens().clone(),
            Arc::clone(self.history()),
            Arc::clone(self.gate.policy()),
        )
        .with_validator(self.gate.validator().clone())
    }

    /// Add a pre-navigation hook. Returns `false` if the name is taken.
    pub fn add_hook<H: NavigationHook>(&self, hook: H) -> bool {
        self.hooks.write().register(hook)
    }

    pub fn hook_names(&self) -> Vec<&'static str> {
        self.hooks.read().names()
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    /// Whether an attempt is parked waiting for the registry.
    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// Whether the remote route list has not started loading yet.
    ///
    /// Until [`bootstrap`](Self::bootstrap) runs, a remote registry protects
    /// nothing.
    pub fn needs_bootstrap(&self) -> bool {
        self.registry().state() == RegistryState::Uninitialized
    }

    /// Id of the most recent navigation attempt (0 before any).
    pub fn last_navigation_id(&self) -> usize {
        self.navigation_id.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // Entry points
    // ------------------------------------------------------------------------

    /// Check the location the page was loaded at.
    ///
    /// Only the first call does anything; later calls return `None`.
    ///
    /// This does not load a remote route list. The host must also drive
    /// [`bootstrap`](Self::bootstrap), before or alongside `install`;
    /// until then nothing is protected.
    pub fn install(&self) -> Option<NavigationOutcome> {
        if self.installed.swap(true, Ordering::SeqCst) {
            debug_log!("Interceptor already installed, ignoring");
            return None;
        }
        info_log!(
            "Interceptor installed (registry {}, bootstrap {:?})",
            self.registry().state(),
            self.policy().bootstrap
        );
        if self.needs_bootstrap() {
            warn_log!("Remote route list not loading yet; call bootstrap() or nothing is protected");
        }
        let request = self.request(EntryPoint::InitialLoad, None);
        Some(self.navigate(request, Delegate::Applied))
    }

    /// Programmatic `pushState`. `None` pushes the current location again.
    pub fn push(&self, target: Option<&str>) -> NavigationOutcome {
        let request = self.request(EntryPoint::Push, target);
        let url = request.to.clone();
        self.navigate(request, Delegate::Push(url))
    }

    /// Programmatic `replaceState`. `None` replaces with the current location.
    pub fn replace(&self, target: Option<&str>) -> NavigationOutcome {
        let request = self.request(EntryPoint::Replace, target);
        let url = request.to.clone();
        self.navigate(request, Delegate::Replace(url))
    }

    /// Back/forward, called after the history backend moved.
    pub fn pop_state(&self) -> NavigationOutcome {
        let request = self.request(EntryPoint::PopState, None);
        self.navigate(request, Delegate::Applied)
    }

    /// Map a third-party router's route id to its path.
    pub fn register_route(&self, id: impl Into<String>, path: impl Into<String>) {
        let (id, path) = (id.into(), path.into());
        trace_log!("Registered route '{}' → '{}'", id, path);
        self.routes.write().insert(id, path);
    }

    /// A third-party router is about to make `id` the current route; `apply`
    /// performs the switch and runs only if the route is allowed.
    ///
    /// An unregistered id is checked against the current location.
    pub fn set_current_route<F>(&self, id: &str, apply: F) -> NavigationOutcome
    where
        F: FnOnce() + Send + 'static,
    {
        let path = self.routes.read().get(id).cloned();
        if path.is_none() {
            debug_log!("Route id '{}' is not registered; using current location", id);
        }
        let request = self.request(EntryPoint::RouteHandoff, path.as_deref());
        self.navigate(request, Delegate::Handoff(Box::new(apply)))
    }

    /// Synchronous check for a route-transition fetch of `url`.
    ///
    /// On deny the location is replaced and `Unauthorized` returned; the
    /// caller must not send the request. Does not wait for the registry.
    pub fn check_fetch(&self, url: &str) -> Result<(), GateError> {
        let request = self.request(EntryPoint::Fetch, Some(url));
        match self.decide(&request) {
            AuthDecision::Allow => Ok(()),
            AuthDecision::Deny { redirect, reason } if self.gate.is_redirecting() => {
                warn_log!(
                    "Fetch #{} '{}' denied during a redirect: {}",
                    request.id,
                    request.path,
                    reason
                );
                Err(GateError::Unauthorized { redirect })
            }
            AuthDecision::Deny { redirect, reason } => {
                info_log!("Fetch #{} '{}' denied: {}", request.id, request.path, reason);
                self.gate.redirect(&redirect);
                Err(GateError::Unauthorized { redirect })
            }
        }
    }

    /// Gated fetch: check the request URL, then send it through `transport`.
    ///
    /// Under [`BootstrapPolicy::Buffer`] this first waits for the registry.
    pub async fn fetch(
        &self,
        transport: &dyn Transport,
        request: HttpRequest,
    ) -> Result<HttpResponse, GateError> {
        if self.buffering() && !self.registry().is_ready() {
            debug_log!("Fetch '{}' waiting for the route registry", request.url);
            self.bootstrap().await;
        }
        self.check_fetch(&request.url)?;
        Ok(transport.send(request).await?)
    }

    /// Load the route registry, then settle any parked attempt.
    ///
    /// Safe to call more than once and from several tasks: the registry
    /// fetches once, and a parked attempt is settled by exactly one caller.
    pub async fn bootstrap(&self) -> Option<NavigationOutcome> {
        let registry = self.registry();
        registry.load().await;
        registry.wait_ready().await;

        let pending = self.pending.lock().take()?;
        let PendingNavigation {
            mut request,
            delegate,
        } = pending;
        if request.entry.is_applied_before_check() {
            // The visitor may have moved since the attempt was parked.
            request.path = resolve_path(&self.history().location(), None);
        }
        debug_log!(
            "Settling parked {} #{} '{}'",
            request.entry,
            request.id,
            request.path
        );
        Some(self.settle(request, delegate))
    }

    // ------------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------------

    fn buffering(&self) -> bool {
        self.policy().bootstrap == BootstrapPolicy::Buffer
    }

    fn request(&self, entry: EntryPoint, target: Option<&str>) -> NavigationRequest {
        let id = self.navigation_id.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.history().location();
        let path = resolve_path(&current, target);
        let to = target.map_or_else(|| current.clone(), str::to_string);
        NavigationRequest::new(entry, path)
            .with_target(to)
            .with_from(current)
            .with_id(id)
    }

    fn decide(&self, request: &NavigationRequest) -> AuthDecision {
        let decision = self.hooks.read().check(request);
        debug_log!(
            "{} #{} '{}' → {}",
            request.entry,
            request.id,
            request.path,
            if decision.is_allow() { "allow" } else { "deny" }
        );
        decision
    }

    fn navigate(&self, request: NavigationRequest, delegate: Delegate) -> NavigationOutcome {
        if self.gate.is_redirecting() {
            return self.reenter(request, delegate);
        }

        if self.buffering() && !self.registry().is_ready() {
            let path = request.path.clone();
            let previous = self
                .pending
                .lock()
                .replace(PendingNavigation { request, delegate });
            if let Some(previous) = previous {
                debug_log!(
                    "Parked #{} '{}' superseded",
                    previous.request.id,
                    previous.request.path
                );
            }
            debug_log!("Registry {}; parked '{}'", self.registry().state(), path);
            return NavigationOutcome::Deferred { path };
        }

        self.settle(request, delegate)
    }

    /// An attempt made from inside a redirect, usually a history backend
    /// calling back in. A deny never starts a second redirect.
    fn reenter(&self, request: NavigationRequest, delegate: Delegate) -> NavigationOutcome {
        if matches!(delegate, Delegate::Applied) {
            debug_log!(
                "{} #{} '{}' arrived during a redirect, passing through",
                request.entry,
                request.id,
                request.path
            );
            return NavigationOutcome::Passthrough { path: request.path };
        }
        match self.decide(&request) {
            AuthDecision::Allow => {
                delegate.run(self.history().as_ref());
                NavigationOutcome::Committed { path: request.path }
            }
            AuthDecision::Deny { redirect, reason } => {
                warn_log!(
                    "{} #{} '{}' denied during a redirect: {}",
                    request.entry,
                    request.id,
                    request.path,
                    reason
                );
                NavigationOutcome::Blocked {
                    path: request.path,
                    redirect,
                }
            }
        }
    }

    fn settle(&self, request: NavigationRequest, delegate: Delegate) -> NavigationOutcome {
        match self.decide(&request) {
            AuthDecision::Allow => {
                delegate.run(self.history().as_ref());
                NavigationOutcome::Committed { path: request.path }
            }
            AuthDecision::Deny { redirect, reason } => {
                info_log!(
                    "{} #{} '{}' denied: {}",
                    request.entry,
                    request.id,
                    request.path,
                    reason
                );
                self.gate.redirect(&redirect);
                NavigationOutcome::Redirected {
                    from: request.path,
                    to: redirect,
                }
            }
        }
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("gate", &self.gate)
            .field("hooks", &*self.hooks.read())
            .field("installed", &self.is_installed())
            .field("pending", &self.has_pending())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
