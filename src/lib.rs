//! Client-side access gate for single-page applications.
//!
//! `route-gate` decides, for every change of the visible route, whether the
//! destination is protected and whether the visitor holds a usable
//! credential. A denied visitor is sent to the login page with the original
//! path in a `redirect` query parameter; the protected page never renders.
//!
//! This is an access barrier, not authentication: credentials are decoded
//! but **never signature-checked**. Real authorization must still happen on
//! the server.
//!
//! # Components
//!
//! - [`Interceptor`] — the entry points (initial load, push/replace,
//!   back/forward, route fetches, router hand-offs) and the hook pipeline.
//! - [`GateController`] — the allow/deny decision and the redirect.
//! - [`RouteRegistry`] — protected prefixes, static or fetched once.
//! - [`TokenValidator`] — expiry check on the stored credential.
//! - [`AuthClient`] — login, signup and logout.
//! - [`GatePolicy`] — the whole configuration, buildable or JSON.
//!
//! The host supplies its primitives through traits: [`HistoryBackend`],
//! [`KeyValueStore`], [`Transport`] and [`Clock`]. In-memory versions ship
//! with the crate.
//!
//! # Quick start
//!
//! ```
//! use route_gate::{GatePolicy, Interceptor, MemoryHistory, NavigationOutcome};
//! use std::sync::Arc;
//!
//! let history = Arc::new(MemoryHistory::new("/"));
//! let interceptor = Interceptor::builder(
//!     GatePolicy::new().protect_all(["/dashboard", "/settings"]),
//! )
//! .history(history.clone())
//! .build()
//! .unwrap();
//!
//! interceptor.install();
//!
//! assert!(interceptor.push(Some("/pricing")).is_committed());
//! assert_eq!(
//!     interceptor.push(Some("/settings/billing")),
//!     NavigationOutcome::Redirected {
//!         from: "/settings/billing".into(),
//!         to: "/login?redirect=%2Fsettings%2Fbilling".into(),
//!     }
//! );
//! ```
//!
//! # Features
//!
//! | Feature   | Default | Enables |
//! |-----------|---------|---------|
//! | `log`     | yes     | logging through the `log` crate |
//! | `tracing` | no      | logging through the `tracing` crate |
//! | `cache`   | yes     | LRU memo of path classification |
//! | `http`    | no      | [`HttpTransport`](transport::HttpTransport) on `reqwest` |

#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(all(feature = "log", feature = "tracing"))]
compile_error!("features `log` and `tracing` are mutually exclusive; enable only one");

pub mod logging;

#[cfg(feature = "cache")]
pub mod cache;
pub mod decision;
pub mod error;
pub mod gate;
pub mod history;
pub mod hooks;
pub mod interceptor;
pub mod matching;
pub mod params;
pub mod policy;
pub mod registry;
pub mod session;
pub mod storage;
pub mod token;
pub mod transport;

pub use decision::{AuthDecision, EntryPoint, NavigationRequest};
pub use error::{AuthError, DecodeError, GateError, NavigationOutcome, TransportError};
pub use gate::GateController;
pub use history::{HistoryBackend, HistoryOp, MemoryHistory};
pub use hooks::{hook_fn, FnHook, GateHook, HookChain, NavigationHook};
pub use interceptor::{Interceptor, InterceptorBuilder};
pub use matching::MatchMode;
pub use params::RedirectTemplate;
pub use policy::{BootstrapPolicy, GatePolicy, RegistryFailurePolicy, RouteSource};
pub use registry::{ProtectedRouteSet, RegistryState, RouteRegistry};
pub use session::{AuthClient, LoginOutcome};
pub use storage::{KeyValueStore, MemoryStore, TokenStore};
pub use token::{Claims, Clock, FixedClock, SystemClock, TokenStatus, TokenValidator};
pub use transport::{HttpRequest, HttpResponse, Method, Transport};
