//! Shared fixtures for the integration tests.
//!
//! Provides a scriptable transport, credential builders pinned to a fixed
//! clock, and a one-call interceptor fixture over in-memory history and
//! storage.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;
use route_gate::*;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

/// The instant every fixture clock starts at.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
}

/// A JWT-shaped token with the given claims. The signature is junk; nothing
/// checks it.
pub fn token_with_claims(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// A token expiring `offset` after [`now`].
pub fn token_expiring_in(offset: Duration) -> String {
    token_with_claims(&json!({ "sub": "user-1", "exp": (now() + offset).timestamp() }))
}

pub fn live_token() -> String {
    token_expiring_in(Duration::hours(1))
}

pub fn expired_token() -> String {
    token_expiring_in(Duration::seconds(-1))
}

/// Install an `env_logger` once so `RUST_LOG=route_gate=debug` shows the gate.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Transports
// ============================================================================

/// Transport answering from a url → response table; unknown urls get 404.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .insert(url.to_string(), Ok(HttpResponse::new(status, body)));
        self
    }

    pub fn fail(self, url: &str) -> Self {
        self.responses.lock().insert(
            url.to_string(),
            Err(TransportError::Network("connection refused".into())),
        );
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.url == url).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self
            .responses
            .lock()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Ok(HttpResponse::new(404, "")));
        self.requests.lock().push(request);
        response
    }
}

/// A [`MockTransport`] that holds every response until [`release`](Self::release).
pub struct HeldTransport {
    inner: MockTransport,
    gate: Notify,
}

impl HeldTransport {
    pub fn new(inner: MockTransport) -> Self {
        Self {
            inner,
            gate: Notify::new(),
        }
    }

    /// Let one held (or the next) request complete.
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.inner.calls_to(url)
    }
}

#[async_trait]
impl Transport for HeldTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.gate.notified().await;
        self.inner.send(request).await
    }
}

// ============================================================================
// Interceptor fixture
// ============================================================================

pub struct Fixture {
    pub interceptor: Arc<Interceptor>,
    pub history: Arc<MemoryHistory>,
    pub clock: Arc<FixedClock>,
}

impl Fixture {
    pub fn tokens(&self) -> &TokenStore {
        self.interceptor.tokens()
    }

    pub fn sign_in(&self) {
        self.tokens().write(&live_token());
    }
}

/// Interceptor at `location` with no transport.
pub fn fixture(policy: GatePolicy, location: &str) -> Fixture {
    build(policy, location, None)
}

/// Interceptor at `location` that loads routes through `transport`.
pub fn fixture_with_transport(
    policy: GatePolicy,
    location: &str,
    transport: Arc<dyn Transport>,
) -> Fixture {
    build(policy, location, Some(transport))
}

fn build(policy: GatePolicy, location: &str, transport: Option<Arc<dyn Transport>>) -> Fixture {
    init_logging();
    let history = Arc::new(MemoryHistory::new(location));
    let clock = Arc::new(FixedClock::new(now()));
    let mut builder = Interceptor::builder(policy)
        .history(history.clone())
        .clock(clock.clone());
    if let Some(transport) = transport {
        builder = builder.transport(transport);
    }
    Fixture {
        interceptor: Arc::new(builder.build().unwrap()),
        history,
        clock,
    }
}
