//! Login, signup and logout against the gate they feed.

mod common;

use common::*;
use route_gate::*;
use serde_json::json;
use std::sync::Arc;

fn login_ok(token: &str) -> String {
    json!({ "token": token, "user": { "id": 42, "email": "ada@example.com" } }).to_string()
}

#[tokio::test]
async fn test_denied_visit_login_and_return() {
    let fx = fixture(GatePolicy::new().protect("/dashboard"), "/dashboard/reports");
    fx.interceptor.install();
    assert_eq!(fx.history.location(), "/login?redirect=%2Fdashboard%2Freports");

    let token = live_token();
    let api = Arc::new(MockTransport::new().respond("/auth/login", 200, &login_ok(&token)));
    let auth = fx.interceptor.auth_client(api.clone());

    let outcome = auth.login("ada@example.com", "hunter2").await.unwrap();

    assert_eq!(outcome.destination, "/dashboard/reports");
    assert_eq!(outcome.user["id"], 42);
    assert_eq!(fx.history.location(), "/dashboard/reports");
    assert!(auth.is_authenticated());
    assert_eq!(auth.claims().unwrap().subject(), Some("user-1"));

    // The landing navigation is allowed by the gate.
    assert!(fx.interceptor.pop_state().is_committed());
}

#[tokio::test]
async fn test_custom_template_parameter_is_read_back_after_login() {
    let fx = fixture(
        GatePolicy::new()
            .protect("/dashboard")
            .redirect_template(RedirectTemplate::new("{login}?next={path}")),
        "/dashboard/reports",
    );
    fx.interceptor.install();
    assert_eq!(fx.history.location(), "/login?next=%2Fdashboard%2Freports");

    let api = Arc::new(MockTransport::new().respond("/auth/login", 200, &login_ok(&live_token())));
    let auth = fx.interceptor.auth_client(api);
    assert_eq!(auth.return_destination(), "/dashboard/reports");

    let outcome = auth.login("ada@example.com", "hunter2").await.unwrap();

    assert_eq!(outcome.destination, "/dashboard/reports");
    assert_eq!(fx.history.location(), "/dashboard/reports");
}

#[tokio::test]
async fn test_token_round_trip_and_logout() {
    let fx = fixture(GatePolicy::new().protect("/dashboard"), "/login");
    let token = live_token();
    let api = Arc::new(MockTransport::new().respond("/auth/login", 200, &login_ok(&token)));
    let auth = fx.interceptor.auth_client(api);

    auth.login("ada@example.com", "hunter2").await.unwrap();
    assert_eq!(fx.tokens().read(), Some(token));
    assert_eq!(fx.history.location(), "/dashboard");

    auth.logout();
    assert_eq!(fx.tokens().read(), None);
    assert_eq!(fx.history.location(), "/login");
    assert!(fx.interceptor.push(Some("/dashboard")).is_redirected());
}

#[tokio::test]
async fn test_custom_storage_key_is_shared() {
    let fx = fixture(
        GatePolicy::new().protect("/account").storage_key("authToken"),
        "/login",
    );
    let api = Arc::new(MockTransport::new().respond("/auth/login", 200, &login_ok(&live_token())));

    fx.interceptor.auth_client(api).login("a@b.c", "pw").await.unwrap();

    assert_eq!(fx.tokens().key(), "authToken");
    assert!(fx.interceptor.push(Some("/account")).is_committed());
}

#[tokio::test]
async fn test_expired_token_from_server_does_not_open_the_gate() {
    let fx = fixture(GatePolicy::new().protect("/dashboard"), "/login");
    let api = Arc::new(MockTransport::new().respond("/auth/login", 200, &login_ok(&expired_token())));
    let auth = fx.interceptor.auth_client(api);

    auth.login("a@b.c", "pw").await.unwrap();

    assert!(!auth.is_authenticated());
    assert!(fx.interceptor.pop_state().is_redirected());
}

#[tokio::test]
async fn test_rejected_login_surfaces_server_message() {
    let fx = fixture(GatePolicy::new(), "/login");
    let api = Arc::new(
        MockTransport::new().respond("/auth/login", 401, r#"{"error":"Invalid credentials"}"#),
    );
    let auth = fx.interceptor.auth_client(api);

    let err = auth.login("a@b.c", "wrong").await.unwrap_err();

    match err {
        AuthError::Rejected { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
    assert_eq!(fx.tokens().read(), None);
    assert_eq!(fx.history.location(), "/login");
}

#[tokio::test]
async fn test_signup_posts_plan_and_signs_in() {
    let fx = fixture(GatePolicy::new().protect("/dashboard"), "/signup");
    let api = Arc::new(
        MockTransport::new().respond("/api/auth/signup", 201, &login_ok(&live_token())),
    );
    let auth = fx.interceptor.auth_client(api.clone());

    let outcome = auth.signup("new@example.com", "pw", Some("team")).await.unwrap();

    assert_eq!(outcome.destination, "/dashboard");
    let sent = api.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, Method::Post);
    assert_eq!(
        sent[0].body,
        Some(json!({ "email": "new@example.com", "password": "pw", "plan": "team" }))
    );
    assert!(fx.interceptor.push(Some("/dashboard/billing")).is_committed());
}

#[tokio::test]
async fn test_signup_failure_without_message() {
    let fx = fixture(GatePolicy::new(), "/signup");
    let api = Arc::new(MockTransport::new().respond("/api/auth/signup", 409, "{}"));

    let err = fx
        .interceptor
        .auth_client(api)
        .signup("dup@example.com", "pw", None)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Signup failed");
}

#[tokio::test]
async fn test_unreachable_login_endpoint() {
    let fx = fixture(GatePolicy::new(), "/login");
    let api = Arc::new(MockTransport::new().fail("/auth/login"));

    let err = fx
        .interceptor
        .auth_client(api)
        .login("a@b.c", "pw")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Transport(_)));
}
