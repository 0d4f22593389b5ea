//! Login, signup and logout.
//!
//! [`AuthClient`] is the only writer of the stored credential. A successful
//! login or signup stores the returned token and navigates (with a history
//! push, as a full page navigation would) to the return destination:
//! the `redirect` query parameter the gate added when it denied the
//! original page, or the configured post-login path.
//!
//! Failures come back as [`AuthError`] with the server's `error` or
//! `message` text when it sent one.

use crate::error::AuthError;
use crate::history::HistoryBackend;
use crate::matching::query_value;
use crate::policy::GatePolicy;
use crate::storage::TokenStore;
use crate::token::{self, Claims, TokenValidator};
use crate::transport::{HttpRequest, Transport};
use crate::{debug_log, error_log, info_log, warn_log};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const LOGIN_FAILED: &str = "Login failed";
const SIGNUP_FAILED: &str = "Signup failed";

/// A completed login or signup.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    /// The credential now in storage.
    pub token: String,
    /// The server's `user` object, as sent.
    pub user: Value,
    /// Where the visitor was sent.
    pub destination: String,
}

#[derive(Deserialize)]
struct AuthSuccess {
    token: Option<String>,
    #[serde(default)]
    user: Value,
}

#[derive(Deserialize, Default)]
struct AuthFailure {
    error: Option<String>,
    message: Option<String>,
}

/// Client for the login/signup endpoints.
pub struct AuthClient {
    transport: Arc<dyn Transport>,
    tokens: TokenStore,
    history: Arc<dyn HistoryBackend>,
    policy: Arc<GatePolicy>,
    validator: TokenValidator,
}

impl AuthClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: TokenStore,
        history: Arc<dyn HistoryBackend>,
        policy: Arc<GatePolicy>,
    ) -> Self {
        Self {
            transport,
            tokens,
            history,
            policy,
            validator: TokenValidator::default(),
        }
    }

    /// Validate with a specific clock instead of the system clock.
    pub fn with_validator(mut self, validator: TokenValidator) -> Self {
        self.validator = validator;
        self
    }

    /// `POST { email, password }` to the login endpoint.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let body = json!({ "email": email, "password": password });
        self.authenticate(&self.policy.login_endpoint, body, LOGIN_FAILED)
            .await
    }

    /// `POST { email, password, plan? }` to the signup endpoint.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        plan: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        let mut body = json!({ "email": email, "password": password });
        if let Some(plan) = plan {
            body["plan"] = Value::from(plan);
        }
        self.authenticate(&self.policy.signup_endpoint, body, SIGNUP_FAILED)
            .await
    }

    /// Drop the credential and go to the login page.
    pub fn logout(&self) {
        self.tokens.clear();
        info_log!("Logged out; going to '{}'", self.policy.login_path);
        self.history.push_state(&self.policy.login_path);
    }

    /// Whether the stored credential is currently usable.
    pub fn is_authenticated(&self) -> bool {
        self.validator.is_valid(self.tokens.read().as_deref())
    }

    /// Claims of the stored credential, if it decodes.
    pub fn claims(&self) -> Option<Claims> {
        token::decode(&self.tokens.read()?).ok()
    }

    /// Where a successful login goes from the current location.
    ///
    /// The parameter the deny redirect wrote (see
    /// [`GatePolicy::return_param`]) is honoured only when it is a
    /// same-origin absolute path; anything else falls back to the post-login
    /// path.
    pub fn return_destination(&self) -> String {
        let location = self.history.location();
        match query_value(&location, self.policy.return_param()) {
            Some(target) if is_same_origin_path(&target) => target,
            Some(target) => {
                warn_log!("Ignoring off-site return destination '{}'", target);
                self.policy.post_login_path.clone()
            }
            None => self.policy.post_login_path.clone(),
        }
    }

    async fn authenticate(
        &self,
        endpoint: &str,
        body: Value,
        fallback: &str,
    ) -> Result<LoginOutcome, AuthError> {
        let response = self
            .transport
            .send(HttpRequest::post_json(endpoint, body))
            .await
            .map_err(|e| {
                error_log!("'{}' unreachable: {}", endpoint, e);
                e
            })?;

        if !response.is_success() {
            let failure: AuthFailure = response.json().unwrap_or_default();
            let message = failure
                .error
                .or(failure.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| fallback.to_string());
            warn_log!("'{}' answered {}: {}", endpoint, response.status, message);
            return Err(AuthError::Rejected {
                status: response.status,
                message,
            });
        }

        let success: AuthSuccess = response
            .json()
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
        let token = success
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("response carries no token".into()))?;

        let destination = self.return_destination();
        self.tokens.write(&token);
        debug_log!("Stored credential under '{}'", self.tokens.key());
        info_log!("Authenticated; going to '{}'", destination);
        self.history.push_state(&destination);

        Ok(LoginOutcome {
            token,
            user: success.user,
            destination,
        })
    }
}

impl std::fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthClient")
            .field("tokens", &self.tokens)
            .field("login_endpoint", &self.policy.login_endpoint)
            .field("signup_endpoint", &self.policy.signup_endpoint)
            .finish_non_exhaustive()
    }
}

/// `/path` but not `//host` or `/\host`, which browsers treat as off-site.
fn is_same_origin_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}
