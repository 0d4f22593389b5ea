//! Gate configuration.
//!
//! A single [`GatePolicy`] describes everything that differs between
//! deployments: which prefixes are protected and where they come from, how
//! paths are compared, where denied visitors go, which storage key holds the
//! credential, and what to do while (or when failing to) load the route list.
//!
//! Policies are built fluently or deserialized from JSON:
//!
//! ```
//! use route_gate::{BootstrapPolicy, GatePolicy, RouteSource};
//!
//! let policy = GatePolicy::from_json(r#"{
//!     "route_source": { "type": "remote", "endpoint": "/api/protected-routes" },
//!     "bootstrap": "buffer"
//! }"#).unwrap();
//!
//! assert_eq!(policy.bootstrap, BootstrapPolicy::Buffer);
//! assert!(matches!(policy.route_source, RouteSource::Remote { .. }));
//! assert_eq!(policy.storage_key, "auth_token");
//! ```

use crate::error::GateError;
use crate::matching::{resolve_path, MatchMode};
use crate::params::RedirectTemplate;
use serde::{Deserialize, Serialize};

/// Storage key the credential lives under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "auth_token";

/// Endpoint serving the protected prefix list as a JSON array of strings.
pub const DEFAULT_ROUTES_ENDPOINT: &str = "/api/protected-routes";

/// Where the protected prefix list comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RouteSource {
    /// [`GatePolicy::protected_prefixes`], available immediately.
    #[default]
    Static,
    /// One `GET` of `endpoint`, performed by
    /// [`RouteRegistry::load`](crate::registry::RouteRegistry::load).
    Remote {
        #[serde(default = "default_routes_endpoint")]
        endpoint: String,
    },
}

fn default_routes_endpoint() -> String {
    DEFAULT_ROUTES_ENDPOINT.to_string()
}

impl RouteSource {
    /// Remote source at the default endpoint.
    pub fn remote() -> Self {
        Self::Remote {
            endpoint: default_routes_endpoint(),
        }
    }
}

/// What the registry holds after the remote route list could not be loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryFailurePolicy {
    /// Nothing is protected (availability over strictness).
    #[default]
    FailOpen,
    /// Everything except the login path is protected.
    FailClosed,
}

/// How navigation attempts are handled while the registry is loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BootstrapPolicy {
    /// Evaluate against the empty set; protected pages are reachable until
    /// the load completes.
    #[default]
    FailOpen,
    /// Hold the latest attempt and re-evaluate it once the registry is ready.
    Buffer,
}

/// Complete gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatePolicy {
    /// Protected entries for [`RouteSource::Static`].
    pub protected_prefixes: Vec<String>,
    pub route_source: RouteSource,
    pub match_mode: MatchMode,
    /// Login page; denied visitors and logouts land here.
    pub login_path: String,
    /// Destination after login when no usable `redirect` parameter is present.
    pub post_login_path: String,
    /// Query parameter the login flow reads the original destination from
    /// when `redirect_template` does not name one itself.
    pub redirect_param: String,
    pub redirect_template: RedirectTemplate,
    pub storage_key: String,
    pub on_registry_failure: RegistryFailurePolicy,
    pub bootstrap: BootstrapPolicy,
    /// Login endpoint (`POST { email, password }`).
    pub login_endpoint: String,
    /// Signup endpoint (`POST { email, password, plan? }`).
    pub signup_endpoint: String,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            protected_prefixes: Vec::new(),
            route_source: RouteSource::Static,
            match_mode: MatchMode::Prefix,
            login_path: "/login".to_string(),
            post_login_path: "/dashboard".to_string(),
            redirect_param: "redirect".to_string(),
            redirect_template: RedirectTemplate::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            on_registry_failure: RegistryFailurePolicy::FailOpen,
            bootstrap: BootstrapPolicy::FailOpen,
            login_endpoint: "/auth/login".to_string(),
            signup_endpoint: "/api/auth/signup".to_string(),
        }
    }
}

impl GatePolicy {
    /// Default policy: static, nothing protected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON policy. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, GateError> {
        let policy: Self =
            serde_json::from_str(json).map_err(|e| GateError::Config(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Check the invariants the gate relies on.
    pub fn validate(&self) -> Result<(), GateError> {
        if !self.login_path.starts_with('/') {
            return Err(GateError::Config(format!(
                "login_path must be an absolute path, got '{}'",
                self.login_path
            )));
        }
        if !self.post_login_path.starts_with('/') {
            return Err(GateError::Config(format!(
                "post_login_path must be an absolute path, got '{}'",
                self.post_login_path
            )));
        }
        if self.storage_key.is_empty() {
            return Err(GateError::Config("storage_key must not be empty".into()));
        }
        if let RouteSource::Remote { endpoint } = &self.route_source {
            if endpoint.is_empty() {
                return Err(GateError::Config("remote endpoint must not be empty".into()));
            }
        }
        Ok(())
    }

    /// Protect a prefix (static source).
    pub fn protect(mut self, prefix: impl Into<String>) -> Self {
        self.protected_prefixes.push(prefix.into());
        self
    }

    /// Protect several prefixes (static source).
    pub fn protect_all<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_prefixes
            .extend(prefixes.into_iter().map(Into::into));
        self
    }

    /// Load the protected list from a remote endpoint.
    pub fn remote_routes(mut self, endpoint: impl Into<String>) -> Self {
        self.route_source = RouteSource::Remote {
            endpoint: endpoint.into(),
        };
        self
    }

    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn post_login_path(mut self, path: impl Into<String>) -> Self {
        self.post_login_path = path.into();
        self
    }

    pub fn redirect_template(mut self, template: RedirectTemplate) -> Self {
        self.redirect_template = template;
        self
    }

    pub fn redirect_param(mut self, param: impl Into<String>) -> Self {
        self.redirect_param = param.into();
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn on_registry_failure(mut self, policy: RegistryFailurePolicy) -> Self {
        self.on_registry_failure = policy;
        self
    }

    pub fn bootstrap(mut self, policy: BootstrapPolicy) -> Self {
        self.bootstrap = policy;
        self
    }

    /// Where a visitor denied at `path` is sent.
    pub fn redirect_for(&self, path: &str) -> String {
        self.redirect_template.render(&self.login_path, path)
    }

    /// Query parameter the deny redirect writes the original path to.
    ///
    /// Taken from the template, so a custom `"?next={path}"` is read back as
    /// `next`; falls back to `redirect_param`.
    pub fn return_param(&self) -> &str {
        self.redirect_template
            .query_param()
            .unwrap_or(&self.redirect_param)
    }

    /// Path the deny redirect lands on, without its query.
    pub fn landing_path(&self) -> String {
        resolve_path("/", Some(&self.redirect_template.render(&self.login_path, "")))
    }
}
