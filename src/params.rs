//! Redirect target construction.
//!
//! - [`encode_uri_component`] / [`decode_uri_component`] — the JavaScript
//!   `encodeURIComponent` character set, so targets look exactly like the ones
//!   a browser-side login page expects (`/dashboard` → `%2Fdashboard`).
//! - [`RedirectTemplate`] — the deny-redirect format with `{login}` and
//!   `{path}` placeholders.
//!
//! # Example
//!
//! ```
//! use route_gate::RedirectTemplate;
//!
//! let template = RedirectTemplate::default();
//! assert_eq!(
//!     template.render("/login", "/dashboard"),
//!     "/login?redirect=%2Fdashboard"
//! );
//! ```

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters `encodeURIComponent` leaves alone: `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a string the way `encodeURIComponent` does.
pub fn encode_uri_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

/// Decode a percent-encoded component; invalid UTF-8 is replaced, not rejected.
pub fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Format of the location a denied visitor is sent to.
///
/// `{login}` is replaced with the login path and `{path}` with the
/// percent-encoded original destination. Unknown text is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedirectTemplate(String);

impl RedirectTemplate {
    /// Placeholder for the login path.
    pub const LOGIN: &'static str = "{login}";
    /// Placeholder for the encoded original path.
    pub const PATH: &'static str = "{path}";

    /// Create a template from a pattern such as `"/signin?next={path}"`.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Pattern as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render the template for a denied `path`.
    pub fn render(&self, login_path: &str, path: &str) -> String {
        self.0
            .replace(Self::LOGIN, login_path)
            .replace(Self::PATH, &encode_uri_component(path))
    }

    /// Name of the query parameter `{path}` is written to, if any.
    ///
    /// `"{login}?next={path}"` carries it in `next`; `"/login/{path}"` has no
    /// such parameter.
    pub fn query_param(&self) -> Option<&str> {
        let end = self.0.find(Self::PATH)?;
        let key = self.0[..end].strip_suffix('=')?;
        let start = key.rfind(['?', '&']).map_or(0, |i| i + 1);
        let name = &key[start..];
        (!name.is_empty() && !name.contains(['/', '{', '}'])).then_some(name)
    }
}

impl Default for RedirectTemplate {
    fn default() -> Self {
        Self::new("{login}?redirect={path}")
    }
}

impl fmt::Display for RedirectTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
