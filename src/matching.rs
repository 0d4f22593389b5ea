//! Path classification and URL-to-pathname resolution.
//!
//! # Design
//!
//! - Protected entries are matched against the resolved **pathname** only;
//!   query strings and fragments never affect classification.
//! - [`MatchMode::Prefix`] is a plain `starts_with` on the raw pathname. No
//!   segment boundary is enforced: `/dashboard` also protects `/dashboard-old`.
//! - [`MatchMode::Exact`] compares whole paths, ignoring one trailing slash.
//! - Destinations are resolved the way an anchor element resolves `href`:
//!   relative to the current location, absolute URLs taken as-is.

use serde::{Deserialize, Serialize};
use url::Url;

/// Placeholder origin for locations that are bare paths.
const RELATIVE_BASE: &str = "http://route-gate.invalid/";

/// How a protected entry is compared with a pathname.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// `path.starts_with(entry)`.
    #[default]
    Prefix,
    /// `path == entry`, trailing slash insensitive.
    Exact,
}

impl MatchMode {
    /// Check a single protected entry against a pathname.
    ///
    /// # Examples
    ///
    /// ```
    /// use route_gate::MatchMode;
    ///
    /// assert!(MatchMode::Prefix.matches("/dashboard", "/dashboard/settings"));
    /// assert!(!MatchMode::Exact.matches("/dashboard", "/dashboard/settings"));
    /// assert!(MatchMode::Exact.matches("/dashboard", "/dashboard/"));
    /// ```
    pub fn matches(self, entry: &str, path: &str) -> bool {
        match self {
            Self::Prefix => path.starts_with(entry),
            Self::Exact => trim_trailing_slash(path) == trim_trailing_slash(entry),
        }
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// Parse a location that may be absolute (`https://...`) or a bare path.
pub fn parse_location(location: &str) -> Option<Url> {
    match Url::parse(location) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(RELATIVE_BASE).ok()?.join(location).ok()
        }
        Err(_) => None,
    }
}

/// Resolve a navigation target against the current location and return its pathname.
///
/// With no target the current location's pathname is returned.
///
/// # Examples
///
/// ```
/// use route_gate::matching::resolve_path;
///
/// assert_eq!(resolve_path("/home", Some("/dashboard?tab=1")), "/dashboard");
/// assert_eq!(resolve_path("/users/list", Some("42")), "/users/42");
/// assert_eq!(resolve_path("/home", Some("https://example.com/admin#top")), "/admin");
/// assert_eq!(resolve_path("/profile?x=1", None), "/profile");
/// ```
pub fn resolve_path(current: &str, target: Option<&str>) -> String {
    let Some(base) = parse_location(current) else {
        return fallback_path(target.unwrap_or(current));
    };
    match target {
        None => base.path().to_string(),
        Some(target) => match base.join(target) {
            Ok(url) => url.path().to_string(),
            Err(_) => fallback_path(target),
        },
    }
}

/// Resolve a navigation target against the current location, keeping the
/// query string. Used for comparing locations and writing history entries.
pub fn resolve_path_and_query(current: &str, target: &str) -> String {
    let resolved = parse_location(current).and_then(|base| base.join(target).ok());
    match resolved {
        Some(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        None => target.to_string(),
    }
}

/// Strip query and fragment from something that would not parse as a URL.
fn fallback_path(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    raw.get(..end).unwrap_or(raw).to_string()
}

/// Read a single query parameter from a location.
pub fn query_value(location: &str, key: &str) -> Option<String> {
    let url = parse_location(location)?;
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
