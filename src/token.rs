//! Credential decoding and expiry checks.
//!
//! A credential is a JWT-shaped string `header.payload.signature`. The
//! validator reads the payload's `exp` claim and compares it with the clock.
//!
//! **This is access control, not authentication proof.** The signature is
//! never checked and neither is the issuer or audience: anyone can mint a
//! string that passes. The gate only keeps honest visitors with stale
//! sessions away from pages they would be refused data for anyway; the
//! server must authorize every request on its own.

use crate::debug_log;
use crate::error::DecodeError;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

/// base64url with or without padding, as JWTs are written.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Some issuers emit the standard alphabet in the payload segment.
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

// ============================================================================
// Clock
// ============================================================================

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and replay.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Decoded claim payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    /// Instant the credential stops being usable.
    pub expires_at: DateTime<Utc>,
    /// The full payload, `exp` included.
    pub payload: Map<String, Value>,
}

impl Claims {
    /// The `sub` claim, when it is a string.
    pub fn subject(&self) -> Option<&str> {
        self.payload.get("sub").and_then(Value::as_str)
    }

    /// Any other claim by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// Whether the expiry is strictly after `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Decode a credential's claim payload without verifying it.
///
/// # Examples
///
/// ```
/// use route_gate::token::decode;
///
/// // {"alg":"none"} . {"sub":"u1","exp":4102444800} . sig
/// let token = "eyJhbGciOiJub25lIn0.eyJzdWIiOiJ1MSIsImV4cCI6NDEwMjQ0NDgwMH0.sig";
/// let claims = decode(token).unwrap();
/// assert_eq!(claims.subject(), Some("u1"));
/// assert_eq!(claims.expires_at.timestamp(), 4_102_444_800);
///
/// assert!(decode("not-a-token").is_err());
/// ```
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(DecodeError::Malformed {
            segments: segments.len(),
        });
    };

    let bytes = URL_SAFE_LENIENT
        .decode(payload)
        .or_else(|_| STANDARD_LENIENT.decode(payload))?;
    let payload: Map<String, Value> = serde_json::from_slice(&bytes)?;

    let seconds = match payload.get("exp") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or(DecodeError::MissingExpiry)?;

    Ok(Claims {
        expires_at: expiry_from_seconds(seconds)?,
        payload,
    })
}

/// NumericDate (seconds, possibly fractional) to an instant.
fn expiry_from_seconds(seconds: f64) -> Result<DateTime<Utc>, DecodeError> {
    if !seconds.is_finite() {
        return Err(DecodeError::ExpiryOutOfRange(seconds));
    }
    let millis = (seconds * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis).ok_or(DecodeError::ExpiryOutOfRange(seconds))
}

// ============================================================================
// TokenValidator
// ============================================================================

/// Classification of a stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Absent,
    Malformed,
    Expired,
    Valid,
}

impl TokenStatus {
    pub fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Decides whether a stored credential is usable right now.
#[derive(Clone)]
pub struct TokenValidator {
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Classify a credential. Absent, malformed and expired credentials are
    /// distinguished here for logging only; callers treat them alike.
    pub fn status(&self, token: Option<&str>) -> TokenStatus {
        let Some(token) = token else {
            return TokenStatus::Absent;
        };
        match decode(token) {
            Ok(claims) if claims.is_live_at(self.clock.now()) => TokenStatus::Valid,
            Ok(claims) => {
                debug_log!("Credential expired at {}", claims.expires_at);
                TokenStatus::Expired
            }
            Err(err) => {
                debug_log!("Credential rejected: {}", err);
                TokenStatus::Malformed
            }
        }
    }

    /// `true` iff the token is present, decodes, and expires strictly after now.
    pub fn is_valid(&self, token: Option<&str>) -> bool {
        self.status(token).is_valid()
    }
}

impl Default for TokenValidator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("now", &self.clock.now())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
