//! Logging facade.
//!
//! The gate logs through crate-local macros so the host can choose the
//! backend at compile time. The two features are **mutually exclusive**.
//!
//! | Feature    | Backend         | Default |
//! |------------|-----------------|---------|
//! | `log`      | `log` crate     | yes     |
//! | `tracing`  | `tracing` crate | no      |
//!
//! Every record is emitted under the [`LOG_TARGET`] target, so a host can
//! silence or raise the gate independently of the rest of the page:
//!
//! ```text
//! RUST_LOG=route_gate=debug
//! ```
//!
//! Levels used by the crate:
//!
//! - `trace_log!` — per-hook evaluation and path resolution.
//! - `debug_log!` — every allow/deny decision and why.
//! - `info_log!` — redirects, installation, registry becoming ready.
//! - `warn_log!` — degraded states: registry fetch failure, reentrant passthrough.
//! - `error_log!` — login/signup transport failures.

/// Target name shared by every log record the crate emits.
pub const LOG_TARGET: &str = "route_gate";

/// Emit a **trace**-level record under the crate target.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::trace!(target: "route_gate", $($arg)*);
        #[cfg(feature = "log")]
        ::log::trace!(target: "route_gate", $($arg)*);
    };
}

/// Emit a **debug**-level record under the crate target.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(target: "route_gate", $($arg)*);
        #[cfg(feature = "log")]
        ::log::debug!(target: "route_gate", $($arg)*);
    };
}

/// Emit an **info**-level record under the crate target.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::info!(target: "route_gate", $($arg)*);
        #[cfg(feature = "log")]
        ::log::info!(target: "route_gate", $($arg)*);
    };
}

/// Emit a **warn**-level record under the crate target.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!(target: "route_gate", $($arg)*);
        #[cfg(feature = "log")]
        ::log::warn!(target: "route_gate", $($arg)*);
    };
}

/// Emit an **error**-level record under the crate target.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::error!(target: "route_gate", $($arg)*);
        #[cfg(feature = "log")]
        ::log::error!(target: "route_gate", $($arg)*);
    };
}
