//! Logging macros used across the workspace.
//!
//! Thin wrappers around `tracing` so that crates log through one vocabulary.
//! `success!` is an `INFO` event on the `lanwatch::success` target, which the
//! CLI formatter renders with its own marker.

pub const SUCCESS_TARGET: &str = "lanwatch::success";

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::tracing::info!(target: "lanwatch::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::tracing::error!($($arg)*)
    };
}
