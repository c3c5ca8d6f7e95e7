//! Shared logging utilities for consistent tracing across the polling core

use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Build the filter directive used by the binary
///
/// The register transport is noisy at debug level, so it is pinned to `warn`
/// unless the caller asks for something more verbose through `RUST_LOG`.
pub fn filter_directive(log_level: Option<&str>) -> String {
    let base_level = log_level.unwrap_or("info");
    format!("orchestrator={base_level},shared={base_level},tokio_modbus=warn")
}

/// Initialize the stdout tracing subscriber
///
/// `RUST_LOG` wins over the supplied level when it is set.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));

    // A second init (tests, embedding) is not an error worth surfacing.
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for machine-scoped info logging
#[macro_export]
macro_rules! machine_info {
    ($machine:expr, $($arg:tt)*) => {
        tracing::info!(
            machine = %$machine,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for machine-scoped warning logging
#[macro_export]
macro_rules! machine_warn {
    ($machine:expr, $($arg:tt)*) => {
        tracing::warn!(
            machine = %$machine,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for machine-scoped error logging
#[macro_export]
macro_rules! machine_error {
    ($machine:expr, $($arg:tt)*) => {
        tracing::error!(
            machine = %$machine,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for machine-scoped debug logging
#[macro_export]
macro_rules! machine_debug {
    ($machine:expr, $($arg:tt)*) => {
        tracing::debug!(
            machine = %$machine,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(component: &str, details: &str) {
    info!(
        component = component,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(component: &str, reason: &str) {
    info!(
        component = component,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(component: &str, context: &str, error: &dyn std::fmt::Display) {
    error!(
        component = component,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(component: &str, message: &str) {
    info!(
        component = component,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}
