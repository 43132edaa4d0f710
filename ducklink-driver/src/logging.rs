//! Logging setup for the driver.
//!
//! The driver emits `tracing` events and spans under the `ducklink_driver`
//! target; an application that installs its own subscriber sees them
//! without calling anything here.
//!
//! # Environment Variables
//!
//! - `DUCKLINK_DEBUG=true|1|yes` - Enable debug logging
//! - `DUCKLINK_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific log level
//! - `DUCKLINK_LOG_FORMAT=json|pretty|compact` - Set output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use ducklink_driver::logging;
//!
//! // Initialize logging (call once at startup)
//! logging::init();
//!
//! // Or with an explicit level
//! logging::init_with_level("debug");
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "DUCKLINK_DEBUG";
const LEVEL_VAR: &str = "DUCKLINK_LOG_LEVEL";
const FORMAT_VAR: &str = "DUCKLINK_LOG_FORMAT";

/// Check if debug logging is enabled via `DUCKLINK_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR).map(|v| is_truthy(&v)).unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Get the configured log level.
///
/// Defaults to "debug" if `DUCKLINK_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    resolve_level(env::var(LEVEL_VAR).ok().as_deref(), is_debug_enabled())
}

fn resolve_level(requested: Option<&str>, debug: bool) -> &'static str {
    let fallback = if debug { "debug" } else { "warn" };
    match requested.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

/// Get the configured log format from `DUCKLINK_LOG_FORMAT`.
///
/// Defaults to "json".
pub fn get_log_format() -> &'static str {
    resolve_format(env::var(FORMAT_VAR).ok().as_deref())
}

fn resolve_format(requested: Option<&str>) -> &'static str {
    match requested.map(str::to_lowercase).as_deref() {
        Some("pretty") => "pretty",
        Some("compact") => "compact",
        _ => "json",
    }
}

/// Initialize the driver's logging from the environment.
///
/// Does nothing unless `DUCKLINK_DEBUG` or `DUCKLINK_LOG_LEVEL` is set, or
/// when the `tracing-subscriber` feature is off. Subsequent calls are no-ops.
pub fn init() {
    if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
        return;
    }
    install(get_log_level());
}

/// Initialize logging at `level`, ignoring `DUCKLINK_LOG_LEVEL`.
pub fn init_with_level(level: &str) {
    install(resolve_level(Some(level), true));
}

/// Initialize debug-level logging.
pub fn init_debug() {
    install("debug");
}

fn install(level: &'static str) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!("ducklink={level},ducklink_driver={level}"))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level, format = get_log_format(), "ducklink logging initialized");
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        let _ = level;
    });
}

/// Debug log that only fires when `DUCKLINK_DEBUG` is enabled at runtime.
#[macro_export]
macro_rules! ducklink_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_resolution() {
        assert_eq!(resolve_level(None, false), "warn");
        assert_eq!(resolve_level(None, true), "debug");
        assert_eq!(resolve_level(Some("TRACE"), false), "trace");
        assert_eq!(resolve_level(Some("error"), true), "error");
        assert_eq!(resolve_level(Some("verbose"), false), "warn");
    }

    #[test]
    fn test_format_resolution() {
        assert_eq!(resolve_format(None), "json");
        assert_eq!(resolve_format(Some("Pretty")), "pretty");
        assert_eq!(resolve_format(Some("compact")), "compact");
        assert_eq!(resolve_format(Some("xml")), "json");
    }

    #[test]
    fn test_truthy() {
        assert!(is_truthy("YES"));
        assert!(is_truthy("1"));
        assert!(!is_truthy("off"));
    }

    #[test]
    fn test_init_is_idempotent() {
        init_with_level("info");
        init_debug();
        init();
    }
}
