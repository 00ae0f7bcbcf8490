//! Logging and tracing utilities for the exporters
//!
//! Structured logging through `tracing`, with spans around each export.

use std::sync::atomic::{AtomicBool, Ordering};

/// Whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize the default tracing subscriber
///
/// Call once at startup. Later calls are ignored.
pub fn init_default() {
    init_with_config(TracingConfig::default());
}

/// Initialize tracing with a custom configuration
///
/// `RUST_LOG` takes precedence over `config.default_level`.
pub fn init_with_config(config: TracingConfig) {
    if TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_ok()
    {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file)
            .with_line_number(config.show_line_number);

        // A global subscriber may already be set
        let _ = tracing_subscriber::registry()
            .with(fmt_layer)
            .with(filter)
            .try_init();
    }
}

/// Whether one of the init functions already ran
pub fn is_initialized() -> bool {
    TRACING_INITIALIZED.load(Ordering::SeqCst)
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default filter when `RUST_LOG` is unset (e.g. "info", "warn,euroland=debug")
    pub default_level: String,
    /// Show the target (module path) in log output
    pub show_target: bool,
    /// Show thread IDs in log output
    pub show_thread_ids: bool,
    /// Show source file in log output
    pub show_file: bool,
    /// Show line number in log output
    pub show_line_number: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: "warn,euroland=info".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

impl TracingConfig {
    /// Config with a different default filter
    pub fn with_level(level: impl Into<String>) -> Self {
        Self {
            default_level: level.into(),
            ..Default::default()
        }
    }
}

/// Macros for common logging patterns
#[macro_export]
macro_rules! log_export_start {
    ($format:expr, $scene:expr) => {
        tracing::info!(
            format = %$format,
            scene = %$scene.name,
            objects = $scene.objects.len(),
            "Starting export"
        );
    };
}

#[macro_export]
macro_rules! log_export_complete {
    ($format:expr, $duration:expr, $summary:expr) => {
        tracing::info!(
            format = %$format,
            duration_ms = %$duration.as_millis(),
            nodes = $summary.nodes,
            meshes = $summary.meshes,
            bytes = $summary.bytes,
            "Export complete"
        );
    };
}

#[macro_export]
macro_rules! log_export_error {
    ($format:expr, $error:expr) => {
        tracing::error!(
            format = %$format,
            error = %$error,
            "Export failed"
        );
    };
}

/// Run an export step inside an `export` span, logging its duration
pub fn instrument_export<T, F>(format: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = tracing::info_span!("export", format = %format);
    let _guard = span.enter();

    let start = std::time::Instant::now();
    let result = f();
    let duration = start.elapsed();

    tracing::debug!(duration_ms = %duration.as_millis(), "Export step complete");

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config_default() {
        let config = TracingConfig::default();
        assert!(config.default_level.contains("euroland=info"));
        assert!(config.show_target);
        assert!(!config.show_thread_ids);
    }

    #[test]
    fn test_with_level() {
        let config = TracingConfig::with_level("debug");
        assert_eq!(config.default_level, "debug");
        assert!(config.show_target);
    }

    #[test]
    fn test_instrument_export() {
        let result = instrument_export("eif", || 42);
        assert_eq!(result, 42);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_default();
        init_with_config(TracingConfig::with_level("trace"));
        assert!(is_initialized());
    }
}
