//! Unified logging for the workspace index.
//!
//! Provides compact timestamped logging with per-target level configuration.
//! Components log under the targets `scanner`, `cache`, `indexer`,
//! `hierarchy` and `workspace`. Supports `RUST_LOG` environment variable for runtime overrides.
//!
//! # Configuration
//!
//! ```toml
//! [logging]
//! default = "warn"  # quiet by default
//!
//! [logging.modules]
//! indexer = "debug"
//! ```
//!
//! # Environment Variable
//!
//! `RUST_LOG` takes precedence over config:
//! ```bash
//! RUST_LOG=debug my-host-process
//! RUST_LOG=scanner=debug,hierarchy=trace my-host-process
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Initialize logging with configuration.
///
/// Call once at startup. Safe to call multiple times (only first call takes effect).
///
/// Log levels control visibility:
/// - `error` - errors only (quietest)
/// - `warn` - errors + warnings (default, quiet operation)
/// - `info` - normal operation logs
/// - `debug` - detailed debugging
/// - `trace` - everything
///
/// The `RUST_LOG` environment variable takes precedence over config settings.
///
/// # Arguments
/// * `config` - Logging configuration with default level and per-module overrides
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        // RUST_LOG env var takes precedence over config
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(filter_directives(config))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        // A host process may already own the global subscriber
        if tracing_subscriber::registry().with(fmt_layer).try_init().is_err() {
            tracing::debug!("global subscriber already installed");
        }
    });
}

/// Build the filter directive string used when `RUST_LOG` is unset.
pub fn filter_directives(config: &LoggingConfig) -> String {
    let mut modules: Vec<_> = config.modules.iter().collect();
    modules.sort();
    let mut filter_str = config.default.clone();
    for (module, level) in modules {
        filter_str.push_str(&format!(",{module}={level}"));
    }
    filter_str
}

/// Initialize logging with default configuration.
///
/// Uses `LoggingConfig::default()` which sets `default = "warn"` for quiet operation.
/// Use `RUST_LOG=debug` environment variable for verbose output.
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

/// Log an event with subsystem context.
///
/// `$area` must be a string literal; it becomes the tracing target, so
/// `[logging.modules]` entries such as `scanner = "debug"` apply.
///
/// # Examples
/// ```ignore
/// log_event!("indexer", "indexed", "{} files", count);
/// log_event!("hierarchy", "rebuilt");
/// ```
#[macro_export]
macro_rules! log_event {
    ($area:literal, $event:expr) => {
        tracing::info!(target: $area, "[{}] {}", $area, $event)
    };
    ($area:literal, $event:expr, $($arg:tt)*) => {
        tracing::info!(target: $area, "[{}] {}: {}", $area, $event, format!($($arg)*))
    };
}

/// Debug-only event logging.
///
/// # Examples
/// ```ignore
/// debug_event!("cache", "flush", "{} hashes", n);
/// ```
#[macro_export]
macro_rules! debug_event {
    ($area:literal, $event:expr) => {
        tracing::debug!(target: $area, "[{}] {}", $area, $event)
    };
    ($area:literal, $event:expr, $($arg:tt)*) => {
        tracing::debug!(target: $area, "[{}] {}: {}", $area, $event, format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn test_filter_directives_include_module_overrides() {
        let config = LoggingConfig {
            default: "info".to_string(),
            modules: HashMap::from([
                ("scanner".to_string(), "trace".to_string()),
                ("cache".to_string(), "debug".to_string()),
            ]),
        };
        assert_eq!(filter_directives(&config), "info,cache=debug,scanner=trace");
    }

    #[derive(Clone, Default)]
    struct Targets(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Targets {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.0.lock().push(event.metadata().target().to_string());
        }
    }

    #[test]
    fn test_event_macros_use_area_as_target() {
        let targets = Targets::default();
        let subscriber = tracing_subscriber::registry().with(targets.clone());
        tracing::subscriber::with_default(subscriber, || {
            crate::log_event!("scanner", "scan complete", "{} files", 3);
            crate::debug_event!("cache", "flush");
        });
        assert_eq!(*targets.0.lock(), vec!["scanner", "cache"]);
    }

    #[test]
    fn test_init_is_idempotent() {
        init();
        init_with_config(&LoggingConfig::default());
        tracing::warn!(target: "cache", "still alive");
    }
}
