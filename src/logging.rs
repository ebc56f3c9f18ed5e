//! Unified logging for debug output.
//!
//! Compact timestamped logging with per-module level configuration. Ported
//! near-verbatim from the teacher's `src/logging.rs`.
//!
//! `RUST_LOG` takes precedence over the configured default:
//! ```bash
//! RUST_LOG=debug codeir build
//! RUST_LOG=orchestrator=debug,resolver=trace codeir build
//! ```

use std::collections::BTreeMap;
use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: Once = Once::new();

/// Per-module log level overrides, merged with a default level.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub default: String,
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: "warn".to_string(),
            modules: BTreeMap::new(),
        }
    }
}

struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Initialize logging with configuration. Safe to call multiple times;
/// only the first call takes effect.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            let mut filter_str = config.default.clone();
            for (module, level) in &config.modules {
                filter_str.push_str(&format!(",{module}={level}"));
            }
            EnvFilter::new(&filter_str)
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Initialize logging with the default configuration (`warn`, quiet).
pub fn init() {
    init_with_config(&LoggingConfig::default());
}
