//! Telemetry and Observability
//!
//! Installs the `tracing-subscriber` registry used by the `cafe` binary.
//! Filtering follows `RUST_LOG` when it is set and otherwise the configured
//! level for this crate, with third-party crates held at `warn`.
//! Debug builds print human-readable events; release builds emit JSON lines
//! with the current span. Everything goes to stderr so stdout only carries
//! answers.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive used when `RUST_LOG` is absent
pub fn default_filter(log_level: &str) -> String {
    format!("warn,cafe_engine={0},cafe={0}", log_level)
}

/// Install the global subscriber for `log_level`.
///
/// Only the first call in a process takes effect; later calls are no-ops.
pub fn init_telemetry_with_level(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    let registry = tracing_subscriber::registry().with(env_filter);

    #[cfg(debug_assertions)]
    let installed = registry
        .with(
            fmt::layer()
                .pretty()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();

    #[cfg(not(debug_assertions))]
    let installed = registry
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(std::io::stderr),
        )
        .try_init();

    installed.ok();
}

/// Install the subscriber at `info`, for use before configuration is loaded.
pub fn init_telemetry() {
    init_telemetry_with_level("info");
}
