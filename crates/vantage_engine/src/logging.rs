use std::sync::Once;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static TRACING_INIT: Once = Once::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a human-readable subscriber filtered by `LOG_LEVEL` (default `info`).
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true);

        // another subscriber may already be set by the host application
        let _ = tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt_layer)
            .try_init();

        tracing::debug!("Tracing initialized successfully");
    });
}

/// Install a flattened JSON subscriber with UTC timestamps, for log shipping.
pub fn init_json_tracing() {
    TRACING_INIT.call_once(|| {
        let fmt_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(false)
            .with_thread_ids(true)
            .with_timer(UtcTime::rfc_3339());

        let _ = tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt_layer)
            .try_init();
    });
}
