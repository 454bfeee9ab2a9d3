//! Console logging for the server.
//!
//! Installs a `tracing` registry with an [`EnvFilter`] (default `info`,
//! overridable through `RUST_LOG`) and one `fmt` layer. Every dispatch runs
//! inside a `dispatch` span carrying `trace_id`, `parent_span_id` and
//! `span_id`, so events logged by verticles are correlated in either format.

use crate::server::config::LogFormat;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter());

    match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                    .with_file(true)
                    .pretty(),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_thread_ids(true)
                    .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()?,
    }

    Ok(())
}
