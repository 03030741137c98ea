// packages/recorder/src/observability.rs
//! Logging and drop metrics
//!
//! Recording never fails loudly, so dropped events are reported twice: in
//! the recorder diagnostics and as `metrics` counters for whatever metrics
//! recorder the host has installed.

use crate::utils::errors::RecordError;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, EnvFilter};

/// Set to `1` or `true` for JSON log lines
pub const LOG_JSON_ENV: &str = "EVENT_TELEMETRY_LOG_JSON";

/// Counter incremented once per dropped event, labelled by reason
pub const DROPPED_EVENTS_METRIC: &str = "event_telemetry_dropped_total";

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// default `info` filter.
pub fn init_tracing() -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(LOG_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).compact())
            .try_init()
    }
}

pub(crate) fn record_drop(reason: RecordError) {
    metrics::counter!(DROPPED_EVENTS_METRIC, "reason" => reason.as_str()).increment(1);
}

/// Counter incremented once per child batch the inbox refuses
pub const REFUSED_BATCHES_METRIC: &str = "event_telemetry_refused_batches_total";

pub(crate) fn record_refused_batch() {
    metrics::counter!(REFUSED_BATCHES_METRIC).increment(1);
}
