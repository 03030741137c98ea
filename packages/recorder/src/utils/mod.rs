// packages/recorder/src/utils/mod.rs
//! Shared utilities: error taxonomy, configuration and the clock collaborator.

pub mod clock;
pub mod config;
pub mod errors;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::RecorderConfig;
pub use errors::{RecordError, Result, SchemaError, TelemetryError};
