// packages/recorder/src/utils/config.rs
//! Recorder configuration
//!
//! Layered through the `config` crate: built-in defaults, then an optional
//! TOML/YAML file, then `EVENT_TELEMETRY__*` environment variables.

use crate::recording::process::ProcessId;
use crate::utils::errors::Result;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "EVENT_TELEMETRY";

/// Recorder configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Stored events per process before new recordings overflow
    pub max_events_per_process: usize,

    /// Maximum byte length of an event value
    pub max_value_length: usize,

    /// Maximum byte length of a single extra value
    pub max_extra_value_length: usize,

    /// Maximum number of extra keys per definition
    pub max_extra_keys: usize,

    /// Maximum number of distinct keys in the event summary
    pub max_summary_keys: usize,

    /// Child batches the inbox holds before refusing new ones
    pub max_pending_child_batches: usize,

    /// Application version that version-based expiry is compared against
    pub app_version: String,

    /// Identity of the process this recorder runs in
    pub process: ProcessId,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_events_per_process: 1000,
            max_value_length: 80,
            max_extra_value_length: 80,
            max_extra_keys: 10,
            max_summary_keys: 500,
            max_pending_child_batches: 128,
            app_version: "1.0".to_string(),
            process: ProcessId::Parent,
        }
    }
}

impl RecorderConfig {
    /// Load configuration from an optional file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!("Loading recorder configuration from {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: RecorderConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make the recorder unusable
    pub fn validate(&self) -> Result<()> {
        let zero = [
            ("max_events_per_process", self.max_events_per_process),
            ("max_value_length", self.max_value_length),
            ("max_extra_value_length", self.max_extra_value_length),
            ("max_pending_child_batches", self.max_pending_child_batches),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);

        if let Some((field, _)) = zero {
            return Err(config::ConfigError::Message(format!("{} must be greater than 0", field)).into());
        }

        if self.app_version.trim().is_empty() {
            return Err(config::ConfigError::Message("app_version must not be empty".to_string()).into());
        }

        Ok(())
    }

    /// Builder-style override of the per-process store cap
    pub fn with_max_events_per_process(mut self, max: usize) -> Self {
        self.max_events_per_process = max;
        self
    }

    /// Builder-style override of the child inbox capacity
    pub fn with_max_pending_child_batches(mut self, max: usize) -> Self {
        self.max_pending_child_batches = max;
        self
    }

    /// Builder-style override of the application version
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = version.into();
        self
    }

    /// Builder-style override of the current process identity
    pub fn with_process(mut self, process: ProcessId) -> Self {
        self.process = process;
        self
    }
}
