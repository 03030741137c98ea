// packages/recorder/src/utils/errors.rs
//! Error types for the event telemetry recorder
//!
//! Caller-facing operations (registration, snapshots, configuration) return
//! [`TelemetryError`]. Per-event recording outcomes are [`RecordError`]s:
//! they are never fatal and are also tallied in the recorder diagnostics.

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors surfaced by recorder operations
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The recorder has not been initialized, or has been torn down
    #[error("event telemetry is not initialized")]
    NotInitialized,

    /// One or more definitions in a registration call were rejected.
    /// The `accepted` definitions were registered regardless.
    #[error("{} event definition(s) rejected ({accepted} accepted): {}", .errors.len(), join_errors(.errors))]
    SchemaRejected {
        accepted: usize,
        errors: Vec<SchemaError>,
    },

    /// Stored data could not be turned into an export representation
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Export compression failed
    #[error("compression error: {0}")]
    CompressionFailed(String),

    /// Invalid recorder configuration
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Invalid builtin events file
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error while reading definitions
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_errors(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Reasons a single event definition is rejected at registration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    #[error("{event}: missing required field '{field}'")]
    MissingField { event: String, field: &'static str },

    #[error("{event}: field '{field}' is malformed")]
    MalformedField { event: String, field: &'static str },

    #[error("{event}: malformed extra key list: {reason}")]
    MalformedExtraKeys { event: String, reason: String },

    #[error("{event}: {count} extra keys exceed the limit of {limit}")]
    TooManyExtraKeys {
        event: String,
        count: usize,
        limit: usize,
    },

    #[error("{event}: invalid expiry '{value}'")]
    InvalidExpiry { event: String, value: String },

    #[error("{event}: unknown process '{process}'")]
    UnknownProcess { event: String, process: String },

    #[error("{identity} is already registered with a different schema")]
    IncompatibleRedefinition { identity: String },

    #[error("registration payload for category '{category}' must be an object")]
    NotAnObject { category: String },
}

/// Per-event recording outcome other than success
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordError {
    #[error("event telemetry is not initialized")]
    NotInitialized,

    #[error("unknown event")]
    UnknownEvent,

    #[error("event is expired")]
    ExpiredEvent,

    #[error("event category is disabled")]
    CategoryDisabled,

    #[error("event is not recorded in this process")]
    WrongProcess,

    #[error("recording policy denies this event")]
    PolicyDenied,

    #[error("event store for this process is full")]
    OverflowDropped,
}

impl RecordError {
    /// Stable label used for drop metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordError::NotInitialized => "not_initialized",
            RecordError::UnknownEvent => "unknown",
            RecordError::ExpiredEvent => "expired",
            RecordError::CategoryDisabled => "category_disabled",
            RecordError::WrongProcess => "wrong_process",
            RecordError::PolicyDenied => "policy",
            RecordError::OverflowDropped => "overflow",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_rejected_message_lists_errors() {
        let err = TelemetryError::SchemaRejected {
            accepted: 2,
            errors: vec![SchemaError::MissingField {
                event: "ui.click".to_string(),
                field: "methods",
            }],
        };

        let msg = err.to_string();
        assert!(msg.contains("1 event definition(s) rejected"));
        assert!(msg.contains("2 accepted"));
        assert!(msg.contains("ui.click: missing required field 'methods'"));
    }

    #[test]
    fn test_record_error_labels() {
        assert_eq!(RecordError::PolicyDenied.as_str(), "policy");
        assert_eq!(RecordError::OverflowDropped.as_str(), "overflow");
    }
}
