// packages/recorder/src/lib.rs
//! Event Telemetry Recorder
//!
//! An in-process recorder for telemetry events: a registry of known event
//! definitions, a bounded per-process store of recorded occurrences, and
//! snapshots that drain the store into a serializable payload for upload.
//!
//! # Architecture
//!
//! - **registry**: event definitions, schema validation, identity lookup
//! - **recording**: policy, bounded store, child ingestion, snapshots, export
//! - **observability**: tracing setup and drop metrics
//! - **utils**: errors, configuration, clock
//!
//! # Example
//!
//! ```
//! use event_telemetry::{Dataset, EventIdentity, EventRecorder, RecorderConfig};
//! use serde_json::json;
//!
//! let recorder = EventRecorder::new(RecorderConfig::default());
//! recorder.initialize(true, false);
//! recorder
//!     .register_builtin_events(
//!         "ui",
//!         &json!({ "click": {
//!             "methods": ["click"], "objects": ["button"],
//!             "record_on_release": true, "expires": "never"
//!         } }),
//!     )
//!     .unwrap();
//!
//! let click = EventIdentity::new("ui", "click", "button");
//! recorder.record_event(&click, None, None).unwrap();
//!
//! let payload = recorder.create_snapshots(Dataset::Base, true, 0).unwrap();
//! assert_eq!(payload.event_count(), 1);
//! ```

pub mod observability;
pub mod recording;
pub mod registry;
pub mod utils;

// Re-export commonly used types
pub use recording::{
    BatchResult, ChildEventData, Diagnostics, EventRecorder, ExportFormat, Exporter, ExtraEntry, ProcessId,
    SnapshotPayload, SnapshotRequest,
};
pub use registry::{Dataset, DefinitionId, EventIdentity};
pub use utils::config::RecorderConfig;
pub use utils::errors::{RecordError, Result, SchemaError, TelemetryError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
