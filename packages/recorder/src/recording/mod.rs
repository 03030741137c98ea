// packages/recorder/src/recording/mod.rs
//! Event recording, storage and export
//!
//! - **Recorder**: context object owning registry, policy and store
//! - **Policy**: base/extended dataset switches and category toggles
//! - **Event Queue**: bounded per-process queue with overflow accounting
//! - **Storage**: process-partitioned event store
//! - **Ingest**: child-process batches and the message inbox
//! - **Exporter**: snapshot construction and encoding
//! - **Compressor**: zstd compression of exported snapshots
//! - **Summary**: per-event recording counts
//! - **Diagnostics**: drop counters
//!
//! # Architecture
//!
//! ```text
//! record_event()      ─┐
//!                      ├→ Registry + Policy → EventStore[process] ─→ create_snapshot()
//! record_child_events()┘     (validate)        (bounded, FIFO)        (filter, limit, clear)
//!        ↑                                                                  ↓
//! ChildEventInbox ← child processes                          Exporter → JSON / zstd
//! ```

pub mod compressor;
pub mod diagnostics;
pub mod event_queue;
pub mod exporter;
pub mod ingest;
pub mod policy;
pub mod process;
pub mod recorder;
pub mod storage;
pub mod summary;

// Re-export commonly used types
pub use compressor::{CompressionLevel, Compressor};
pub use diagnostics::{Diagnostics, DropCounters};
pub use event_queue::{EventQueue, ExtraEntry, RecordedEvent};
pub use exporter::{ExportFormat, Exporter, SnapshotEvent, SnapshotPayload, SnapshotRequest};
pub use ingest::{BatchResult, BatchStatus, ChildEventBatch, ChildEventData, ChildEventInbox, ChildEventSender};
pub use policy::RecordingPolicy;
pub use process::{ProcessId, ProcessSet};
pub use recorder::EventRecorder;
pub use storage::{EventStore, ProcessStats};
pub use summary::{EventSummary, SummarySnapshot};
