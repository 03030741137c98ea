// packages/recorder/src/recording/exporter.rs
//! Snapshot construction and export
//!
//! A snapshot walks every process queue in grouping order, keeps the events
//! whose definition belongs to the requested dataset, and stops once the
//! optional event limit is reached. When clearing, exactly the emitted
//! events are removed from the store; filtered and truncated events stay.
//!
//! Supported export formats:
//! - JSON objects (one object per event)
//! - Event arrays (`[timestamp, category, method, object, value, extra]`)
//! - zstd-compressed JSON for upload

use crate::recording::compressor::{CompressionLevel, Compressor};
use crate::recording::process::ProcessId;
use crate::recording::storage::EventStore;
use crate::registry::definition::Dataset;
use crate::registry::table::EventRegistry;
use crate::utils::errors::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Snapshot parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub dataset: Dataset,
    /// Remove emitted events from the store
    pub clear: bool,
    /// Maximum events across the whole snapshot; 0 means unlimited
    pub event_limit: u32,
}

impl SnapshotRequest {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            clear: false,
            event_limit: 0,
        }
    }

    pub fn clearing(mut self) -> Self {
        self.clear = true;
        self
    }

    pub fn with_limit(mut self, event_limit: u32) -> Self {
        self.event_limit = event_limit;
        self
    }
}

/// One exported event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEvent {
    pub timestamp_ms: u64,
    pub category: String,
    pub method: String,
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<BTreeMap<String, String>>,
}

impl SnapshotEvent {
    /// Compact array form. Trailing absent fields are omitted; an absent
    /// value before present extras is written as `null`.
    pub fn to_array(&self) -> Value {
        let mut items = vec![
            Value::from(self.timestamp_ms),
            Value::from(self.category.as_str()),
            Value::from(self.method.as_str()),
            Value::from(self.object.as_str()),
        ];

        match (&self.value, &self.extra) {
            (value, Some(extra)) => {
                items.push(value.as_deref().map_or(Value::Null, Value::from));
                items.push(Value::Object(
                    extra
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                        .collect(),
                ));
            }
            (Some(value), None) => items.push(Value::from(value.as_str())),
            (None, None) => {}
        }

        Value::Array(items)
    }
}

/// Exported events grouped by originating process
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub processes: BTreeMap<ProcessId, Vec<SnapshotEvent>>,
    /// Set when the event limit cut the snapshot short
    pub truncated: bool,
}

impl SnapshotPayload {
    pub fn event_count(&self) -> usize {
        self.processes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }

    pub fn events_for(&self, process: ProcessId) -> &[SnapshotEvent] {
        self.processes.get(&process).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Which stored events a snapshot emitted, per process, by queue position
#[derive(Debug, Default)]
pub struct SnapshotSelection {
    marks: BTreeMap<ProcessId, Vec<bool>>,
}

impl SnapshotSelection {
    /// Remove the emitted events from `store`
    pub fn drain_from(self, store: &mut EventStore) -> usize {
        let mut removed = 0;
        for (process, marks) in self.marks {
            if let Some(queue) = store.queue_mut(process) {
                removed += queue.drain_marked(&marks);
            }
        }
        store.prune();
        removed
    }
}

/// Build a snapshot of `store` without modifying it
pub fn collect_snapshot(
    store: &EventStore,
    registry: &EventRegistry,
    request: &SnapshotRequest,
) -> Result<(SnapshotPayload, SnapshotSelection)> {
    let limit = match request.event_limit {
        0 => usize::MAX,
        n => n as usize,
    };

    let mut payload = SnapshotPayload::default();
    let mut selection = SnapshotSelection::default();
    let mut emitted = 0usize;

    'processes: for (process, queue) in store.queues() {
        let mut marks = vec![false; queue.len()];
        let mut events = Vec::new();

        for (i, event) in queue.events().iter().enumerate() {
            let definition = registry.get(event.definition).ok_or_else(|| {
                TelemetryError::Serialization(format!(
                    "stored event in {} refers to unknown definition {:?}",
                    process, event.definition
                ))
            })?;

            if !definition.dataset.included_in(request.dataset) {
                continue;
            }

            if emitted >= limit {
                payload.truncated = true;
                push_group(&mut payload, &mut selection, process, events, marks);
                break 'processes;
            }

            let extra = (!event.extra.is_empty()).then(|| {
                event
                    .extra
                    .iter()
                    .map(|e| (e.key.clone(), e.value.clone()))
                    .collect()
            });

            events.push(SnapshotEvent {
                timestamp_ms: event.timestamp_ms,
                category: definition.identity.category.clone(),
                method: definition.identity.method.clone(),
                object: definition.identity.object.clone(),
                value: event.value.clone(),
                extra,
            });
            marks[i] = true;
            emitted += 1;
        }

        push_group(&mut payload, &mut selection, process, events, marks);
    }

    debug!(
        "Collected snapshot of {} events for {:?} (truncated: {})",
        emitted, request.dataset, payload.truncated
    );

    Ok((payload, selection))
}

fn push_group(
    payload: &mut SnapshotPayload,
    selection: &mut SnapshotSelection,
    process: ProcessId,
    events: Vec<SnapshotEvent>,
    marks: Vec<bool>,
) {
    if !events.is_empty() {
        payload.processes.insert(process, events);
        selection.marks.insert(process, marks);
    }
}

/// Export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON, one object per event
    Json,

    /// JSON, one compact array per event
    EventArrays,

    /// zstd-compressed JSON
    CompressedJson(CompressionLevel),
}

/// Encoder for snapshot payloads
pub struct Exporter {
    format: ExportFormat,
}

impl Exporter {
    pub fn new(format: ExportFormat) -> Self {
        Self { format }
    }

    /// Encode a payload
    pub fn export(&self, payload: &SnapshotPayload) -> Result<Vec<u8>> {
        debug!("Exporting {} events as {:?}", payload.event_count(), self.format);

        match self.format {
            ExportFormat::Json => to_json(payload),
            ExportFormat::EventArrays => to_json(&event_arrays(payload)),
            ExportFormat::CompressedJson(level) => Compressor::new(level).compress(&to_json(payload)?),
        }
    }

    /// Decode a payload written with `Json` or `CompressedJson`
    pub fn import(&self, bytes: &[u8]) -> Result<SnapshotPayload> {
        let json = match self.format {
            ExportFormat::Json => bytes.to_vec(),
            ExportFormat::CompressedJson(level) => Compressor::new(level).decompress(bytes)?,
            ExportFormat::EventArrays => {
                return Err(TelemetryError::Serialization(
                    "event array exports cannot be imported".to_string(),
                ))
            }
        };

        serde_json::from_slice(&json)
            .map_err(|e| TelemetryError::Serialization(format!("JSON deserialization error: {}", e)))
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| TelemetryError::Serialization(format!("JSON serialization error: {}", e)))
}

fn event_arrays(payload: &SnapshotPayload) -> Value {
    let mut root = serde_json::Map::new();
    for (process, events) in &payload.processes {
        root.insert(
            process.as_str().to_string(),
            Value::Array(events.iter().map(SnapshotEvent::to_array).collect()),
        );
    }
    root.insert("truncated".to_string(), Value::Bool(payload.truncated));
    Value::Object(root)
}
