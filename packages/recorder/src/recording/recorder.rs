// packages/recorder/src/recording/recorder.rs
//! Event recorder
//!
//! [`EventRecorder`] is the context object holding the registry, the
//! recording policy and the event store. All three sit behind one
//! `RwLock`: registration, recording, ingestion, policy changes and
//! clearing snapshots take it exclusively for their whole critical section;
//! non-clearing snapshots and diagnostics share it.
//!
//! Every `initialize` after a teardown starts a new registry generation, so
//! [`DefinitionId`]s handed out before the teardown no longer resolve.
//!
//! # Recording pipeline
//!
//! ```text
//! record_event / record_child_events
//!     → lookup      (UnknownEvent)
//!     → expiry      (ExpiredEvent)
//!     → category    (CategoryDisabled)
//!     → process     (WrongProcess)
//!     → policy      (PolicyDenied)
//!     → summary count
//!     → extra keys  (unknown keys dropped and counted)
//!     → lengths     (over-long values truncated and counted)
//!     → store       (OverflowDropped)
//! ```

use crate::recording::diagnostics::{Diagnostics, DropCounters};
use crate::recording::event_queue::{ExtraEntry, RecordedEvent};
use crate::recording::exporter::{collect_snapshot, SnapshotPayload, SnapshotRequest};
use crate::recording::ingest::{BatchResult, ChildEventData, ChildEventInbox, ChildEventSender};
use crate::recording::policy::RecordingPolicy;
use crate::recording::process::ProcessId;
use crate::recording::storage::EventStore;
use crate::recording::summary::{EventSummary, SummarySnapshot};
use crate::registry::definition::{AppVersion, Dataset, DefinitionId, DefinitionOrigin, EventIdentity};
use crate::registry::definition::EventDefinition;
use crate::registry::schema::parse_builtin_yaml;
use crate::registry::table::EventRegistry;
use crate::utils::clock::{Clock, MonotonicClock};
use crate::utils::config::RecorderConfig;
use crate::utils::errors::{RecordError, Result, TelemetryError};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde_json::Value;
use std::mem::size_of;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Shared state, present between `initialize` and `deinitialize`
struct RecorderState {
    registry: EventRegistry,
    policy: RecordingPolicy,
    store: EventStore,
    summary: EventSummary,
    drops: DropCounters,
    app_version: Option<AppVersion>,
}

/// Inputs of one recording attempt
struct Occurrence<'a> {
    process: ProcessId,
    definition: DefinitionId,
    timestamp_ms: u64,
    value: Option<&'a str>,
    extra: &'a [ExtraEntry],
}

impl RecorderState {
    fn new(config: &RecorderConfig, generation: u32, can_record_base: bool, can_record_extended: bool) -> Self {
        let app_version = AppVersion::parse(&config.app_version);
        if app_version.is_none() {
            warn!(
                "Unparseable app version '{}'; version-based expiry disabled",
                config.app_version
            );
        }

        Self {
            registry: EventRegistry::with_generation(generation),
            policy: RecordingPolicy::new(can_record_base, can_record_extended),
            store: EventStore::new(config.max_events_per_process),
            summary: EventSummary::new(config.max_summary_keys),
            drops: DropCounters::default(),
            app_version,
        }
    }

    /// Run the pipeline and count any drop
    fn record(
        &mut self,
        config: &RecorderConfig,
        today: NaiveDate,
        occurrence: Occurrence<'_>,
    ) -> std::result::Result<(), RecordError> {
        let result = self.try_record(config, today, occurrence);
        if let Err(reason) = result {
            trace!("Dropped event: {}", reason);
            self.drops.count(reason);
        }
        result
    }

    fn try_record(
        &mut self,
        config: &RecorderConfig,
        today: NaiveDate,
        occurrence: Occurrence<'_>,
    ) -> std::result::Result<(), RecordError> {
        let definition = self
            .registry
            .get(occurrence.definition)
            .ok_or(RecordError::UnknownEvent)?;

        if definition.expiry.is_expired(self.app_version.as_ref(), today) {
            return Err(RecordError::ExpiredEvent);
        }
        if !self.policy.is_category_enabled(&definition.identity.category) {
            return Err(RecordError::CategoryDisabled);
        }
        if !definition.processes.contains(occurrence.process) {
            return Err(RecordError::WrongProcess);
        }
        if !self.policy.can_record_dataset(definition.dataset) {
            return Err(RecordError::PolicyDenied);
        }

        if !self.summary.increment(occurrence.process, occurrence.definition) {
            trace!("Summary table full; {} not counted", definition.identity);
        }

        let mut extra: Vec<ExtraEntry> = Vec::with_capacity(occurrence.extra.len());
        for entry in occurrence.extra {
            if !definition.allows_extra_key(&entry.key) {
                self.drops.unknown_extra_keys += 1;
                continue;
            }
            let (value, truncated) = truncate_utf8(&entry.value, config.max_extra_value_length);
            if truncated {
                self.drops.truncated_values += 1;
            }
            match extra.iter_mut().find(|e| e.key == entry.key) {
                Some(existing) => existing.value = value,
                None => extra.push(ExtraEntry {
                    key: entry.key.clone(),
                    value,
                }),
            }
        }

        let value = occurrence.value.map(|v| {
            let (value, truncated) = truncate_utf8(v, config.max_value_length);
            if truncated {
                self.drops.truncated_values += 1;
            }
            value
        });

        self.store
            .append(RecordedEvent {
                timestamp_ms: occurrence.timestamp_ms,
                definition: occurrence.definition,
                value,
                extra,
                process: occurrence.process,
            })
            .map_err(|_| RecordError::OverflowDropped)
    }

    fn heap_size(&self) -> usize {
        self.registry.heap_size() + self.policy.heap_size() + self.store.heap_size() + self.summary.heap_size()
    }
}

/// Cut `s` to at most `max` bytes on a character boundary
fn truncate_utf8(s: &str, max: usize) -> (String, bool) {
    if s.len() <= max {
        return (s.to_string(), false);
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    (s[..end].to_string(), true)
}

/// In-process event telemetry recorder
pub struct EventRecorder {
    config: RecorderConfig,
    clock: Arc<dyn Clock>,
    state: RwLock<Option<RecorderState>>,
    inbox: ChildEventInbox,
    generation: AtomicU32,
}

impl EventRecorder {
    /// Create an uninitialized recorder using the monotonic system clock
    pub fn new(config: RecorderConfig) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Create an uninitialized recorder with a custom clock
    pub fn with_clock(config: RecorderConfig, clock: Arc<dyn Clock>) -> Self {
        let inbox = ChildEventInbox::new(config.max_pending_child_batches);
        inbox.set_accepting(false);
        Self {
            config,
            clock,
            state: RwLock::new(None),
            inbox,
            generation: AtomicU32::new(0),
        }
    }

    /// Configuration the recorder was created with
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Bring the registry, policy and store up together
    pub fn initialize(&self, can_record_base: bool, can_record_extended: bool) {
        let mut state = self.state.write();

        if let Some(existing) = state.as_mut() {
            warn!("Event telemetry already initialized; updating recording policy only");
            existing.policy.set_can_record_base(can_record_base);
            existing.policy.set_can_record_extended(can_record_extended);
            return;
        }

        info!(
            "Initializing event telemetry (base: {}, extended: {}, process: {})",
            can_record_base, can_record_extended, self.config.process
        );
        let generation = self.generation.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let discarded = self.inbox.drain().count();
        if discarded > 0 {
            debug!("Discarded {} child batches queued before initialization", discarded);
        }
        self.inbox.reset_refused();

        *state = Some(RecorderState::new(
            &self.config,
            generation,
            can_record_base,
            can_record_extended,
        ));
        self.inbox.set_accepting(true);
    }

    /// Drop every definition and stored event. Calls made afterwards observe
    /// `NotInitialized` until the recorder is initialized again.
    pub fn deinitialize(&self) {
        let mut state = self.state.write();
        if state.take().is_some() {
            self.inbox.set_accepting(false);
            let discarded = self.inbox.drain().count();
            info!("Event telemetry shut down ({} pending child batches discarded)", discarded);
        }
    }

    /// Whether the recorder is between `initialize` and `deinitialize`
    pub fn is_initialized(&self) -> bool {
        self.state.read().is_some()
    }

    /// Allow or deny recording of base-dataset events
    pub fn set_can_record_base(&self, enabled: bool) {
        self.with_state_mut(|s| s.policy.set_can_record_base(enabled));
    }

    /// Allow or deny recording of extended-dataset events
    pub fn set_can_record_extended(&self, enabled: bool) {
        self.with_state_mut(|s| s.policy.set_can_record_extended(enabled));
    }

    /// Enable or disable recording for a whole category
    pub fn set_event_recording_enabled(&self, category: &str, enabled: bool) {
        self.with_state_mut(|s| s.policy.set_category_enabled(category, enabled));
    }

    fn with_state_mut(&self, f: impl FnOnce(&mut RecorderState)) {
        match self.state.write().as_mut() {
            Some(state) => f(state),
            None => debug!("Ignoring policy change: event telemetry is not initialized"),
        }
    }

    /// Register builtin (static) definitions for `category`.
    ///
    /// Identical re-registration is a no-op. Returns the number of accepted
    /// definitions; malformed entries are reported in `SchemaRejected`
    /// while their valid siblings stay registered.
    pub fn register_builtin_events(&self, category: &str, description: &Value) -> Result<usize> {
        self.register(category, description, DefinitionOrigin::Static, false)
    }

    /// Register runtime (dynamic) definitions for `category`. With
    /// `allow_update`, existing dynamic definitions may change schema.
    pub fn register_dynamic_events(&self, category: &str, description: &Value, allow_update: bool) -> Result<usize> {
        self.register(category, description, DefinitionOrigin::Dynamic, allow_update)
    }

    /// Register every category of a builtin events YAML document
    pub fn register_builtin_yaml(&self, contents: &str) -> Result<usize> {
        let categories = parse_builtin_yaml(contents)?;
        let mut accepted = 0;
        let mut errors = Vec::new();

        for (category, description) in categories {
            match self.register_builtin_events(&category, &description) {
                Ok(n) => accepted += n,
                Err(TelemetryError::SchemaRejected { accepted: n, errors: e }) => {
                    accepted += n;
                    errors.extend(e);
                }
                Err(e) => return Err(e),
            }
        }

        if errors.is_empty() {
            Ok(accepted)
        } else {
            Err(TelemetryError::SchemaRejected { accepted, errors })
        }
    }

    /// Read and register a builtin events YAML file
    pub fn register_builtin_file(&self, path: &Path) -> Result<usize> {
        debug!("Loading builtin events from {:?}", path);
        let contents = std::fs::read_to_string(path)?;
        self.register_builtin_yaml(&contents)
    }

    /// Every registered definition, in registration order
    pub fn definitions(&self) -> Result<Vec<EventDefinition>> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(TelemetryError::NotInitialized)?;
        Ok(state.registry.iter().map(|(_, d)| d.clone()).collect())
    }

    fn register(
        &self,
        category: &str,
        description: &Value,
        origin: DefinitionOrigin,
        allow_update: bool,
    ) -> Result<usize> {
        let mut state = self.state.write();
        let state = state.as_mut().ok_or(TelemetryError::NotInitialized)?;
        state
            .registry
            .register(category, description, origin, allow_update, self.config.max_extra_keys)
    }

    /// Resolve an identity to the id accepted by [`record_event_native`](Self::record_event_native)
    pub fn lookup(&self, identity: &EventIdentity) -> Option<DefinitionId> {
        self.state.read().as_ref()?.registry.lookup(identity)
    }

    /// Record an event in the current process by definition id
    pub fn record_event_native(
        &self,
        id: DefinitionId,
        value: Option<&str>,
        extra: Option<&[ExtraEntry]>,
    ) -> std::result::Result<(), RecordError> {
        let today = self.clock.today();
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(RecordError::NotInitialized)?;

        let occurrence = Occurrence {
            process: self.config.process,
            definition: id,
            timestamp_ms: self.clock.elapsed_ms(),
            value,
            extra: extra.unwrap_or(&[]),
        };
        state.record(&self.config, today, occurrence)
    }

    /// Record an event in the current process by identity
    pub fn record_event(
        &self,
        identity: &EventIdentity,
        value: Option<&str>,
        extra: Option<&[ExtraEntry]>,
    ) -> std::result::Result<(), RecordError> {
        let today = self.clock.today();
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(RecordError::NotInitialized)?;

        let Some(id) = state.registry.lookup(identity) else {
            state.drops.count(RecordError::UnknownEvent);
            return Err(RecordError::UnknownEvent);
        };

        let occurrence = Occurrence {
            process: self.config.process,
            definition: id,
            timestamp_ms: self.clock.elapsed_ms(),
            value,
            extra: extra.unwrap_or(&[]),
        };
        state.record(&self.config, today, occurrence)
    }

    /// Ingest a batch reported by a child process.
    ///
    /// Each event goes through the same pipeline as local recording and is
    /// stored under `process` with its own timestamp. Invalid events are
    /// skipped; the batch is applied under one lock acquisition.
    pub fn record_child_events(&self, process: ProcessId, events: &[ChildEventData]) -> Result<BatchResult> {
        let today = self.clock.today();
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(TelemetryError::NotInitialized)?;
        let mut result = BatchResult::default();

        for event in events {
            let identity = EventIdentity::new(event.category.as_str(), event.method.as_str(), event.object.as_str());

            let outcome = match state.registry.lookup(&identity) {
                Some(id) => {
                    let occurrence = Occurrence {
                        process,
                        definition: id,
                        timestamp_ms: event.timestamp_ms,
                        value: event.value.as_deref(),
                        extra: &event.extra,
                    };
                    state.record(&self.config, today, occurrence)
                }
                None => {
                    state.drops.count(RecordError::UnknownEvent);
                    Err(RecordError::UnknownEvent)
                }
            };

            match outcome {
                Ok(()) => result.accepted += 1,
                Err(RecordError::OverflowDropped) => result.overflowed += 1,
                Err(_) => {
                    state.drops.rejected_child_events += 1;
                    result.rejected += 1;
                }
            }
        }

        if result.rejected > 0 {
            warn!(
                "Child batch from {}: {} accepted, {} rejected, {} overflowed",
                process, result.accepted, result.rejected, result.overflowed
            );
        } else {
            debug!(
                "Child batch from {}: {} accepted, {} overflowed",
                process, result.accepted, result.overflowed
            );
        }

        Ok(result)
    }

    /// Handle for child-side code to queue batches. Batches sent while the
    /// recorder is torn down, or while the inbox is full, are refused.
    pub fn child_event_sender(&self) -> ChildEventSender {
        self.inbox.sender()
    }

    /// Ingest every queued child batch in receipt order
    pub fn drain_child_events(&self) -> Result<BatchResult> {
        if !self.is_initialized() {
            return Err(TelemetryError::NotInitialized);
        }

        let mut total = BatchResult::default();
        for batch in self.inbox.drain() {
            total += self.record_child_events(batch.process, &batch.events)?;
        }
        Ok(total)
    }

    /// Build a snapshot. A clearing snapshot removes exactly the emitted
    /// events within the same critical section.
    pub fn create_snapshot(&self, request: SnapshotRequest) -> Result<SnapshotPayload> {
        if request.clear {
            let mut guard = self.state.write();
            let state = guard.as_mut().ok_or(TelemetryError::NotInitialized)?;
            let (payload, selection) = collect_snapshot(&state.store, &state.registry, &request)?;
            let removed = selection.drain_from(&mut state.store);
            debug!("Cleared {} events after snapshot", removed);
            Ok(payload)
        } else {
            let guard = self.state.read();
            let state = guard.as_ref().ok_or(TelemetryError::NotInitialized)?;
            collect_snapshot(&state.store, &state.registry, &request).map(|(payload, _)| payload)
        }
    }

    /// Positional form of [`create_snapshot`](Self::create_snapshot)
    pub fn create_snapshots(&self, dataset: Dataset, clear: bool, event_limit: u32) -> Result<SnapshotPayload> {
        self.create_snapshot(SnapshotRequest {
            dataset,
            clear,
            event_limit,
        })
    }

    /// Per-event recording counts, optionally resetting them
    pub fn event_summary(&self, clear: bool) -> Result<SummarySnapshot> {
        let mut guard = self.state.write();
        let state = guard.as_mut().ok_or(TelemetryError::NotInitialized)?;
        let snapshot = state.summary.snapshot(&state.registry);
        if clear {
            state.summary.clear();
        }
        Ok(snapshot)
    }

    /// Drop all stored events, summary counts and drop counters
    pub fn clear_events(&self) {
        self.with_state_mut(|s| {
            s.store.clear();
            s.summary.clear();
            s.drops = DropCounters::default();
        });
        self.inbox.reset_refused();
    }

    /// Drop counters and store statistics
    pub fn diagnostics(&self) -> Result<Diagnostics> {
        let guard = self.state.read();
        let state = guard.as_ref().ok_or(TelemetryError::NotInitialized)?;

        let mut drops = state.drops;
        drops.summary_overflow = state.summary.overflow();
        drops.refused_child_batches = self.inbox.refused();

        Ok(Diagnostics {
            drops,
            processes: state.store.process_stats(),
            registered_definitions: state.registry.len(),
            stored_events: state.store.len(),
        })
    }

    /// Bytes used by the recorder, including everything it owns
    pub fn size_of_including_this(&self) -> usize {
        let guard = self.state.read();
        size_of::<Self>()
            + self.config.app_version.capacity()
            + self.inbox.pending_bytes()
            + guard
                .as_ref()
                .map_or(0, |s| size_of::<RecorderState>() + s.heap_size())
    }
}

impl Default for EventRecorder {
    fn default() -> Self {
        Self::new(RecorderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use serde_json::json;

    fn recorder_with(config: RecorderConfig) -> (EventRecorder, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()));
        let recorder = EventRecorder::with_clock(config, clock.clone());
        recorder.initialize(true, true);
        recorder
            .register_builtin_events(
                "ui",
                &json!({
                    "click": {
                        "methods": ["click"],
                        "objects": ["button"],
                        "extra_keys": ["a", "b"],
                        "record_on_release": true,
                        "expires": "never"
                    },
                    "hover": {
                        "methods": ["hover"],
                        "objects": ["button"],
                        "expires": "never"
                    }
                }),
            )
            .unwrap();
        (recorder, clock)
    }

    fn click() -> EventIdentity {
        EventIdentity::new("ui", "click", "button")
    }

    #[test]
    fn test_not_initialized() {
        let recorder = EventRecorder::default();
        assert_eq!(recorder.record_event(&click(), None, None), Err(RecordError::NotInitialized));
        assert!(matches!(
            recorder.create_snapshots(Dataset::Base, false, 0),
            Err(TelemetryError::NotInitialized)
        ));
        assert!(matches!(
            recorder.register_dynamic_events("ui", &json!({}), false),
            Err(TelemetryError::NotInitialized)
        ));
    }

    #[test]
    fn test_record_and_snapshot_timestamps() {
        let (recorder, clock) = recorder_with(RecorderConfig::default());
        clock.advance(10);
        recorder.record_event(&click(), Some("v"), None).unwrap();
        clock.advance(5);
        recorder.record_event(&click(), None, None).unwrap();

        let payload = recorder.create_snapshots(Dataset::Base, false, 0).unwrap();
        let events = payload.events_for(ProcessId::Parent);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp_ms, 10);
        assert_eq!(events[0].value.as_deref(), Some("v"));
        assert_eq!(events[1].timestamp_ms, 15);
    }

    #[test]
    fn test_truncation_counts() {
        let (recorder, _) = recorder_with(RecorderConfig::default());
        let long = "x".repeat(100);
        let extra = [ExtraEntry::new("a", "é".repeat(50))];
        recorder.record_event(&click(), Some(&long), Some(&extra)).unwrap();

        let payload = recorder.create_snapshots(Dataset::Base, false, 0).unwrap();
        let event = &payload.events_for(ProcessId::Parent)[0];
        assert_eq!(event.value.as_ref().unwrap().len(), 80);
        // Two-byte characters cut on a boundary
        assert_eq!(event.extra.as_ref().unwrap()["a"].len(), 80);

        assert_eq!(recorder.diagnostics().unwrap().drops.truncated_values, 2);
    }

    #[test]
    fn test_truncate_utf8_boundary() {
        assert_eq!(truncate_utf8("héllo", 2), ("h".to_string(), true));
        assert_eq!(truncate_utf8("abc", 3), ("abc".to_string(), false));
    }

    #[test]
    fn test_expired_and_wrong_process() {
        let config = RecorderConfig::default()
            .with_app_version("120.0")
            .with_process(ProcessId::Content);
        let (recorder, clock) = recorder_with(config);
        recorder
            .register_dynamic_events(
                "old",
                &json!({
                    "v": { "methods": ["m"], "objects": ["o"], "expires": "100" },
                    "d": { "methods": ["m"], "objects": ["d"], "expires": "2026-03-02" },
                    "p": { "methods": ["m"], "objects": ["p"], "record_in_processes": ["main"] }
                }),
                false,
            )
            .unwrap();

        let id = |o: &str| EventIdentity::new("old", "m", o);
        assert_eq!(recorder.record_event(&id("o"), None, None), Err(RecordError::ExpiredEvent));
        assert_eq!(recorder.record_event(&id("d"), None, None), Ok(()));
        clock.set_today(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(recorder.record_event(&id("d"), None, None), Err(RecordError::ExpiredEvent));
        assert_eq!(recorder.record_event(&id("p"), None, None), Err(RecordError::WrongProcess));

        let drops = recorder.diagnostics().unwrap().drops;
        assert_eq!(drops.expired, 2);
        assert_eq!(drops.wrong_process, 1);
        assert_eq!(drops.policy, 0);
    }

    #[test]
    fn test_category_disabled() {
        let (recorder, _) = recorder_with(RecorderConfig::default());
        recorder.set_event_recording_enabled("ui", false);
        assert_eq!(recorder.record_event(&click(), None, None), Err(RecordError::CategoryDisabled));

        recorder.set_event_recording_enabled("ui", true);
        assert_eq!(recorder.record_event(&click(), None, None), Ok(()));
    }

    #[test]
    fn test_native_id_path() {
        let (recorder, _) = recorder_with(RecorderConfig::default());
        let id = recorder.lookup(&click()).unwrap();
        recorder.record_event_native(id, None, None).unwrap();
        assert_eq!(
            recorder.record_event_native(DefinitionId::new(999, 0), None, None),
            Err(RecordError::UnknownEvent)
        );
        assert_eq!(recorder.diagnostics().unwrap().drops.unknown, 1);
    }

    #[test]
    fn test_summary_counts_overflowed_attempts() {
        let config = RecorderConfig::default().with_max_events_per_process(1);
        let (recorder, _) = recorder_with(config);
        for _ in 0..3 {
            let _ = recorder.record_event(&click(), None, None);
        }

        let summary = recorder.event_summary(true).unwrap();
        assert_eq!(summary[&ProcessId::Parent]["ui#click#button"], 3);
        assert!(recorder.event_summary(false).unwrap().is_empty());
    }

    #[test]
    fn test_deinitialize_drops_everything() {
        let (recorder, _) = recorder_with(RecorderConfig::default());
        recorder.record_event(&click(), None, None).unwrap();
        let sender = recorder.child_event_sender();
        sender.send(ProcessId::Content, vec![ChildEventData::new(1, "ui", "click", "button")]);

        recorder.deinitialize();
        assert!(!recorder.is_initialized());
        assert!(recorder.lookup(&click()).is_none());

        recorder.initialize(true, true);
        assert!(recorder.lookup(&click()).is_none());
        assert!(recorder.create_snapshots(Dataset::Extended, false, 0).unwrap().is_empty());
        assert_eq!(recorder.drain_child_events().unwrap().total(), 0);
    }

    #[test]
    fn test_ids_do_not_survive_reinitialization() {
        let (recorder, _) = recorder_with(RecorderConfig::default());
        let stale = recorder.lookup(&click()).unwrap();

        recorder.deinitialize();
        recorder.initialize(true, true);
        recorder
            .register_builtin_events(
                "other",
                &json!({ "m": { "methods": ["m"], "objects": ["o"], "expires": "never" } }),
            )
            .unwrap();

        let fresh = recorder.lookup(&EventIdentity::new("other", "m", "o")).unwrap();
        assert_eq!(fresh.index(), stale.index());
        assert_ne!(fresh.generation(), stale.generation());

        assert_eq!(recorder.record_event_native(stale, None, None), Err(RecordError::UnknownEvent));
        assert!(recorder.create_snapshots(Dataset::Extended, false, 0).unwrap().is_empty());
        assert_eq!(recorder.diagnostics().unwrap().drops.unknown, 1);

        recorder.record_event_native(fresh, None, None).unwrap();
        let payload = recorder.create_snapshots(Dataset::Base, false, 0).unwrap();
        assert_eq!(payload.events_for(ProcessId::Parent)[0].category, "other");
    }

    #[test]
    fn test_summary_overflow_counted_once() {
        let mut config = RecorderConfig::default();
        config.max_summary_keys = 1;
        let (recorder, _) = recorder_with(config);
        let hover = EventIdentity::new("ui", "hover", "button");

        recorder.record_event(&click(), None, None).unwrap();
        recorder.record_event(&hover, None, None).unwrap();
        recorder.record_event(&hover, None, None).unwrap();
        assert_eq!(recorder.diagnostics().unwrap().drops.summary_overflow, 2);

        recorder.event_summary(true).unwrap();
        assert_eq!(recorder.diagnostics().unwrap().drops.summary_overflow, 0);
    }

    #[test]
    fn test_child_inbox_bounded_and_closed_when_torn_down() {
        let config = RecorderConfig::default().with_max_pending_child_batches(2);
        let recorder = EventRecorder::new(config);
        let sender = recorder.child_event_sender();
        // Unknown events leave the store untouched, so only pending batches move the size
        let batch = || vec![ChildEventData::new(1, "none", "m", "o").with_value("v".repeat(40))];

        assert!(!sender.send(ProcessId::Content, batch()));

        recorder.initialize(true, true);
        let before = recorder.size_of_including_this();
        assert!(sender.send(ProcessId::Content, batch()));
        assert!(sender.send(ProcessId::Content, batch()));
        assert!(recorder.size_of_including_this() > before);
        assert!(!sender.send(ProcessId::Content, batch()));
        assert_eq!(recorder.diagnostics().unwrap().drops.refused_child_batches, 1);

        assert_eq!(recorder.drain_child_events().unwrap().total(), 2);
        assert_eq!(recorder.size_of_including_this(), before);

        recorder.deinitialize();
        assert!(!sender.send(ProcessId::Content, batch()));
    }

    #[test]
    fn test_register_builtin_file() {
        use std::io::Write;

        let recorder = EventRecorder::default();
        recorder.initialize(true, true);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ui:\n  click:\n    methods: [click]\n    objects: [button]\n    expires: never").unwrap();
        assert_eq!(recorder.register_builtin_file(file.path()).unwrap(), 1);

        let definitions = recorder.definitions().unwrap();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].identity, click());

        let missing = recorder.register_builtin_file(Path::new("/nonexistent/events.yaml"));
        assert!(matches!(missing, Err(TelemetryError::Io(_))));
    }

    #[test]
    fn test_size_grows_with_stored_events() {
        let (recorder, _) = recorder_with(RecorderConfig::default());
        let before = recorder.size_of_including_this();
        for _ in 0..10 {
            recorder.record_event(&click(), Some("value"), None).unwrap();
        }
        let after = recorder.size_of_including_this();
        assert!(after > before);
        assert_eq!(after, recorder.size_of_including_this());

        recorder.deinitialize();
        assert!(recorder.size_of_including_this() < before);
    }
}
