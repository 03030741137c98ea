// packages/recorder/src/recording/event_queue.rs
//! Bounded per-process event queue
//!
//! Retention is oldest-first: once the queue is at capacity new events are
//! refused and counted, existing events are never evicted.

use crate::recording::process::ProcessId;
use crate::registry::definition::DefinitionId;
use serde::{Deserialize, Serialize};
use std::mem::size_of;

/// Extra key/value pair attached to an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraEntry {
    pub key: String,
    pub value: String,
}

impl ExtraEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A single stored occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    /// Milliseconds on the recording process's monotonic clock
    pub timestamp_ms: u64,
    pub definition: DefinitionId,
    pub value: Option<String>,
    pub extra: Vec<ExtraEntry>,
    pub process: ProcessId,
}

impl RecordedEvent {
    pub(crate) fn heap_size(&self) -> usize {
        self.value.as_ref().map_or(0, String::capacity)
            + self.extra.capacity() * size_of::<ExtraEntry>()
            + self
                .extra
                .iter()
                .map(|e| e.key.capacity() + e.value.capacity())
                .sum::<usize>()
    }
}

/// Bounded queue of events for one process
#[derive(Debug)]
pub struct EventQueue {
    events: Vec<RecordedEvent>,
    capacity: usize,
    overflow_count: u64,
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            capacity,
            overflow_count: 0,
        }
    }

    /// Append an event, or hand it back if the queue is full
    pub fn push(&mut self, event: RecordedEvent) -> Result<(), RecordedEvent> {
        if self.is_full() {
            self.overflow_count += 1;
            return Err(event);
        }
        self.events.push(event);
        Ok(())
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Remove the events at positions where `drained[i]` is set, preserving
    /// the order of the rest. Resets the overflow counter if nothing remains.
    pub fn drain_marked(&mut self, drained: &[bool]) -> usize {
        let before = self.events.len();
        let mut marks = drained.iter();
        self.events.retain(|_| !marks.next().copied().unwrap_or(false));

        if self.events.is_empty() {
            self.overflow_count = 0;
        }
        before - self.events.len()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.overflow_count = 0;
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow_count
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.events.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.events.capacity() * size_of::<RecordedEvent>()
            + self.events.iter().map(RecordedEvent::heap_size).sum::<usize>()
    }
}
