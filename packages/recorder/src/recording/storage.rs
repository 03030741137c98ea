// packages/recorder/src/recording/storage.rs
//! In-memory event store partitioned by originating process

use crate::recording::event_queue::{EventQueue, RecordedEvent};
use crate::recording::process::ProcessId;
use std::collections::BTreeMap;
use std::mem::size_of;
use tracing::trace;

/// Per-process stored and overflow counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStats {
    pub stored: usize,
    pub overflowed: u64,
}

/// Event store: process → bounded queue, grouped in process order
#[derive(Debug)]
pub struct EventStore {
    queues: BTreeMap<ProcessId, EventQueue>,
    max_events_per_process: usize,
}

impl EventStore {
    pub fn new(max_events_per_process: usize) -> Self {
        Self {
            queues: BTreeMap::new(),
            max_events_per_process,
        }
    }

    /// Append to the event's process queue. Returns the event if that queue
    /// is at capacity; the queue's overflow counter has then been bumped.
    pub fn append(&mut self, event: RecordedEvent) -> Result<(), RecordedEvent> {
        let cap = self.max_events_per_process;
        let process = event.process;
        self.queues
            .entry(process)
            .or_insert_with(|| EventQueue::new(cap))
            .push(event)
            .map_err(|event| {
                trace!("Event store for {} is full", process);
                event
            })
    }

    pub fn queues(&self) -> impl Iterator<Item = (ProcessId, &EventQueue)> {
        self.queues.iter().map(|(p, q)| (*p, q))
    }

    pub fn queue_mut(&mut self, process: ProcessId) -> Option<&mut EventQueue> {
        self.queues.get_mut(&process)
    }

    pub fn len(&self) -> usize {
        self.queues.values().map(EventQueue::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.values().all(EventQueue::is_empty)
    }

    pub fn process_stats(&self) -> BTreeMap<ProcessId, ProcessStats> {
        self.queues
            .iter()
            .map(|(p, q)| {
                (
                    *p,
                    ProcessStats {
                        stored: q.len(),
                        overflowed: q.overflow_count(),
                    },
                )
            })
            .collect()
    }

    /// Drop queues that hold nothing and have no overflow to report
    pub fn prune(&mut self) {
        self.queues.retain(|_, q| !q.is_empty() || q.overflow_count() > 0);
    }

    pub fn clear(&mut self) {
        self.queues.clear();
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.queues
            .values()
            .map(|q| size_of::<ProcessId>() + size_of::<EventQueue>() + q.heap_size())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::definition::DefinitionId;

    fn event(process: ProcessId, ts: u64) -> RecordedEvent {
        RecordedEvent {
            timestamp_ms: ts,
            definition: DefinitionId::new(0, 0),
            value: None,
            extra: Vec::new(),
            process,
        }
    }

    #[test]
    fn test_partitioned_by_process() {
        let mut store = EventStore::new(10);
        store.append(event(ProcessId::Content, 1)).unwrap();
        store.append(event(ProcessId::Parent, 2)).unwrap();
        store.append(event(ProcessId::Content, 3)).unwrap();

        let order: Vec<_> = store.queues().map(|(p, q)| (p, q.len())).collect();
        assert_eq!(order, vec![(ProcessId::Parent, 1), (ProcessId::Content, 2)]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_cap_is_per_process() {
        let mut store = EventStore::new(1);
        store.append(event(ProcessId::Parent, 1)).unwrap();
        assert!(store.append(event(ProcessId::Parent, 2)).is_err());
        store.append(event(ProcessId::Gpu, 3)).unwrap();

        let stats = store.process_stats();
        assert_eq!(stats[&ProcessId::Parent], ProcessStats { stored: 1, overflowed: 1 });
        assert_eq!(stats[&ProcessId::Gpu], ProcessStats { stored: 1, overflowed: 0 });
    }

    #[test]
    fn test_prune_keeps_overflow_only_queues() {
        let mut store = EventStore::new(1);
        store.append(event(ProcessId::Parent, 1)).unwrap();
        let _ = store.append(event(ProcessId::Parent, 2));
        store.append(event(ProcessId::Rdd, 3)).unwrap();

        store.queue_mut(ProcessId::Rdd).unwrap().drain_marked(&[true]);
        store.prune();

        assert!(store.process_stats().get(&ProcessId::Rdd).is_none());
        assert!(store.process_stats().contains_key(&ProcessId::Parent));
    }
}
