// packages/recorder/src/recording/summary.rs
//! Per-event recording counts
//!
//! Counts every attempt that passes the expiry, category, process and
//! policy gates, including attempts that then overflow the store. The
//! number of distinct (process, event) keys is bounded.

use crate::recording::process::ProcessId;
use crate::registry::definition::DefinitionId;
use crate::registry::table::EventRegistry;
use std::collections::{BTreeMap, HashMap};
use std::mem::size_of;

/// Summary counts keyed by `category#method#object`, grouped by process
pub type SummarySnapshot = BTreeMap<ProcessId, BTreeMap<String, u32>>;

#[derive(Debug)]
pub struct EventSummary {
    counts: HashMap<(ProcessId, DefinitionId), u32>,
    max_keys: usize,
    overflow: u64,
}

impl EventSummary {
    pub fn new(max_keys: usize) -> Self {
        Self {
            counts: HashMap::new(),
            max_keys,
            overflow: 0,
        }
    }

    /// Count one attempt. Returns false if the key table is full.
    pub fn increment(&mut self, process: ProcessId, definition: DefinitionId) -> bool {
        let key = (process, definition);
        if let Some(count) = self.counts.get_mut(&key) {
            *count = count.saturating_add(1);
            return true;
        }
        if self.counts.len() >= self.max_keys {
            self.overflow += 1;
            return false;
        }
        self.counts.insert(key, 1);
        true
    }

    pub fn count(&self, process: ProcessId, definition: DefinitionId) -> u32 {
        self.counts.get(&(process, definition)).copied().unwrap_or(0)
    }

    /// Attempts not counted because the key table was full
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    pub fn snapshot(&self, registry: &EventRegistry) -> SummarySnapshot {
        let mut out = SummarySnapshot::new();
        for (&(process, id), &count) in &self.counts {
            if let Some(def) = registry.get(id) {
                out.entry(process)
                    .or_default()
                    .insert(def.identity.to_string(), count);
            }
        }
        out
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.overflow = 0;
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.counts.capacity() * (size_of::<(ProcessId, DefinitionId)>() + size_of::<u32>())
    }
}
