// packages/recorder/src/recording/diagnostics.rs
//! Drop accounting and memory footprint reporting

use crate::recording::process::ProcessId;
use crate::recording::storage::ProcessStats;
use crate::utils::errors::RecordError;
use std::collections::BTreeMap;

/// Counts of events dropped or altered, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropCounters {
    pub unknown: u64,
    pub expired: u64,
    pub category_disabled: u64,
    pub wrong_process: u64,
    pub policy: u64,
    pub overflow: u64,
    /// Extra keys dropped because the definition does not allow them
    pub unknown_extra_keys: u64,
    /// Values or extra values cut to the maximum length
    pub truncated_values: u64,
    /// Child events refused for any reason other than overflow
    pub rejected_child_events: u64,
    /// Child batches the inbox refused while full or torn down
    pub refused_child_batches: u64,
    /// Recordings the summary could not count because its table was full
    pub summary_overflow: u64,
}

impl DropCounters {
    pub fn count(&mut self, reason: RecordError) {
        let slot = match reason {
            RecordError::UnknownEvent => &mut self.unknown,
            RecordError::ExpiredEvent => &mut self.expired,
            RecordError::CategoryDisabled => &mut self.category_disabled,
            RecordError::WrongProcess => &mut self.wrong_process,
            RecordError::PolicyDenied => &mut self.policy,
            RecordError::OverflowDropped => &mut self.overflow,
            RecordError::NotInitialized => return,
        };
        *slot += 1;
        crate::observability::record_drop(reason);
    }

    pub fn total_dropped(&self) -> u64 {
        self.unknown + self.expired + self.category_disabled + self.wrong_process + self.policy + self.overflow
    }
}

/// Point-in-time diagnostics for the whole recorder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub drops: DropCounters,
    pub processes: BTreeMap<ProcessId, ProcessStats>,
    pub registered_definitions: usize,
    pub stored_events: usize,
}
