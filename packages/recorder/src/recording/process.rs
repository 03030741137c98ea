// packages/recorder/src/recording/process.rs
//! Process identities
//!
//! Events are partitioned by the process that produced them. The parent
//! process records locally; every other kind reports through child-event
//! ingestion.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Originating process of a recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessId {
    Parent,
    Content,
    Extension,
    Gpu,
    Socket,
    Rdd,
    Utility,
}

impl ProcessId {
    /// Every known process, in snapshot grouping order
    pub const ALL: [ProcessId; 7] = [
        ProcessId::Parent,
        ProcessId::Content,
        ProcessId::Extension,
        ProcessId::Gpu,
        ProcessId::Socket,
        ProcessId::Rdd,
        ProcessId::Utility,
    ];

    /// Name used as the grouping key in snapshots
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessId::Parent => "parent",
            ProcessId::Content => "content",
            ProcessId::Extension => "extension",
            ProcessId::Gpu => "gpu",
            ProcessId::Socket => "socket",
            ProcessId::Rdd => "rdd",
            ProcessId::Utility => "utility",
        }
    }

    pub fn is_child(&self) -> bool {
        !matches!(self, ProcessId::Parent)
    }

    fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of processes a definition may be recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessSet(u8);

impl ProcessSet {
    pub fn all() -> Self {
        ProcessId::ALL.iter().fold(Self(0), |set, p| set.with(*p))
    }

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn with(self, process: ProcessId) -> Self {
        Self(self.0 | process.bit())
    }

    pub fn contains(&self, process: ProcessId) -> bool {
        self.0 & process.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Parse one `record_in_processes` entry into the set it denotes
    pub fn parse_entry(name: &str) -> Option<Self> {
        let single = |p: ProcessId| Some(Self::empty().with(p));
        match name {
            "main" | "parent" => single(ProcessId::Parent),
            "content" => single(ProcessId::Content),
            "extension" => single(ProcessId::Extension),
            "gpu" => single(ProcessId::Gpu),
            "socket" => single(ProcessId::Socket),
            "rdd" => single(ProcessId::Rdd),
            "utility" => single(ProcessId::Utility),
            "all" => Some(Self::all()),
            "all_children" | "all_childs" => Some(
                ProcessId::ALL
                    .iter()
                    .filter(|p| p.is_child())
                    .fold(Self::empty(), |set, p| set.with(*p)),
            ),
            _ => None,
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for ProcessSet {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_contains_every_process() {
        let set = ProcessSet::all();
        for p in ProcessId::ALL {
            assert!(set.contains(p));
        }
    }

    #[test]
    fn test_parse_entries() {
        let main = ProcessSet::parse_entry("main").unwrap();
        assert!(main.contains(ProcessId::Parent));
        assert!(!main.contains(ProcessId::Content));

        let children = ProcessSet::parse_entry("all_children").unwrap();
        assert!(!children.contains(ProcessId::Parent));
        assert!(children.contains(ProcessId::Gpu));

        assert!(ProcessSet::parse_entry("plugin").is_none());
    }

    #[test]
    fn test_grouping_order() {
        assert!(ProcessId::Parent < ProcessId::Content);
        assert!(ProcessId::Content < ProcessId::Utility);
    }
}
