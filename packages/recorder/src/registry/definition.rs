// packages/recorder/src/registry/definition.rs
//! Event definitions
//!
//! A definition is identified by its (category, method, object) triple and
//! carries the schema every recording is checked against: allowed extra
//! keys, expiry, dataset and the processes it may be recorded in.

use crate::recording::process::ProcessSet;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// (category, method, object) triple naming an event
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventIdentity {
    pub category: String,
    pub method: String,
    pub object: String,
}

impl EventIdentity {
    pub fn new(
        category: impl Into<String>,
        method: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            method: method.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for EventIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}#{}", self.category, self.method, self.object)
    }
}

/// Index of a definition inside the registry, tagged with the registry
/// generation it was issued by. Ids from a torn-down registry resolve to
/// nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId {
    generation: u32,
    index: u32,
}

impl DefinitionId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { generation, index }
    }

    /// Position in the registry's definition table
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Registry generation that issued this id
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Snapshot dataset. `Extended` is a superset of `Base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Always-on-capable collection (opt-out)
    Base,
    /// Opt-in collection
    Extended,
}

impl Dataset {
    /// Whether a definition classified as `self` belongs in a snapshot of `requested`
    pub fn included_in(&self, requested: Dataset) -> bool {
        *self <= requested
    }
}

/// Whether a definition is built in or registered at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionOrigin {
    Static,
    Dynamic,
}

/// Dotted numeric application version, e.g. `"121.0.1"` or `"68"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppVersion(Vec<u32>);

impl AppVersion {
    /// Parse leading numeric components; a non-numeric suffix such as
    /// `a1` ends the version. Returns `None` if no digits lead the string.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = Vec::new();
        for piece in s.trim().split('.') {
            let digits: String = piece.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                break;
            }
            parts.push(digits.parse().ok()?);
            if digits.len() != piece.len() {
                break;
            }
        }
        if parts.is_empty() {
            return None;
        }
        // "68" and "68.0" compare and hash equal
        while parts.len() > 1 && parts.last() == Some(&0) {
            parts.pop();
        }
        Some(Self(parts))
    }

    fn component(&self, i: usize) -> u32 {
        self.0.get(i).copied().unwrap_or(0)
    }
}

impl Ord for AppVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for AppVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// When a definition stops recording
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expiry {
    Never,
    /// Expired once the application version reaches this version
    Version(AppVersion),
    /// Expired on and after this date
    Date(NaiveDate),
    /// Registered as already expired
    Expired,
}

impl Expiry {
    /// Parse `"never"`, a version string or an ISO date
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s == "never" || s == "default" {
            return Some(Expiry::Never);
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(Expiry::Date(date));
        }
        AppVersion::parse(s).map(Expiry::Version)
    }

    pub fn is_expired(&self, app_version: Option<&AppVersion>, today: NaiveDate) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::Expired => true,
            Expiry::Version(expiry) => app_version.map_or(false, |v| v >= expiry),
            Expiry::Date(date) => today >= *date,
        }
    }
}

/// A registered event schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    pub identity: EventIdentity,
    /// Allowed extra keys, in declaration order
    pub extra_keys: Vec<String>,
    pub expiry: Expiry,
    pub dataset: Dataset,
    pub processes: ProcessSet,
    pub origin: DefinitionOrigin,
}

impl EventDefinition {
    pub fn allows_extra_key(&self, key: &str) -> bool {
        self.extra_keys.iter().any(|k| k == key)
    }

    /// Same schema, ignoring identity and origin
    pub fn same_schema(&self, other: &EventDefinition) -> bool {
        self.extra_keys == other.extra_keys
            && self.expiry == other.expiry
            && self.dataset == other.dataset
            && self.processes == other.processes
    }

    pub(crate) fn heap_size(&self) -> usize {
        self.identity.category.capacity()
            + self.identity.method.capacity()
            + self.identity.object.capacity()
            + self.extra_keys.capacity() * std::mem::size_of::<String>()
            + self.extra_keys.iter().map(String::capacity).sum::<usize>()
            + match &self.expiry {
                Expiry::Version(v) => v.0.capacity() * std::mem::size_of::<u32>(),
                _ => 0,
            }
    }
}
