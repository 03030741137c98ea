// packages/recorder/src/registry/mod.rs
//! Event registry
//!
//! - **Definition**: identity triple, dataset, expiry and process filter
//! - **Schema**: validation of loosely typed registration payloads
//! - **Table**: definition table with O(1) identity lookup

pub mod definition;
pub mod schema;
pub mod table;

pub use definition::{
    AppVersion, Dataset, DefinitionId, DefinitionOrigin, EventDefinition, EventIdentity, Expiry,
};
pub use table::{EventRegistry, InsertOutcome};
pub use schema::{parse_builtin_yaml, parse_definitions, ParsedDefinitions};
