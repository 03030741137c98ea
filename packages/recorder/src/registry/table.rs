// packages/recorder/src/registry/table.rs
//! Event definition table
//!
//! Definitions live in a dense vector so stored events can refer to them by
//! [`DefinitionId`]; a hash index on the identity triple gives O(1) lookup.

use crate::registry::definition::{DefinitionId, DefinitionOrigin, EventDefinition, EventIdentity};
use crate::registry::schema::parse_definitions;
use crate::utils::errors::{Result, SchemaError, TelemetryError};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::mem::size_of;
use tracing::{debug, warn};

/// Result of inserting one definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(DefinitionId),
    /// Identical definition already present
    Unchanged(DefinitionId),
    /// Dynamic definition replaced in place
    Updated(DefinitionId),
}

impl InsertOutcome {
    pub fn id(&self) -> DefinitionId {
        match self {
            InsertOutcome::Inserted(id) | InsertOutcome::Unchanged(id) | InsertOutcome::Updated(id) => *id,
        }
    }
}

/// Registry of known event definitions
#[derive(Debug, Default)]
pub struct EventRegistry {
    definitions: Vec<EventDefinition>,
    index: HashMap<EventIdentity, DefinitionId>,
    generation: u32,
}

impl EventRegistry {
    /// Empty registry of generation 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty registry whose ids are tagged with `generation`
    pub fn with_generation(generation: u32) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    /// Generation stamped into every id this registry issues
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Insert a single definition.
    ///
    /// Re-registering an identity is idempotent when the schema matches.
    /// A differing schema is only accepted when `allow_update` is set and
    /// both the existing and the new definition are dynamic.
    pub fn insert(
        &mut self,
        definition: EventDefinition,
        allow_update: bool,
    ) -> std::result::Result<InsertOutcome, SchemaError> {
        if let Some(&id) = self.index.get(&definition.identity) {
            let existing = &mut self.definitions[id.index()];

            if existing.same_schema(&definition) {
                return Ok(InsertOutcome::Unchanged(id));
            }

            if allow_update
                && existing.origin == DefinitionOrigin::Dynamic
                && definition.origin == DefinitionOrigin::Dynamic
            {
                debug!("Updating dynamic event definition {}", definition.identity);
                *existing = definition;
                return Ok(InsertOutcome::Updated(id));
            }

            return Err(SchemaError::IncompatibleRedefinition {
                identity: definition.identity.to_string(),
            });
        }

        let id = DefinitionId::new(self.definitions.len() as u32, self.generation);
        self.index.insert(definition.identity.clone(), id);
        self.definitions.push(definition);
        Ok(InsertOutcome::Inserted(id))
    }

    /// Parse and insert every definition in a category payload.
    ///
    /// Valid definitions are always kept. Returns the number of definitions
    /// accepted, or `SchemaRejected` listing the rejected ones.
    pub fn register(
        &mut self,
        category: &str,
        description: &Value,
        origin: DefinitionOrigin,
        allow_update: bool,
        max_extra_keys: usize,
    ) -> Result<usize> {
        let parsed = parse_definitions(category, description, origin, max_extra_keys);
        let mut errors = parsed.errors;
        let mut accepted = 0;

        for definition in parsed.definitions {
            match self.insert(definition, allow_update) {
                Ok(_) => accepted += 1,
                Err(e) => errors.push(e),
            }
        }

        debug!("Registered {} event definitions for category '{}'", accepted, category);

        if errors.is_empty() {
            Ok(accepted)
        } else {
            for e in &errors {
                warn!("Rejected event definition: {}", e);
            }
            Err(TelemetryError::SchemaRejected { accepted, errors })
        }
    }

    /// Id of the definition registered under `identity`
    pub fn lookup(&self, identity: &EventIdentity) -> Option<DefinitionId> {
        self.index.get(identity).copied()
    }

    /// Resolve an id. Ids issued by another generation resolve to `None`.
    pub fn get(&self, id: DefinitionId) -> Option<&EventDefinition> {
        if id.generation() != self.generation {
            return None;
        }
        self.definitions.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions in registration order
    pub fn iter(&self) -> impl Iterator<Item = (DefinitionId, &EventDefinition)> {
        self.definitions
            .iter()
            .enumerate()
            .map(move |(i, d)| (DefinitionId::new(i as u32, self.generation), d))
    }

    /// Distinct registered categories, sorted
    pub fn categories(&self) -> BTreeSet<&str> {
        self.definitions
            .iter()
            .map(|d| d.identity.category.as_str())
            .collect()
    }

    pub(crate) fn heap_size(&self) -> usize {
        let vec = self.definitions.capacity() * size_of::<EventDefinition>()
            + self.definitions.iter().map(EventDefinition::heap_size).sum::<usize>();

        // Index keys are clones of the identities held by the definitions
        let index = self.index.capacity() * (size_of::<EventIdentity>() + size_of::<DefinitionId>())
            + self
                .index
                .keys()
                .map(|k| k.category.capacity() + k.method.capacity() + k.object.capacity())
                .sum::<usize>();

        vec + index
    }
}
