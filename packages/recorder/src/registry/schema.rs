// packages/recorder/src/registry/schema.rs
//! Registration payload parsing
//!
//! Registration payloads arrive as loosely typed values (JSON objects from
//! the binding layer, or YAML for builtin definitions). Each event entry is
//! validated into strict [`EventDefinition`]s; an entry that does not map
//! cleanly is rejected on its own without affecting its siblings.
//!
//! ```text
//! {
//!   "click": {
//!     "methods": ["click"],
//!     "objects": ["button", "link"],
//!     "extra_keys": ["position", "source"],
//!     "record_on_release": true,
//!     "expires": "never",
//!     "record_in_processes": ["main", "content"]
//!   }
//! }
//! ```

use crate::recording::process::ProcessSet;
use crate::registry::definition::{Dataset, DefinitionOrigin, EventDefinition, EventIdentity, Expiry};
use crate::utils::errors::{Result, SchemaError};
use serde_json::{Map, Value};

pub const MAX_CATEGORY_NAME_LENGTH: usize = 30;
pub const MAX_METHOD_NAME_LENGTH: usize = 20;
pub const MAX_OBJECT_NAME_LENGTH: usize = 20;
pub const MAX_EXTRA_KEY_NAME_LENGTH: usize = 15;
pub const MAX_EVENT_NAME_LENGTH: usize = 40;

/// Outcome of parsing one category's registration payload
#[derive(Debug, Default)]
pub struct ParsedDefinitions {
    pub definitions: Vec<EventDefinition>,
    pub errors: Vec<SchemaError>,
}

/// `[A-Za-z][A-Za-z0-9_.]*[A-Za-z0-9]`, or a single letter, within `max_len` bytes
pub fn is_valid_identifier(name: &str, max_len: usize) -> bool {
    let bytes = name.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };

    bytes.len() <= max_len
        && first.is_ascii_alphabetic()
        && last.is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'.')
}

/// Parse every event entry of `description` for `category`
pub fn parse_definitions(
    category: &str,
    description: &Value,
    origin: DefinitionOrigin,
    max_extra_keys: usize,
) -> ParsedDefinitions {
    let mut parsed = ParsedDefinitions::default();

    if !is_valid_identifier(category, MAX_CATEGORY_NAME_LENGTH) {
        parsed.errors.push(SchemaError::InvalidName {
            kind: "category",
            name: category.to_string(),
        });
        return parsed;
    }

    let Some(entries) = description.as_object() else {
        parsed.errors.push(SchemaError::NotAnObject {
            category: category.to_string(),
        });
        return parsed;
    };

    for (name, entry) in entries {
        match parse_entry(category, name, entry, origin, max_extra_keys) {
            Ok(defs) => parsed.definitions.extend(defs),
            Err(e) => parsed.errors.push(e),
        }
    }

    parsed
}

fn parse_entry(
    category: &str,
    name: &str,
    entry: &Value,
    origin: DefinitionOrigin,
    max_extra_keys: usize,
) -> std::result::Result<Vec<EventDefinition>, SchemaError> {
    let event = format!("{}.{}", category, name);

    if !is_valid_identifier(name, MAX_EVENT_NAME_LENGTH) {
        return Err(SchemaError::InvalidName {
            kind: "event",
            name: event,
        });
    }

    let Some(fields) = entry.as_object() else {
        return Err(SchemaError::MalformedField {
            event,
            field: "entry",
        });
    };

    let methods = name_list(&event, fields, "methods", "method", MAX_METHOD_NAME_LENGTH)?;
    let objects = name_list(&event, fields, "objects", "object", MAX_OBJECT_NAME_LENGTH)?;
    let extra_keys = extra_key_list(&event, fields, max_extra_keys)?;
    let dataset = dataset(&event, fields)?;
    let expiry = expiry(&event, fields, origin)?;
    let processes = processes(&event, fields)?;

    let mut definitions = Vec::with_capacity(methods.len() * objects.len());
    for method in &methods {
        for object in &objects {
            definitions.push(EventDefinition {
                identity: EventIdentity::new(category, method.as_str(), object.as_str()),
                extra_keys: extra_keys.clone(),
                expiry: expiry.clone(),
                dataset,
                processes,
                origin,
            });
        }
    }

    Ok(definitions)
}

fn name_list(
    event: &str,
    fields: &Map<String, Value>,
    field: &'static str,
    kind: &'static str,
    max_len: usize,
) -> std::result::Result<Vec<String>, SchemaError> {
    let value = fields.get(field).ok_or_else(|| SchemaError::MissingField {
        event: event.to_string(),
        field,
    })?;

    let malformed = || SchemaError::MalformedField {
        event: event.to_string(),
        field,
    };

    let items = value.as_array().filter(|a| !a.is_empty()).ok_or_else(malformed)?;

    items
        .iter()
        .map(|item| -> std::result::Result<String, SchemaError> {
            let name = item.as_str().ok_or_else(malformed)?;
            if !is_valid_identifier(name, max_len) {
                return Err(SchemaError::InvalidName {
                    kind,
                    name: name.to_string(),
                });
            }
            Ok(name.to_string())
        })
        .collect()
}

fn extra_key_list(
    event: &str,
    fields: &Map<String, Value>,
    max_extra_keys: usize,
) -> std::result::Result<Vec<String>, SchemaError> {
    let malformed = |reason: String| SchemaError::MalformedExtraKeys {
        event: event.to_string(),
        reason,
    };

    let keys: Vec<String> = match fields.get("extra_keys") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| malformed(format!("expected a string, found {}", item)))
            })
            .collect::<std::result::Result<_, _>>()?,
        // Builtin YAML maps each key to its description
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        Some(other) => return Err(malformed(format!("expected a list or map, found {}", other))),
    };

    if keys.len() > max_extra_keys {
        return Err(SchemaError::TooManyExtraKeys {
            event: event.to_string(),
            count: keys.len(),
            limit: max_extra_keys,
        });
    }

    for (i, key) in keys.iter().enumerate() {
        if !is_valid_identifier(key, MAX_EXTRA_KEY_NAME_LENGTH) {
            return Err(malformed(format!("invalid key '{}'", key)));
        }
        if keys[..i].contains(key) {
            return Err(malformed(format!("duplicate key '{}'", key)));
        }
    }

    Ok(keys)
}

fn dataset(event: &str, fields: &Map<String, Value>) -> std::result::Result<Dataset, SchemaError> {
    if let Some(value) = fields.get("record_on_release") {
        return match value.as_bool() {
            Some(true) => Ok(Dataset::Base),
            Some(false) => Ok(Dataset::Extended),
            None => Err(SchemaError::MalformedField {
                event: event.to_string(),
                field: "record_on_release",
            }),
        };
    }

    match fields.get("release_channel_collection").map(Value::as_str) {
        None => Ok(Dataset::Extended),
        Some(Some("opt-out")) => Ok(Dataset::Base),
        Some(Some("opt-in")) => Ok(Dataset::Extended),
        Some(_) => Err(SchemaError::MalformedField {
            event: event.to_string(),
            field: "release_channel_collection",
        }),
    }
}

fn expiry(
    event: &str,
    fields: &Map<String, Value>,
    origin: DefinitionOrigin,
) -> std::result::Result<Expiry, SchemaError> {
    match fields.get("expired") {
        None => {}
        Some(Value::Bool(true)) => return Ok(Expiry::Expired),
        Some(Value::Bool(false)) => {}
        Some(_) => {
            return Err(SchemaError::MalformedField {
                event: event.to_string(),
                field: "expired",
            })
        }
    }

    let raw = fields.get("expires").or_else(|| fields.get("expiry_version"));
    match (raw, origin) {
        (None, DefinitionOrigin::Dynamic) => Ok(Expiry::Never),
        (None, DefinitionOrigin::Static) => Err(SchemaError::MissingField {
            event: event.to_string(),
            field: "expires",
        }),
        (Some(value), _) => {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            Expiry::parse(&text).ok_or(SchemaError::InvalidExpiry {
                event: event.to_string(),
                value: text,
            })
        }
    }
}

fn processes(event: &str, fields: &Map<String, Value>) -> std::result::Result<ProcessSet, SchemaError> {
    let Some(value) = fields.get("record_in_processes") else {
        return Ok(ProcessSet::all());
    };

    let malformed = || SchemaError::MalformedField {
        event: event.to_string(),
        field: "record_in_processes",
    };

    let items = value.as_array().filter(|a| !a.is_empty()).ok_or_else(malformed)?;
    items.iter().try_fold(ProcessSet::empty(), |set, item| {
        let name = item.as_str().ok_or_else(malformed)?;
        let parsed = ProcessSet::parse_entry(name).ok_or_else(|| SchemaError::UnknownProcess {
            event: event.to_string(),
            process: name.to_string(),
        })?;
        Ok::<_, SchemaError>(set.union(parsed))
    })
}

/// Parse a builtin events YAML document: category → description
pub fn parse_builtin_yaml(contents: &str) -> Result<Vec<(String, Value)>> {
    let document: Value = serde_yaml::from_str(contents)?;
    let Value::Object(categories) = document else {
        let err = <serde_yaml::Error as serde::de::Error>::custom(
            "builtin events file must map categories to events",
        );
        return Err(err.into());
    };
    Ok(categories.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::process::ProcessId;
    use serde_json::json;

    fn parse(description: Value, origin: DefinitionOrigin) -> ParsedDefinitions {
        parse_definitions("ui", &description, origin, 10)
    }

    #[test]
    fn test_identifier_rules() {
        assert!(is_valid_identifier("a", 5));
        assert!(is_valid_identifier("ui.main_menu2", 30));
        assert!(!is_valid_identifier("", 5));
        assert!(!is_valid_identifier("1abc", 5));
        assert!(!is_valid_identifier("abc_", 5));
        assert!(!is_valid_identifier("a-b", 5));
        assert!(!is_valid_identifier("abcdef", 5));
    }

    #[test]
    fn test_method_object_cross_product() {
        let parsed = parse(
            json!({
                "click": {
                    "methods": ["click", "hover"],
                    "objects": ["button", "link"],
                    "extra_keys": ["a", "b"],
                    "record_on_release": true,
                    "expires": "never"
                }
            }),
            DefinitionOrigin::Static,
        );

        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.definitions.len(), 4);
        let first = &parsed.definitions[0];
        assert_eq!(first.identity, EventIdentity::new("ui", "click", "button"));
        assert_eq!(first.extra_keys, vec!["a", "b"]);
        assert_eq!(first.dataset, Dataset::Base);
        assert_eq!(first.expiry, Expiry::Never);
        assert_eq!(first.processes, ProcessSet::all());
    }

    #[test]
    fn test_malformed_entry_rejected_alone() {
        let parsed = parse(
            json!({
                "good": { "methods": ["open"], "objects": ["menu"] },
                "bad": { "methods": ["open"], "objects": ["menu"], "extra_keys": "oops" }
            }),
            DefinitionOrigin::Dynamic,
        );

        assert_eq!(parsed.definitions.len(), 1);
        assert_eq!(parsed.errors.len(), 1);
        assert!(matches!(parsed.errors[0], SchemaError::MalformedExtraKeys { .. }));
    }

    #[test]
    fn test_missing_required_fields() {
        let parsed = parse(json!({ "e": { "objects": ["x"] } }), DefinitionOrigin::Dynamic);
        assert_eq!(
            parsed.errors,
            vec![SchemaError::MissingField {
                event: "ui.e".to_string(),
                field: "methods"
            }]
        );

        let parsed = parse(
            json!({ "e": { "methods": ["m"], "objects": ["x"] } }),
            DefinitionOrigin::Static,
        );
        assert!(matches!(parsed.errors[0], SchemaError::MissingField { field: "expires", .. }));
    }

    #[test]
    fn test_dynamic_defaults() {
        let parsed = parse(json!({ "e": { "methods": ["m"], "objects": ["x"] } }), DefinitionOrigin::Dynamic);
        let def = &parsed.definitions[0];
        assert_eq!(def.expiry, Expiry::Never);
        assert_eq!(def.dataset, Dataset::Extended);
        assert_eq!(def.origin, DefinitionOrigin::Dynamic);
    }

    #[test]
    fn test_extra_key_limits() {
        let keys: Vec<String> = (0..11).map(|i| format!("k{}", i)).collect();
        let parsed = parse(
            json!({ "e": { "methods": ["m"], "objects": ["x"], "extra_keys": keys } }),
            DefinitionOrigin::Dynamic,
        );
        assert!(matches!(parsed.errors[0], SchemaError::TooManyExtraKeys { count: 11, limit: 10, .. }));

        let parsed = parse(
            json!({ "e": { "methods": ["m"], "objects": ["x"], "extra_keys": ["a", "a"] } }),
            DefinitionOrigin::Dynamic,
        );
        assert!(matches!(parsed.errors[0], SchemaError::MalformedExtraKeys { .. }));
    }

    #[test]
    fn test_extra_keys_as_map() {
        let parsed = parse(
            json!({ "e": {
                "methods": ["m"], "objects": ["x"],
                "extra_keys": { "reason": "why it happened" }
            } }),
            DefinitionOrigin::Dynamic,
        );
        assert_eq!(parsed.definitions[0].extra_keys, vec!["reason"]);
    }

    #[test]
    fn test_processes_and_expiry_fields() {
        let parsed = parse(
            json!({ "e": {
                "methods": ["m"], "objects": ["x"],
                "record_in_processes": ["main", "gpu"],
                "release_channel_collection": "opt-out",
                "expiry_version": "130"
            } }),
            DefinitionOrigin::Static,
        );
        let def = &parsed.definitions[0];
        assert!(def.processes.contains(ProcessId::Parent));
        assert!(def.processes.contains(ProcessId::Gpu));
        assert!(!def.processes.contains(ProcessId::Content));
        assert_eq!(def.dataset, Dataset::Base);
        assert!(matches!(def.expiry, Expiry::Version(_)));

        let parsed = parse(
            json!({ "e": { "methods": ["m"], "objects": ["x"], "record_in_processes": ["plugin"] } }),
            DefinitionOrigin::Dynamic,
        );
        assert!(matches!(parsed.errors[0], SchemaError::UnknownProcess { .. }));

        let parsed = parse(
            json!({ "e": { "methods": ["m"], "objects": ["x"], "expired": true } }),
            DefinitionOrigin::Dynamic,
        );
        assert_eq!(parsed.definitions[0].expiry, Expiry::Expired);
    }

    #[test]
    fn test_invalid_category_rejects_everything() {
        let parsed = parse_definitions(
            "bad-category",
            &json!({ "e": { "methods": ["m"], "objects": ["x"] } }),
            DefinitionOrigin::Dynamic,
            10,
        );
        assert!(parsed.definitions.is_empty());
        assert!(matches!(parsed.errors[0], SchemaError::InvalidName { kind: "category", .. }));
    }

    #[test]
    fn test_builtin_yaml() {
        let yaml = r#"
navigation:
  search:
    methods: [search]
    objects: [urlbar, searchbar]
    extra_keys:
      engine: Search engine identifier
    record_on_release: true
    expires: never
"#;
        let categories = parse_builtin_yaml(yaml).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].0, "navigation");

        let parsed = parse_definitions(&categories[0].0, &categories[0].1, DefinitionOrigin::Static, 10);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.definitions.len(), 2);

        assert!(parse_builtin_yaml("- just\n- a list\n").is_err());
    }
}
