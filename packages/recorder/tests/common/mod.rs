// packages/recorder/tests/common/mod.rs
//! Shared fixtures for integration tests

#![allow(dead_code)]

use event_telemetry::{EventIdentity, EventRecorder, RecorderConfig};
use serde_json::json;

pub fn base_event() -> EventIdentity {
    EventIdentity::new("test", "hit", "base")
}

pub fn extended_event() -> EventIdentity {
    EventIdentity::new("test", "hit", "ext")
}

/// Initialized recorder with one base-dataset and one extended-only event,
/// both allowing extra keys `a` and `b`
pub fn recorder(config: RecorderConfig) -> EventRecorder {
    let recorder = EventRecorder::new(config);
    recorder.initialize(true, true);
    recorder
        .register_builtin_events(
            "test",
            &json!({
                "base_hit": {
                    "methods": ["hit"], "objects": ["base"],
                    "extra_keys": ["a", "b"],
                    "record_on_release": true,
                    "expires": "never"
                },
                "ext_hit": {
                    "methods": ["hit"], "objects": ["ext"],
                    "extra_keys": ["a", "b"],
                    "record_on_release": false,
                    "expires": "never"
                }
            }),
        )
        .expect("fixture definitions are valid");
    recorder
}
