//! Ambient structured-logging fields
//!
//! Key/value pairs attached to every log line emitted from the current
//! execution context (see [`crate::telemetry::CorrelationFormat`]). Scoped the
//! same way as the correlation ID itself.

use crate::scope;

pub fn put(key: &str, value: &str) {
    scope::with_slot(|slot| {
        slot.fields.insert(key.to_string(), value.to_string());
    });
}

pub fn get(key: &str) -> Option<String> {
    scope::with_slot(|slot| slot.fields.get(key).cloned())
}

pub fn remove(key: &str) -> Option<String> {
    scope::with_slot(|slot| slot.fields.remove(key))
}

/// All fields of the current context, ordered by key
pub fn snapshot() -> Vec<(String, String)> {
    scope::with_slot(|slot| {
        slot.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    })
}
