//! Canonical content hash of a loaded document.

use crate::format::SpecVersion;
use crate::model::Document;
use crate::writer::{to_value, InlinePolicy};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// SHA-256 (lower-case hex) of the document's 3.1 projection with references kept,
/// written compactly with every object's keys sorted.
///
/// Two descriptions that differ only in layout, key order or quoting hash equal.
pub fn canonical_hash(document: &Document) -> String {
    let value = sorted(to_value(document, SpecVersion::V3_1, InlinePolicy::KeepReferences));
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sorted(value)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}
