//! Raw record flattening
//!
//! Turns an arbitrarily nested JSON object into a single-level mapping with
//! canonical keys: nested paths joined with `_`, everything lowercased. The
//! feed's nested `location` object becomes `location_latitude`,
//! `location_longitude`, `location_human_address`, and so on.

use serde_json::Value;

use crate::record::{FlatRecord, Scalar};

/// Flatten one raw record.
///
/// Arrays are kept as opaque scalars, not walked. Key collisions after
/// canonicalization resolve first-wins; `serde_json::Map` iterates keys in
/// sorted order, so the outcome is deterministic for a given record.
pub fn flatten(raw: &Value) -> FlatRecord {
    let mut flat = FlatRecord::new();
    if let Value::Object(fields) = raw {
        for (key, value) in fields {
            walk(&key.to_lowercase(), value, &mut flat);
        }
    }
    flat
}

fn walk(key: &str, value: &Value, flat: &mut FlatRecord) {
    match value {
        Value::Object(fields) => {
            for (child, child_value) in fields {
                let joined = format!("{}_{}", key, child.to_lowercase());
                walk(&joined, child_value, flat);
            }
        },
        other => {
            let scalar = match other {
                Value::Null => Scalar::Null,
                Value::String(s) => Scalar::Text(s.clone()),
                Value::Number(n) => match n.as_f64() {
                    Some(f) => Scalar::Number(f),
                    None => Scalar::Raw(other.clone()),
                },
                // Arrays and booleans pass through as-is.
                _ => Scalar::Raw(other.clone()),
            };
            flat.entry(key.to_string()).or_insert(scalar);
        },
    }
}
