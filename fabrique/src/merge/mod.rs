//! Recursive partial overrides for JSON records.
//!
//! Built objects are [`serde_json::Value`] records, and callers describe the
//! parts they care about as sparse records. [`merge_partial`] overlays such a
//! partial onto a fully built base:
//!
//! - a `null` partial at the top level leaves the base untouched;
//! - a partial that is not a record (scalars, arrays) replaces the base;
//! - records merge key by key, recursing only where the partial holds a
//!   non-null record, so nested keys the partial omits keep their base value;
//! - explicit `null` values inside the partial are kept verbatim.
//!
//! # Examples
//!
//! ```rust
//! use fabrique::merge::merge_partial;
//! use serde_json::json;
//!
//! let base = json!({"aisle": {"name": "Junk Food", "budget": 3000, "tags": ["a", "b", "c"]}});
//! let merged = merge_partial(base, json!({"aisle": {"budget": 9999, "tags": ["a"]}}));
//! assert_eq!(
//!     merged,
//!     json!({"aisle": {"name": "Junk Food", "budget": 9999, "tags": ["a"]}})
//! );
//! ```

use serde_json::{Map, Value};

/// A JSON record, the shape every factory builds.
pub type Record = Map<String, Value>;

/// Overlay `partial` onto `base`, returning the merged value.
#[must_use]
pub fn merge_partial(base: Value, partial: Value) -> Value {
    match partial {
        Value::Null => base,
        Value::Object(layer) => {
            let base_record = match base {
                Value::Object(record) => record,
                _ => Record::new(),
            };
            Value::Object(merge_record(base_record, layer))
        }
        opaque => opaque,
    }
}

/// Merge two records key by key.
///
/// The result lists `base` keys first, in their original order, followed by
/// keys only present in `partial`, in the order `partial` declares them.
#[must_use]
pub fn merge_record(mut base: Record, mut partial: Record) -> Record {
    let keys = union_keys(&base, &partial);
    let mut merged = Record::new();
    for key in keys {
        let current = base.remove(&key);
        let value = match (current, partial.remove(&key)) {
            (current, Some(Value::Object(layer))) => {
                merge_partial(current.unwrap_or(Value::Null), Value::Object(layer))
            }
            (_, Some(replacement)) => replacement,
            (Some(current), None) => current,
            (None, None) => continue,
        };
        merged.insert(key, value);
    }
    merged
}

/// Keys of `base` followed by keys only present in `overlay`, deduplicated.
#[must_use]
pub fn union_keys(base: &Record, overlay: &Record) -> Vec<String> {
    base.keys()
        .chain(overlay.keys().filter(|key| !base.contains_key(*key)))
        .cloned()
        .collect()
}

/// Overlay `layer` onto `target`, updating `target` in place.
///
/// Behaves like [`merge_partial`] but avoids moving the target out of its
/// owner.
pub fn merge_value(target: &mut Value, layer: Value) {
    let base = target.take();
    *target = merge_partial(base, layer);
}

/// Shallow-extend `target` with every entry of `addition`.
///
/// Returns the keys that already existed in `target` and were overwritten.
pub fn shallow_extend(target: &mut Record, addition: Record) -> Vec<String> {
    let mut overwritten = Vec::new();
    for (key, value) in addition {
        if target.insert(key.clone(), value).is_some() {
            overwritten.push(key);
        }
    }
    overwritten
}

#[cfg(test)]
mod tests;
