//! Field projection: given a `{field: 0|1}` map, either drop the listed
//! fields (exclusion mode) or keep only them (inclusion mode). The mode is
//! inferred from the first pair, by insertion order — this is why
//! `serde_json`'s `preserve_order` feature is load-bearing for this crate.

use serde_json::{Map, Value};

/// Apply `projection` to `document`. An empty or non-object projection
/// returns the document unchanged.
pub fn apply_projection(document: &Value, projection: &Value) -> Value {
    let Some(projection_map) = projection.as_object() else {
        return document.clone();
    };
    if projection_map.is_empty() {
        return document.clone();
    }

    let exclude_mode = projection_map
        .values()
        .next()
        .map(|first| first.as_i64() == Some(0))
        .unwrap_or(false);

    let Some(doc_map) = document.as_object() else {
        return document.clone();
    };

    if exclude_mode {
        let mut result = doc_map.clone();
        for field in projection_map.keys() {
            result.remove(field);
        }
        Value::Object(result)
    } else {
        let mut result = Map::new();
        for field in projection_map.keys() {
            if let Some(value) = doc_map.get(field) {
                result.insert(field.clone(), value.clone());
            }
        }
        Value::Object(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_projection_returns_document_unchanged() {
        let doc = json!({"a": 1, "b": 2});
        assert_eq!(apply_projection(&doc, &json!({})), doc);
    }

    #[test]
    fn inclusion_mode_keeps_only_listed_fields() {
        let doc = json!({"a": 1, "b": 2, "c": 3});
        let projected = apply_projection(&doc, &json!({"a": 1, "c": 1}));
        assert_eq!(projected, json!({"a": 1, "c": 3}));
    }

    #[test]
    fn exclusion_mode_drops_listed_fields() {
        let doc = json!({"a": 1, "b": 2, "c": 3});
        let projected = apply_projection(&doc, &json!({"b": 0}));
        assert_eq!(projected, json!({"a": 1, "c": 3}));
    }

    #[test]
    fn inclusion_mode_skips_absent_fields() {
        let doc = json!({"a": 1});
        let projected = apply_projection(&doc, &json!({"a": 1, "missing": 1}));
        assert_eq!(projected, json!({"a": 1}));
    }

    #[test]
    fn mode_is_inferred_from_first_pair_insertion_order() {
        let doc = json!({"a": 1, "b": 2, "c": 3});
        // first pair excludes, so the whole map is treated as exclusion
        // mode even though the second pair's value looks like inclusion (1)
        let projected = apply_projection(&doc, &json!({"b": 0, "a": 1}));
        assert_eq!(projected, json!({"c": 3}));
    }
}
