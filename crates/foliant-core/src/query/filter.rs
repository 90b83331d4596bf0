//! The match predicate: evaluates a filter map against a single document.
//!
//! This is the post-extraction check run on every document the planner
//! hands back, whether it arrived via a scan or via an index lookup — the
//! planner is allowed to over-approximate (widen to a scan, skip a
//! fall-back operator), and this function is what makes the final call.

use serde_json::Value;

use crate::value_utils::{compare_values, is_condition};

/// Does `document` satisfy `filter`? An empty or non-object filter matches
/// everything.
pub fn document_filter_match(document: &Value, filter: &Value) -> bool {
    let Some(filter_map) = filter.as_object() else {
        return true;
    };

    for (field, pattern) in filter_map {
        let pattern_is_condition = is_condition(pattern);
        let field_is_gate = field.starts_with('$');
        let value = document.get(field.as_str());

        if !pattern_is_condition && !field_is_gate {
            if value != Some(pattern) {
                return false;
            }
            continue;
        }

        if field_is_gate && !eval_gate(document, field, pattern) {
            return false;
        }

        if !eval_operators(document, field, pattern, value) {
            return false;
        }
    }

    true
}

fn eval_gate(document: &Value, gate: &str, sub_filters: &Value) -> bool {
    let Some(list) = sub_filters.as_array() else {
        return true;
    };
    match gate {
        "$and" => list.iter().all(|f| document_filter_match(document, f)),
        "$or" => list.iter().any(|f| document_filter_match(document, f)),
        "$nor" => !list.iter().any(|f| document_filter_match(document, f)),
        _ => true,
    }
}

/// Evaluate every scalar operator present in `pattern` against `field`'s
/// current `value` (`None` when the field is absent — "absent" is unequal
/// to every concrete value, including an explicit `null`, but never errors).
fn eval_operators(document: &Value, field: &str, pattern: &Value, value: Option<&Value>) -> bool {
    let Some(pattern_map) = pattern.as_object() else {
        return true;
    };

    if let Some(expected) = pattern_map.get("$eq") {
        if value != Some(expected) {
            return false;
        }
    }
    if let Some(expected) = pattern_map.get("$ne") {
        if value == Some(expected) {
            return false;
        }
    }
    if let Some(bound) = pattern_map.get("$gt") {
        if !matches!(value.and_then(|v| compare_values(v, bound)), Some(std::cmp::Ordering::Greater)) {
            return false;
        }
    }
    if let Some(bound) = pattern_map.get("$gte") {
        if !matches!(
            value.and_then(|v| compare_values(v, bound)),
            Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
        ) {
            return false;
        }
    }
    if let Some(bound) = pattern_map.get("$lt") {
        if !matches!(value.and_then(|v| compare_values(v, bound)), Some(std::cmp::Ordering::Less)) {
            return false;
        }
    }
    if let Some(bound) = pattern_map.get("$lte") {
        if !matches!(
            value.and_then(|v| compare_values(v, bound)),
            Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
        ) {
            return false;
        }
    }
    if let Some(expected) = pattern_map.get("$exists") {
        let exists = document.get(field).is_some();
        if expected.as_bool().unwrap_or(false) != exists {
            return false;
        }
    }
    if let Some(candidates) = pattern_map.get("$in").and_then(|v| v.as_array()) {
        if !value.is_some_and(|v| candidates.contains(v)) {
            return false;
        }
    }
    if let Some(candidates) = pattern_map.get("$nin").and_then(|v| v.as_array()) {
        if value.is_some_and(|v| candidates.contains(v)) {
            return false;
        }
    }
    if let Some(sub_expr) = pattern_map.get("$not") {
        let mut single_field = serde_json::Map::new();
        single_field.insert(field.to_string(), sub_expr.clone());
        if document_filter_match(document, &Value::Object(single_field)) {
            return false;
        }
    }

    true
}

/// Evaluate an operator map directly against a bare value, with no
/// surrounding document or field name — used by `$pull`'s sub-filter form,
/// where the pattern targets each array element in isolation rather than a
/// named field.
pub fn value_matches_operators(value: &Value, pattern: &Value) -> bool {
    let Some(pattern_map) = pattern.as_object() else {
        return value == pattern;
    };
    if pattern_map.is_empty() {
        return value == pattern;
    }

    for (op, arg) in pattern_map {
        let ok = match op.as_str() {
            "$eq" => value == arg,
            "$ne" => value != arg,
            "$gt" => matches!(compare_values(value, arg), Some(std::cmp::Ordering::Greater)),
            "$gte" => matches!(
                compare_values(value, arg),
                Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
            ),
            "$lt" => matches!(compare_values(value, arg), Some(std::cmp::Ordering::Less)),
            "$lte" => matches!(
                compare_values(value, arg),
                Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
            ),
            "$in" => arg.as_array().is_some_and(|a| a.contains(value)),
            "$nin" => !arg.as_array().is_some_and(|a| a.contains(value)),
            "$not" => !value_matches_operators(value, arg),
            _ => true,
        };
        if !ok {
            return false;
        }
    }
    true
}
