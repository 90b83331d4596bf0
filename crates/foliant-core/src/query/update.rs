//! Update-operator interpreter: `$set`, `$unset`, `$inc`, `$addToSet`,
//! `$push`, `$pull`. Computes a new document out-of-place; the caller
//! decides whether the result differs enough from the original to write.

use serde_json::{Map, Value};

use crate::query::filter::value_matches_operators;
use crate::value_utils::is_condition;

/// Apply an update override (e.g. `{"$set": {...}, "$inc": {...}}`) to
/// `document`, returning a new document. Unknown top-level keys are
/// ignored, matching the "apply every action present" style of the rest of
/// this interpreter.
pub fn update_document_with_override(document: &Value, overrides: &Value) -> Value {
    let mut result = document.clone();
    let Some(overrides) = overrides.as_object() else {
        return result;
    };

    for (action, fields) in overrides {
        let Some(fields) = fields.as_object() else {
            continue;
        };
        match action.as_str() {
            "$set" => apply_set(&mut result, fields),
            "$unset" => apply_unset(&mut result, fields),
            "$inc" => apply_inc(&mut result, fields),
            "$addToSet" => apply_add_to_set(&mut result, fields),
            "$push" => apply_push(&mut result, fields),
            "$pull" => apply_pull(&mut result, fields),
            _ => {}
        }
    }

    result
}

fn as_object_mut(document: &mut Value) -> Option<&mut Map<String, Value>> {
    document.as_object_mut()
}

fn apply_set(document: &mut Value, fields: &Map<String, Value>) {
    let Some(obj) = as_object_mut(document) else { return };
    for (field, value) in fields {
        obj.insert(field.clone(), value.clone());
    }
}

fn apply_unset(document: &mut Value, fields: &Map<String, Value>) {
    let Some(obj) = as_object_mut(document) else { return };
    for field in fields.keys() {
        obj.remove(field);
    }
}

fn apply_inc(document: &mut Value, fields: &Map<String, Value>) {
    let Some(obj) = as_object_mut(document) else { return };
    for (field, delta) in fields {
        let (Some(current), Some(delta)) = (obj.get(field).and_then(Value::as_f64), delta.as_f64()) else {
            continue;
        };
        if let Some(n) = obj.get_mut(field) {
            *n = serde_json::Number::from_f64(current + delta)
                .map(Value::Number)
                .unwrap_or(Value::Null);
        }
    }
}

fn apply_add_to_set(document: &mut Value, fields: &Map<String, Value>) {
    let Some(obj) = as_object_mut(document) else { return };
    for (field, value) in fields {
        let Some(Value::Array(list)) = obj.get_mut(field) else {
            continue;
        };
        if !is_condition(value) {
            if !list.contains(value) {
                list.push(value.clone());
            }
            continue;
        }
        if let Some(each) = value.get("$each").and_then(Value::as_array) {
            for item in each {
                if !list.contains(item) {
                    list.push(item.clone());
                }
            }
        }
    }
}

fn apply_push(document: &mut Value, fields: &Map<String, Value>) {
    let Some(obj) = as_object_mut(document) else { return };
    for (field, value) in fields {
        let Some(Value::Array(list)) = obj.get_mut(field) else {
            continue;
        };
        if !is_condition(value) {
            list.push(value.clone());
            continue;
        }
        if let Some(each) = value.get("$each").and_then(Value::as_array) {
            list.extend(each.iter().cloned());

            if let Some(direction) = value.get("$sort").and_then(Value::as_i64) {
                list.sort_by(|a, b| {
                    let ord = crate::value_utils::total_order(a, b);
                    if direction == -1 {
                        ord.reverse()
                    } else {
                        ord
                    }
                });
            }

            if let Some(slice) = value.get("$slice").and_then(Value::as_u64) {
                list.truncate(slice as usize);
            }
        }
    }
}

fn apply_pull(document: &mut Value, fields: &Map<String, Value>) {
    let Some(obj) = as_object_mut(document) else { return };
    for (field, pattern) in fields {
        let Some(Value::Array(list)) = obj.get_mut(field) else {
            continue;
        };
        if !is_condition(pattern) {
            list.retain(|item| item != pattern);
        } else {
            list.retain(|item| !value_matches_operators(item, pattern));
        }
    }
}
