//! The six literal end-to-end scenarios (SPEC_FULL.md §8), driven through
//! the public `Client` / `Database` / `Collection` facade exactly as an
//! external caller would use it.

use std::collections::HashSet;

use foliant_core::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

fn collection(name: &str) -> (TempDir, foliant_core::Collection) {
    let dir = TempDir::new().unwrap();
    let client = Client::with_default_database(dir.path(), Some("db".into())).unwrap();
    let db = client.default_database().unwrap();
    let coll = db.collection(name).unwrap();
    (dir, coll)
}

#[test]
fn scenario_1_single_insert_find_and_find_with_no_match() {
    let (_dir, coll) = collection("scenario1");
    coll.insert_one(json!({"a": 1, "b": 2})).unwrap();

    let matches: Vec<Value> = coll
        .find(json!({"a": 1}), json!({"_id": 0}))
        .unwrap()
        .map(|r| r.unwrap().value)
        .collect();
    assert_eq!(matches, vec![json!({"a": 1, "b": 2})]);

    let none: Vec<Value> = coll
        .find(json!({"a": 4}), json!({}))
        .unwrap()
        .map(|r| r.unwrap().value)
        .collect();
    assert!(none.is_empty());
}

#[test]
fn scenario_2_multiple_inserts_preserve_insertion_order() {
    let (_dir, coll) = collection("scenario2");
    coll.insert_many(vec![
        json!({"a": 1, "b": 2}),
        json!({"a": 1, "b": 3}),
        json!({"a": 1, "b": 4}),
        json!({"a": 5, "b": 2}),
    ])
    .unwrap();

    let matches: Vec<Value> = coll
        .find(json!({"a": 1}), json!({"_id": 0}))
        .unwrap()
        .map(|r| r.unwrap().value)
        .collect();
    assert_eq!(matches, vec![json!({"a": 1, "b": 2}), json!({"a": 1, "b": 3}), json!({"a": 1, "b": 4})]);
}

#[test]
fn scenario_3_update_one_with_inc_then_find_one() {
    let (_dir, coll) = collection("scenario3");
    coll.insert_one(json!({"a": 1})).unwrap();
    let n = coll.update_one(json!({}), json!({"$inc": {"a": 9}})).unwrap();
    assert_eq!(n, 1);

    let found = coll.find_one(json!({"a": 10}), json!({"_id": 0})).unwrap().unwrap();
    assert_eq!(found.value, json!({"a": 10}));
}

#[test]
fn scenario_4_indexed_range_query_returns_matching_set() {
    let (_dir, coll) = collection("scenario4");
    coll.create_index(&json!({"age": 1})).unwrap();
    coll.insert_many(vec![
        json!({"name": "jon", "age": 22}),
        json!({"name": "dave", "age": 15}),
        json!({"name": "mosh", "age": 11}),
        json!({"name": "nina", "age": 25}),
    ])
    .unwrap();

    let matches: HashSet<String> = coll
        .find(json!({"age": {"$gt": 20}}), json!({"_id": 0}))
        .unwrap()
        .map(|r| r.unwrap().value.to_string())
        .collect();
    let expected: HashSet<String> = [json!({"name": "jon", "age": 22}), json!({"name": "nina", "age": 25})]
        .into_iter()
        .map(|v| v.to_string())
        .collect();
    assert_eq!(matches, expected);
}

#[test]
fn scenario_5_indexed_impossible_range_returns_empty() {
    let (_dir, coll) = collection("scenario5");
    coll.create_index(&json!({"age": 1})).unwrap();
    coll.insert_many(vec![
        json!({"name": "jon", "age": 22}),
        json!({"name": "dave", "age": 15}),
        json!({"name": "mosh", "age": 11}),
        json!({"name": "nina", "age": 25}),
    ])
    .unwrap();

    let matches: Vec<Value> = coll
        .find(json!({"age": {"$lt": 0}}), json!({"_id": 0}))
        .unwrap()
        .map(|r| r.unwrap().value)
        .collect();
    assert!(matches.is_empty());
}

#[test]
fn scenario_6_push_each_sort_slice() {
    let (_dir, coll) = collection("scenario6");
    coll.insert_one(json!({"a": [0]})).unwrap();
    coll.update_one(json!({}), json!({"$push": {"a": {"$each": [3, 1, 2], "$sort": 1, "$slice": 3}}})).unwrap();

    let found = coll.find_one(json!({}), json!({"_id": 0})).unwrap().unwrap();
    assert_eq!(found.value, json!({"a": [0, 1, 2]}));
}
