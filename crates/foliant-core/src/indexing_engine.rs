//! Owns the root identity index and every per-(database, collection, field)
//! secondary index, and translates filter ASTs into [`ReadPlan`]s.
//!
//! The root index and the secondary-index table are each a [`DashMap`] keyed
//! flat (no nested `HashMap<HashMap<HashMap>>>`), so structural changes to
//! one collection's indexes never contend with reads or writes against a
//! different collection — the concurrency model only asks for a coarse lock
//! around *structural* changes (create/drop index), and per-entry sharding
//! gives that without a single engine-wide mutex.

use std::collections::BTreeSet;

use dashmap::DashMap;
use serde_json::json;

use crate::document::{ObjectId, Value};
use crate::error::{FoliantError, Result};
use crate::index::{IndexQuery, SecondaryIndex};
use crate::plan::{LookupKey, ReadPlan};
use crate::value_utils::is_condition;

type IndexKeyTuple = (String, String, String); // (database, collection, field)

#[derive(Debug, Clone)]
pub struct IndexMetadata {
    pub id: String,
    pub database: String,
    pub collection: String,
    pub field: String,
    pub index_type: i64,
}

#[derive(Debug, Clone)]
pub struct IndexListEntry {
    pub id: String,
    pub field: String,
    pub index_type: i64,
    pub size: usize,
}

pub struct IndexingEngine {
    root_index: DashMap<ObjectId, LookupKey>,
    indexes: DashMap<IndexKeyTuple, SecondaryIndex>,
    indexes_meta: DashMap<String, IndexMetadata>,
}

impl IndexingEngine {
    pub fn new() -> Self {
        IndexingEngine {
            root_index: DashMap::new(),
            indexes: DashMap::new(),
            indexes_meta: DashMap::new(),
        }
    }

    /// Allocate a new index on `field` for `(db, coll)`. Returns `Ok(None)`
    /// if one already exists for that field (idempotent, like the rest of
    /// this crate's create-if-absent operations).
    pub fn create_index(
        &self,
        db: &str,
        coll: &str,
        field: &str,
        index_type: i64,
    ) -> Result<Option<String>> {
        if index_type != 1 {
            return Err(FoliantError::UnsupportedIndexType(index_type));
        }

        let key = (db.to_string(), coll.to_string(), field.to_string());
        if self.indexes.contains_key(&key) {
            return Ok(None);
        }

        let id = ObjectId::new().to_string();
        self.indexes.insert(key, SecondaryIndex::new());
        self.indexes_meta.insert(
            id.clone(),
            IndexMetadata {
                id: id.clone(),
                database: db.to_string(),
                collection: coll.to_string(),
                field: field.to_string(),
                index_type,
            },
        );
        Ok(Some(id))
    }

    pub fn delete_index(&self, db: &str, coll: &str, index_id: &str) -> bool {
        let Some((_, meta)) = self.indexes_meta.remove(index_id) else {
            return false;
        };
        if meta.database != db || meta.collection != coll {
            // Not this collection's index; put the metadata back untouched.
            self.indexes_meta.insert(index_id.to_string(), meta);
            return false;
        }
        self.indexes
            .remove(&(db.to_string(), coll.to_string(), meta.field))
            .is_some()
    }

    pub fn get_indexes_list(&self, db: &str, coll: &str) -> Vec<IndexListEntry> {
        self.indexes_meta
            .iter()
            .filter(|entry| entry.database == db && entry.collection == coll)
            .map(|entry| {
                let size = self
                    .indexes
                    .get(&(db.to_string(), coll.to_string(), entry.field.clone()))
                    .map(|idx| idx.len())
                    .unwrap_or(0);
                IndexListEntry {
                    id: entry.id.clone(),
                    field: entry.field.clone(),
                    index_type: entry.index_type,
                    size,
                }
            })
            .collect()
    }

    pub fn insert_documents(&self, db: &str, coll: &str, documents: &[(Value, LookupKey)]) {
        for (doc, lookup_key) in documents {
            if let Some(id) = crate::document::extract_object_id(doc) {
                self.root_index.insert(id, *lookup_key);
            }
        }

        let Some(fields) = doc_object_fields(documents) else {
            return;
        };

        for field in fields {
            let key = (db.to_string(), coll.to_string(), field.clone());
            let Some(mut index) = self.indexes.get_mut(&key) else {
                continue;
            };
            for (doc, _) in documents {
                let (Some(id), Some(value)) =
                    (crate::document::extract_object_id(doc), doc.get(&field))
                else {
                    continue;
                };
                index.add(value.clone(), id);
            }
        }
    }

    pub fn delete_documents(&self, db: &str, coll: &str, documents: &[Value]) {
        for doc in documents {
            if let Some(id) = crate::document::extract_object_id(doc) {
                self.root_index.remove(&id);
            }
        }

        let fields: Vec<String> = self
            .indexes
            .iter()
            .filter(|entry| entry.key().0 == db && entry.key().1 == coll)
            .map(|entry| entry.key().2.clone())
            .collect();

        for field in fields {
            let key = (db.to_string(), coll.to_string(), field.clone());
            let Some(mut index) = self.indexes.get_mut(&key) else {
                continue;
            };
            for doc in documents {
                let (Some(id), Some(value)) =
                    (crate::document::extract_object_id(doc), doc.get(&field))
                else {
                    continue;
                };
                index.remove(value, &id);
            }
        }
    }

    /// Translate `filter` into a [`ReadPlan`], recursively descending gate
    /// operators and AND-folding every top-level field (MongoDB's implicit
    /// AND across sibling keys) and every operator within a single field's
    /// pattern.
    pub fn query(&self, db: &str, coll: &str, plan: ReadPlan, filter: &Value) -> ReadPlan {
        let filter_map = match filter.as_object() {
            Some(map) if !map.is_empty() => map,
            _ => return plan,
        };

        let mut result = plan;
        for (field, pattern) in filter_map {
            let pattern_is_condition = is_condition(pattern);
            let field_is_gate = field.starts_with('$');

            if !pattern_is_condition && !field_is_gate {
                let sub = self.field_query(db, coll, field, &json!({"$eq": pattern}));
                result = result.and(sub);
                continue;
            }

            if field_is_gate {
                let sub_filters: Vec<&Value> = pattern.as_array().into_iter().flatten().collect();
                let folded = match field.as_str() {
                    "$and" => sub_filters
                        .into_iter()
                        .map(|f| self.query(db, coll, ReadPlan::scan(0), f))
                        .reduce(ReadPlan::and),
                    "$or" => sub_filters
                        .into_iter()
                        .map(|f| self.query(db, coll, ReadPlan::scan(0), f))
                        .reduce(ReadPlan::or),
                    "$nor" => sub_filters
                        .into_iter()
                        .map(|f| self.query(db, coll, ReadPlan::scan(0), f))
                        .reduce(ReadPlan::or)
                        .map(ReadPlan::not),
                    _ => None,
                };
                if let Some(folded) = folded {
                    result = result.and(folded);
                }
                continue;
            }

            // `pattern` is an operator map, e.g. {"$gt": 1, "$lt": 5, "$not": {...}}.
            if let Some(sub_expr) = pattern.get("$not") {
                let mut single_field = serde_json::Map::new();
                single_field.insert(field.clone(), sub_expr.clone());
                let negated = self
                    .query(db, coll, ReadPlan::scan(0), &Value::Object(single_field))
                    .not();
                result = result.and(negated);
            }

            for op in ["$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$exists", "$in", "$nin"] {
                if let Some(value) = pattern.get(op) {
                    let mut single_op = serde_json::Map::new();
                    single_op.insert(op.to_string(), value.clone());
                    let sub = self.field_query(db, coll, field, &Value::Object(single_op));
                    result = result.and(sub);
                }
            }
        }

        result
    }

    /// Resolve a single `{field: {operator: value}}` pattern against this
    /// field's secondary index, or the root index for the `_id` shortcut, or
    /// a bare scan if neither applies.
    fn field_query(&self, db: &str, coll: &str, field: &str, expr: &Value) -> ReadPlan {
        let key = (db.to_string(), coll.to_string(), field.to_string());

        let Some(index) = self.indexes.get(&key) else {
            if field == "_id" {
                if let Some(("$eq", value)) = expr.as_object().and_then(|m| {
                    m.iter().next().map(|(k, v)| (k.as_str(), v))
                }) {
                    if let Some(id_str) = value.as_str() {
                        let id = ObjectId::from_string(id_str);
                        return match self.root_index.get(&id) {
                            Some(lookup_key) => {
                                ReadPlan::indexed(BTreeSet::from([*lookup_key]))
                            }
                            None => ReadPlan::empty(),
                        };
                    }
                }
            }
            return ReadPlan::scan(0);
        };

        let Some((operator, value)) = expr.as_object().and_then(|m| m.iter().next()) else {
            return ReadPlan::scan(0);
        };

        match index.query(operator, value) {
            IndexQuery::Fallback => ReadPlan::scan(0),
            IndexQuery::Ids(ids) => {
                if ids.is_empty() {
                    return ReadPlan::empty();
                }
                let lookup_keys: BTreeSet<LookupKey> = ids
                    .iter()
                    .filter_map(|id| self.root_index.get(id).map(|entry| *entry))
                    .collect();
                if lookup_keys.is_empty() {
                    ReadPlan::empty()
                } else {
                    ReadPlan::indexed(lookup_keys)
                }
            }
        }
    }
}

impl Default for IndexingEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn doc_object_fields(documents: &[(Value, LookupKey)]) -> Option<Vec<String>> {
    let mut fields = std::collections::BTreeSet::new();
    for (doc, _) in documents {
        if let Some(obj) = doc.as_object() {
            fields.extend(obj.keys().cloned());
        }
    }
    if fields.is_empty() {
        None
    } else {
        Some(fields.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_index_is_idempotent() {
        let engine = IndexingEngine::new();
        let first = engine.create_index("db", "coll", "age", 1).unwrap();
        assert!(first.is_some());
        let second = engine.create_index("db", "coll", "age", 1).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn create_index_rejects_unsupported_type() {
        let engine = IndexingEngine::new();
        let result = engine.create_index("db", "coll", "age", 2);
        assert!(matches!(result, Err(FoliantError::UnsupportedIndexType(2))));
    }

    #[test]
    fn insert_then_gt_query_matches_without_io_examples() {
        let engine = IndexingEngine::new();
        engine.create_index("db", "coll", "age", 1).unwrap();

        let docs = vec![
            (json!({"_id": "jon", "age": 22}), 0u64),
            (json!({"_id": "dave", "age": 15}), 100u64),
            (json!({"_id": "mosh", "age": 11}), 200u64),
            (json!({"_id": "nina", "age": 25}), 300u64),
        ];
        engine.insert_documents("db", "coll", &docs);

        let plan = engine.query(
            "db",
            "coll",
            ReadPlan::scan(0),
            &json!({"age": {"$gt": 20}}),
        );
        assert!(plan.is_indexed());
        let keys = plan.indexes.unwrap();
        assert_eq!(keys, BTreeSet::from([0u64, 300u64]));
    }

    #[test]
    fn impossible_range_short_circuits_to_ended_empty_plan() {
        let engine = IndexingEngine::new();
        engine.create_index("db", "coll", "age", 1).unwrap();
        engine.insert_documents(
            "db",
            "coll",
            &[(json!({"_id": "jon", "age": 22}), 0u64)],
        );

        let plan = engine.query(
            "db",
            "coll",
            ReadPlan::scan(0),
            &json!({"age": {"$lt": 0}}),
        );
        assert!(plan.ended());
        assert!(!plan.is_indexed() || plan.indexes.as_ref().unwrap().is_empty());
    }

    #[test]
    fn id_shortcut_resolves_directly_through_root_index() {
        let engine = IndexingEngine::new();
        engine.insert_documents("db", "coll", &[(json!({"_id": "abc"}), 42u64)]);

        let plan = engine.query("db", "coll", ReadPlan::scan(0), &json!({"_id": "abc"}));
        assert_eq!(plan.indexes, Some(BTreeSet::from([42u64])));
    }

    #[test]
    fn no_index_falls_back_to_scan() {
        let engine = IndexingEngine::new();
        let plan = engine.query("db", "coll", ReadPlan::scan(0), &json!({"age": {"$gt": 1}}));
        assert!(!plan.is_indexed());
        assert_eq!(plan.offset, Some(0));
    }

    #[test]
    fn delete_documents_removes_from_root_and_secondary_indexes() {
        let engine = IndexingEngine::new();
        engine.create_index("db", "coll", "age", 1).unwrap();
        let doc = json!({"_id": "jon", "age": 22});
        engine.insert_documents("db", "coll", &[(doc.clone(), 0u64)]);
        engine.delete_documents("db", "coll", &[doc]);

        let plan = engine.query("db", "coll", ReadPlan::scan(0), &json!({"_id": "jon"}));
        assert!(plan.ended());
    }
}
