//! A single per-field secondary index: an ordered multiset of
//! `(field_value, ObjectId)` pairs supporting the range queries the
//! indexing engine's planner needs.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::document::{ObjectId, Value};
use crate::value_utils::total_order;

/// Result of querying a [`SecondaryIndex`] for an operator.
///
/// `Fallback` is the "unspecified, widen to scan" sentinel for `$ne`,
/// `$nin`, and `$exists: false` — operators whose index-only answer would
/// require enumerating everything the index does *not* contain, which is
/// cheaper to leave to a scan plus the mandatory post-extraction filter.
pub enum IndexQuery {
    Ids(BTreeSet<ObjectId>),
    Fallback,
}

#[derive(Debug, Clone, Default)]
pub struct SecondaryIndex {
    /// Sorted by `(value, id)` using [`total_order`] on the value and the
    /// natural string order on the id to keep entries with an equal value
    /// deterministically ordered (and therefore binary-searchable).
    entries: Vec<(Value, ObjectId)>,
}

fn cmp_entries(a: &(Value, ObjectId), value: &Value) -> Ordering {
    total_order(&a.0, value)
}

impl SecondaryIndex {
    pub fn new() -> Self {
        SecondaryIndex { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lower_bound(&self, value: &Value) -> usize {
        self.entries
            .partition_point(|entry| cmp_entries(entry, value) == Ordering::Less)
    }

    fn upper_bound(&self, value: &Value) -> usize {
        self.entries
            .partition_point(|entry| cmp_entries(entry, value) != Ordering::Greater)
    }

    pub fn add(&mut self, value: Value, id: ObjectId) {
        let mut pos = self.lower_bound(&value);
        while pos < self.entries.len()
            && cmp_entries(&self.entries[pos], &value) == Ordering::Equal
            && self.entries[pos].1 < id
        {
            pos += 1;
        }
        self.entries.insert(pos, (value, id));
    }

    pub fn remove(&mut self, value: &Value, id: &ObjectId) {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|(v, i)| total_order(v, value) == Ordering::Equal && i == id)
        {
            self.entries.remove(pos);
        }
    }

    fn ids_in(&self, start: usize, end: usize) -> BTreeSet<ObjectId> {
        self.entries[start..end].iter().map(|(_, id)| id.clone()).collect()
    }

    pub fn query(&self, operator: &str, value: &Value) -> IndexQuery {
        match operator {
            "$eq" => {
                let s = self.lower_bound(value);
                let e = self.upper_bound(value);
                IndexQuery::Ids(self.ids_in(s, e))
            }
            "$gt" => {
                let i = self.upper_bound(value);
                IndexQuery::Ids(self.ids_in(i, self.entries.len()))
            }
            "$gte" => {
                let i = self.lower_bound(value);
                IndexQuery::Ids(self.ids_in(i, self.entries.len()))
            }
            "$lt" => {
                let i = self.lower_bound(value);
                IndexQuery::Ids(self.ids_in(0, i))
            }
            "$lte" => {
                let i = self.upper_bound(value);
                IndexQuery::Ids(self.ids_in(0, i))
            }
            "$exists" => {
                if value.as_bool() == Some(true) {
                    IndexQuery::Ids(self.ids_in(0, self.entries.len()))
                } else {
                    IndexQuery::Fallback
                }
            }
            "$in" => {
                let mut ids = BTreeSet::new();
                if let Some(items) = value.as_array() {
                    for item in items {
                        let s = self.lower_bound(item);
                        let e = self.upper_bound(item);
                        ids.extend(self.ids_in(s, e));
                    }
                }
                IndexQuery::Ids(ids)
            }
            "$ne" | "$nin" => IndexQuery::Fallback,
            _ => IndexQuery::Fallback,
        }
    }
}
