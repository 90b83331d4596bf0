//! Read-plan algebra: which lookup keys a command needs to visit.
//!
//! A [`ReadPlan`] is either a scan (walk forward from a byte offset) or an
//! explicit set of lookup keys (random access via a secondary index), plus
//! an `exclude_indexes` set that the storage engine's scan loop never
//! touches directly — it is consulted by the post-extraction filter pass.
//! `AND`/`OR`/`NOT` combine plans conservatively: on any ambiguity they
//! widen rather than narrow, and rely on re-running the match predicate
//! against whatever comes back.

use std::collections::BTreeSet;

pub type LookupKey = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPlan {
    pub offset: Option<LookupKey>,
    pub indexes: Option<BTreeSet<LookupKey>>,
    pub exclude_indexes: BTreeSet<LookupKey>,
    pub chunk_size: Option<usize>,
    ended: bool,
}

impl ReadPlan {
    /// A plan that scans the collection sequentially starting at `offset`.
    pub fn scan(offset: LookupKey) -> Self {
        ReadPlan {
            offset: Some(offset),
            indexes: None,
            exclude_indexes: BTreeSet::new(),
            chunk_size: None,
            ended: false,
        }
    }

    /// A plan that visits exactly the given lookup keys.
    pub fn indexed(indexes: BTreeSet<LookupKey>) -> Self {
        ReadPlan {
            offset: None,
            indexes: Some(indexes),
            exclude_indexes: BTreeSet::new(),
            chunk_size: None,
            ended: false,
        }
    }

    /// A plan known in advance to match nothing: a scan already marked
    /// ended, so the execution engine performs no I/O at all.
    pub fn empty() -> Self {
        let mut plan = Self::scan(0);
        plan.end();
        plan
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn is_indexed(&self) -> bool {
        self.indexes.is_some()
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    pub fn end(&mut self) {
        self.ended = true;
    }

    /// `AND`: visit only keys in both. Indexed beats scan (a scan can't be
    /// intersected precisely, so the indexed side's exact set is kept);
    /// between two scans, the larger offset is the tighter lower bound.
    pub fn and(self, other: Self) -> Self {
        let exclude_indexes = self
            .exclude_indexes
            .union(&other.exclude_indexes)
            .cloned()
            .collect();
        let chunk_size = self.chunk_size.or(other.chunk_size);

        let (offset, indexes) = match (self.indexes, other.indexes) {
            (Some(a), Some(b)) => (None, Some(a.intersection(&b).cloned().collect())),
            (Some(a), None) => (None, Some(a)),
            (None, Some(b)) => (None, Some(b)),
            (None, None) => {
                let offset = match (self.offset, other.offset) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (a, None) => a,
                    (None, b) => b,
                };
                (offset, None)
            }
        };

        ReadPlan {
            offset,
            indexes,
            exclude_indexes,
            chunk_size,
            ended: self.ended || other.ended,
        }
    }

    /// `OR`: visit keys in either. An indexed set can only be unioned
    /// precisely with another indexed set; if either side is a scan, the
    /// scan wins (it already covers everything from its offset onward).
    pub fn or(self, other: Self) -> Self {
        let exclude_indexes = self
            .exclude_indexes
            .intersection(&other.exclude_indexes)
            .cloned()
            .collect();
        let chunk_size = self.chunk_size.or(other.chunk_size);

        let (offset, indexes) = match (self.indexes, other.indexes) {
            (Some(a), Some(b)) => (None, Some(a.union(&b).cloned().collect())),
            (Some(_), None) => (other.offset, None),
            (None, Some(_)) => (self.offset, None),
            (None, None) => {
                let offset = match (self.offset, other.offset) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, None) => a,
                    (None, b) => b,
                };
                (offset, None)
            }
        };

        ReadPlan {
            offset,
            indexes,
            exclude_indexes,
            chunk_size,
            ended: self.ended && other.ended,
        }
    }

    /// `NOT`: swap `indexes` and `exclude_indexes`. If the plan was a scan
    /// to begin with, the complement of a scan is still a scan over the
    /// same range (the accumulated exclusions already tell the
    /// post-extraction filter what to reject). If swapping leaves an empty
    /// `indexes` set, collapse to a full scan from 0 — an empty indexed
    /// complement means "everything", which a scan expresses more directly.
    pub fn not(mut self) -> Self {
        self.ended = false;

        if let Some(indexes) = self.indexes.clone() {
            if !indexes.is_empty() {
                let old_exclude = std::mem::take(&mut self.exclude_indexes);
                self.exclude_indexes = indexes;
                self.indexes = Some(old_exclude);
            }
        }

        if let Some(ref indexes) = self.indexes {
            if indexes.is_empty() {
                self.indexes = None;
                self.offset = Some(0);
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[LookupKey]) -> BTreeSet<LookupKey> {
        values.iter().cloned().collect()
    }

    #[test]
    fn and_intersects_two_indexed_plans() {
        let a = ReadPlan::indexed(set(&[1, 2, 3]));
        let b = ReadPlan::indexed(set(&[2, 3, 4]));
        let result = a.and(b);
        assert_eq!(result.indexes, Some(set(&[2, 3])));
    }

    #[test]
    fn and_keeps_indexed_over_scan() {
        let a = ReadPlan::indexed(set(&[1, 2]));
        let b = ReadPlan::scan(0);
        let result = a.and(b);
        assert_eq!(result.indexes, Some(set(&[1, 2])));
    }

    #[test]
    fn and_of_two_scans_takes_larger_offset() {
        let a = ReadPlan::scan(10);
        let b = ReadPlan::scan(40);
        let result = a.and(b);
        assert_eq!(result.offset, Some(40));
        assert!(result.indexes.is_none());
    }

    #[test]
    fn or_unions_two_indexed_plans() {
        let a = ReadPlan::indexed(set(&[1, 2]));
        let b = ReadPlan::indexed(set(&[2, 3]));
        let result = a.or(b);
        assert_eq!(result.indexes, Some(set(&[1, 2, 3])));
    }

    #[test]
    fn or_with_a_scan_widens_to_scan() {
        let a = ReadPlan::indexed(set(&[1, 2]));
        let b = ReadPlan::scan(0);
        let result = a.or(b);
        assert!(result.indexes.is_none());
        assert_eq!(result.offset, Some(0));
    }

    #[test]
    fn or_of_two_scans_takes_smaller_offset() {
        let a = ReadPlan::scan(10);
        let b = ReadPlan::scan(3);
        let result = a.or(b);
        assert_eq!(result.offset, Some(3));
    }

    #[test]
    fn not_swaps_indexes_and_exclusions() {
        let plan = ReadPlan::indexed(set(&[1, 2]));
        let result = plan.not();
        assert_eq!(result.indexes, Some(set(&[])));
        assert!(result.indexes.as_ref().unwrap().is_empty());
        // empty indexes collapses to a scan from 0
        assert_eq!(result.offset, Some(0));
        assert_eq!(result.exclude_indexes, set(&[1, 2]));
    }

    #[test]
    fn not_of_a_scan_stays_a_scan() {
        let plan = ReadPlan::scan(5);
        let result = plan.not();
        assert_eq!(result.offset, Some(5));
        assert!(result.indexes.is_none());
    }

    #[test]
    fn double_not_is_observationally_equivalent() {
        let plan = ReadPlan::indexed(set(&[1, 2, 3]));
        let result = plan.clone().not().not();
        assert_eq!(result.indexes, plan.indexes);
    }

    #[test]
    fn empty_plan_is_ended_with_no_indexed_keys() {
        let plan = ReadPlan::empty();
        assert!(plan.ended());
        assert!(!plan.is_indexed());
        assert_eq!(plan.offset, Some(0));
    }
}
