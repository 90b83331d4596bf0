//! Cursor (C7): a one-shot, forward-only iterator over a `find` command's
//! matches. Holds the collection lock only while a chunk is being produced —
//! `fetch_chunk` acquires and releases it once per chunk, never across the
//! gap between two calls to `next()` — so a slow consumer driving the
//! iterator from outside never pins the lock.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::document::{extract_object_id, Document, ObjectId};
use crate::engine::ExecutionEngine;
use crate::error::Result;
use crate::plan::ReadPlan;
use crate::query::{apply_projection, document_filter_match};
use serde_json::Value;

pub struct Cursor {
    engine: Arc<ExecutionEngine>,
    database_name: String,
    collection_name: String,
    filter: Value,
    projection: Value,
    plan: ReadPlan,
    many: bool,
    buffer: VecDeque<Document>,
    closed: bool,
}

impl Cursor {
    pub(crate) fn new(
        engine: Arc<ExecutionEngine>,
        database_name: String,
        collection_name: String,
        filter: Value,
        projection: Value,
        plan: ReadPlan,
        many: bool,
    ) -> Self {
        Cursor {
            engine,
            database_name,
            collection_name,
            filter,
            projection,
            plan,
            many,
            buffer: VecDeque::new(),
            closed: false,
        }
    }

    /// Stop the cursor: no further chunks are fetched, and `next()` yields
    /// nothing from this point on even if the last fetched chunk still had
    /// buffered documents.
    pub fn close(&mut self) {
        self.closed = true;
        self.buffer.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Pull chunks from the engine, running each retrieved document through
    /// the match predicate a second time (the planner is allowed to
    /// over-approximate) and then projection, until the buffer has at least
    /// one document or the plan is exhausted.
    fn fill_buffer(&mut self) -> Result<()> {
        while self.buffer.is_empty() && !self.closed && !self.plan.ended() {
            let chunk = self.engine.fetch_chunk(&self.database_name, &self.collection_name, &mut self.plan)?;
            for (value, _lookup_key) in chunk {
                if !document_filter_match(&value, &self.filter) {
                    continue;
                }
                let id = extract_object_id(&value).unwrap_or_else(ObjectId::new);
                let projected = apply_projection(&value, &self.projection);
                self.buffer.push_back(Document::new(id, projected));
                if !self.many {
                    break;
                }
            }
        }
        Ok(())
    }
}

impl Iterator for Cursor {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }

        if self.buffer.is_empty() {
            if let Err(e) = self.fill_buffer() {
                self.close();
                return Some(Err(e));
            }
        }

        let next = self.buffer.pop_front();
        if next.is_none() || !self.many {
            self.close();
        }
        next.map(Ok)
    }
}
