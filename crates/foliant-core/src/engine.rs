//! Execution engine (C6): drives every command. Owns the per-`(db, coll)`
//! command lock (distinct from, and layered above, the storage engine's own
//! per-call file lock — two independent serialization points acquired in a
//! fixed order is simpler than sharing one lock object across module
//! boundaries, and is deadlock-free regardless) and mediates between the
//! storage engine, the indexing engine, and the filter/update/projection
//! interpreter.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use serde_json::Value;

use crate::command::{Command, CommandOutcome};
use crate::cursor::Cursor;
use crate::document::ObjectId;
use crate::error::{FoliantError, Result};
use crate::indexing_engine::{IndexListEntry, IndexingEngine};
use crate::plan::{LookupKey, ReadPlan};
use crate::query::{document_filter_match, update_document_with_override};
use crate::storage::StorageEngine;

/// ~5 KiB worth of documents, matching the chunk size the system this crate
/// replaces defaults to.
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024;

pub struct ExecutionEngine {
    storage: StorageEngine,
    indexing: Option<IndexingEngine>,
    locks: DashMap<(String, String), ReentrantMutex<()>>,
    chunk_size: usize,
}

impl ExecutionEngine {
    pub fn new(storage: StorageEngine, indexing: Option<IndexingEngine>) -> Self {
        Self::with_chunk_size(storage, indexing, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(storage: StorageEngine, indexing: Option<IndexingEngine>, chunk_size: usize) -> Self {
        ExecutionEngine {
            storage,
            indexing,
            locks: DashMap::new(),
            chunk_size,
        }
    }

    fn with_lock<T>(&self, db: &str, coll: &str, body: impl FnOnce() -> Result<T>) -> Result<T> {
        let key = (db.to_string(), coll.to_string());
        self.locks.entry(key.clone()).or_insert_with(|| ReentrantMutex::new(()));
        let entry = self.locks.get(&key).expect("lock entry just inserted");
        let _guard = entry.lock();
        body()
    }

    fn require_collection(&self, db: &str, coll: &str) -> Result<()> {
        if !self.storage.collection_exists(db, coll) {
            return Err(FoliantError::CollectionNotFound(db.to_string(), coll.to_string()));
        }
        Ok(())
    }

    /// Fetch one raw chunk under the command lock. Called by `Cursor`
    /// between yields, so the lock is held only for the duration of a
    /// single chunk fetch — never across externally-driven iteration.
    pub(crate) fn fetch_chunk(&self, db: &str, coll: &str, plan: &mut ReadPlan) -> Result<Vec<(Value, LookupKey)>> {
        self.with_lock(db, coll, || self.storage.get_documents(db, coll, plan))
    }

    pub fn execute(self: Arc<Self>, command: Command) -> Result<CommandOutcome> {
        match command {
            Command::CreateDatabase { database_name } => {
                Ok(CommandOutcome::Created(self.storage.create_database(&database_name)?))
            }
            Command::DropDatabase { database_name } => {
                Ok(CommandOutcome::Created(self.storage.drop_database(&database_name)?))
            }
            Command::CreateCollection { database_name, collection_name } => {
                let created = self.with_lock(&database_name, &collection_name, || {
                    self.storage.create_collection(&database_name, &collection_name)
                })?;
                Ok(CommandOutcome::Created(created))
            }
            Command::DropCollection { database_name, collection_name } => {
                let dropped = self.with_lock(&database_name, &collection_name, || {
                    self.storage.drop_collection(&database_name, &collection_name)
                })?;
                Ok(CommandOutcome::Created(dropped))
            }
            Command::GetCollectionList { database_name } => {
                Ok(CommandOutcome::CollectionList(self.storage.get_collections_list(&database_name)?))
            }
            Command::Insert { database_name, collection_name, documents } => {
                let ids = self.insert(&database_name, &collection_name, documents)?;
                Ok(CommandOutcome::InsertedIds(ids))
            }
            Command::Find { database_name, collection_name, filter, fields, many } => {
                let cursor = self.find(database_name, collection_name, filter, fields, many)?;
                Ok(CommandOutcome::Cursor(cursor))
            }
            Command::Update { database_name, collection_name, filter, r#override, many } => {
                let n = self.update(&database_name, &collection_name, &filter, &r#override, many)?;
                Ok(CommandOutcome::ModifiedCount(n))
            }
            Command::Replace { database_name, collection_name, filter, replacement, many } => {
                let n = self.replace(&database_name, &collection_name, &filter, &replacement, many)?;
                Ok(CommandOutcome::ModifiedCount(n))
            }
            Command::Delete { database_name, collection_name, filter, many } => {
                let n = self.delete(&database_name, &collection_name, &filter, many)?;
                Ok(CommandOutcome::DeletedCount(n))
            }
            Command::CreateIndex { database_name, collection_name, field, index_type } => {
                let id = self.create_index(&database_name, &collection_name, &field, index_type)?;
                Ok(CommandOutcome::IndexId(id))
            }
            Command::DeleteIndex { database_name, collection_name, index_id } => {
                Ok(CommandOutcome::IndexDeleted(self.delete_index(&database_name, &collection_name, &index_id)))
            }
            Command::GetIndexList { database_name, collection_name } => {
                Ok(CommandOutcome::IndexList(self.get_indexes_list(&database_name, &collection_name)))
            }
        }
    }

    fn plan_for(&self, db: &str, coll: &str, filter: &Value) -> ReadPlan {
        let base = ReadPlan::scan(0).with_chunk_size(self.chunk_size);
        match &self.indexing {
            Some(indexing) => indexing.query(db, coll, base, filter),
            None => base,
        }
    }

    pub fn insert(&self, db: &str, coll: &str, mut documents: Vec<Value>) -> Result<Vec<ObjectId>> {
        self.require_collection(db, coll)?;

        let mut ids = Vec::with_capacity(documents.len());
        for doc in documents.iter_mut() {
            let id = ObjectId::new();
            if let Some(obj) = doc.as_object_mut() {
                obj.insert("_id".to_string(), Value::from(id.clone()));
            }
            ids.push(id);
        }

        self.with_lock(db, coll, || {
            let lookup_keys = self.storage.insert_documents(db, coll, &documents)?;
            if let Some(indexing) = &self.indexing {
                let pairs: Vec<(Value, LookupKey)> = documents.iter().cloned().zip(lookup_keys).collect();
                indexing.insert_documents(db, coll, &pairs);
            }
            Ok(())
        })?;

        Ok(ids)
    }

    /// Plans via the indexing engine and returns a lazily-draining `Cursor`.
    /// `require_collection` runs eagerly so a bad collection name fails at
    /// call time rather than on first iteration.
    pub fn find(
        self: Arc<Self>,
        database_name: String,
        collection_name: String,
        filter: Value,
        fields: Value,
        many: bool,
    ) -> Result<Cursor> {
        self.require_collection(&database_name, &collection_name)?;
        let plan = self.plan_for(&database_name, &collection_name, &filter);
        Ok(Cursor::new(self, database_name, collection_name, filter, fields, plan, many))
    }

    pub fn update(&self, db: &str, coll: &str, filter: &Value, r#override: &Value, many: bool) -> Result<usize> {
        self.require_collection(db, coll)?;
        self.update_or_replace(db, coll, filter, many, |doc| {
            let mut updated = update_document_with_override(doc, r#override);
            if let Some(obj) = updated.as_object_mut() {
                if let Some(id) = doc.get("_id") {
                    obj.insert("_id".to_string(), id.clone());
                }
            }
            updated
        })
    }

    pub fn replace(&self, db: &str, coll: &str, filter: &Value, replacement: &Value, many: bool) -> Result<usize> {
        self.require_collection(db, coll)?;
        self.update_or_replace(db, coll, filter, many, |_old| {
            let mut replacement = replacement.clone();
            if let Some(obj) = replacement.as_object_mut() {
                obj.insert("_id".to_string(), Value::from(ObjectId::new()));
            }
            replacement
        })
    }

    /// Shared chunk-by-chunk driver for `update` and `replace`: plan, read a
    /// chunk, compute each matched document's replacement, skip no-op
    /// writes, submit the rest as a batch, then inform the indexing engine
    /// (delete the old entries, insert the new ones).
    ///
    /// A chunk can contain more than one filter match even when `many` is
    /// false: the first match might turn out to be a no-op (`compute_new`
    /// produces an identical document), so the whole chunk's matches are
    /// collected and only the processing loop below stops at the first
    /// *actual* change, not the first match.
    fn update_or_replace(
        &self,
        db: &str,
        coll: &str,
        filter: &Value,
        many: bool,
        mut compute_new: impl FnMut(&Value) -> Value,
    ) -> Result<usize> {
        let mut plan = self.plan_for(db, coll, filter);
        let mut total = 0usize;

        loop {
            let matched = self.with_lock(db, coll, || {
                let chunk = self.storage.get_documents(db, coll, &mut plan)?;
                let matched: Vec<_> = chunk
                    .into_iter()
                    .filter(|(doc, _)| document_filter_match(doc, filter))
                    .collect();
                Ok(matched)
            })?;

            if !matched.is_empty() {
                let mut overwrites = Vec::with_capacity(matched.len());
                let mut old_docs = Vec::with_capacity(matched.len());
                for (doc, lookup_key) in &matched {
                    let new_doc = compute_new(doc);
                    if &new_doc == doc {
                        continue;
                    }
                    overwrites.push((*lookup_key, new_doc));
                    old_docs.push(doc.clone());
                    if !many {
                        break;
                    }
                }

                if !overwrites.is_empty() {
                    let new_keys = self.with_lock(db, coll, || self.storage.update_documents(db, coll, &overwrites))?;

                    if let Some(indexing) = &self.indexing {
                        indexing.delete_documents(db, coll, &old_docs);
                        let new_pairs: Vec<(Value, LookupKey)> = overwrites
                            .into_iter()
                            .map(|(_, doc)| doc)
                            .zip(new_keys)
                            .collect();
                        indexing.insert_documents(db, coll, &new_pairs);
                    }

                    total += old_docs.len();
                }
            }

            if !many && total > 0 {
                break;
            }
            if plan.ended() {
                break;
            }
        }

        Ok(total)
    }

    pub fn delete(&self, db: &str, coll: &str, filter: &Value, many: bool) -> Result<usize> {
        self.require_collection(db, coll)?;
        let mut plan = self.plan_for(db, coll, filter);
        let mut total = 0usize;

        loop {
            let matched = self.with_lock(db, coll, || {
                let chunk = self.storage.get_documents(db, coll, &mut plan)?;
                let mut matched = Vec::new();
                for (doc, lookup_key) in chunk {
                    if document_filter_match(&doc, filter) {
                        matched.push((doc, lookup_key));
                        if !many {
                            break;
                        }
                    }
                }
                Ok(matched)
            })?;

            if !matched.is_empty() {
                let keys: Vec<LookupKey> = matched.iter().map(|(_, k)| *k).collect();
                let docs: Vec<Value> = matched.into_iter().map(|(d, _)| d).collect();

                self.with_lock(db, coll, || self.storage.delete_documents(db, coll, &keys))?;
                if let Some(indexing) = &self.indexing {
                    indexing.delete_documents(db, coll, &docs);
                }
                total += keys.len();
            }

            if !many && total > 0 {
                break;
            }
            if plan.ended() {
                break;
            }
        }

        Ok(total)
    }

    /// Allocates the index, then backfills it from every existing document.
    /// The backfill scan bypasses the planner entirely (there is nothing
    /// useful to plan against before the index exists) and feeds every
    /// chunk straight into `insert_documents`, which already no-ops for
    /// fields that aren't indexed.
    pub fn create_index(&self, db: &str, coll: &str, field: &str, index_type: i64) -> Result<Option<String>> {
        self.require_collection(db, coll)?;
        let Some(indexing) = &self.indexing else {
            return Ok(None);
        };

        let id = self.with_lock(db, coll, || indexing.create_index(db, coll, field, index_type))?;
        if id.is_none() {
            return Ok(None);
        }

        let mut plan = ReadPlan::scan(0).with_chunk_size(self.chunk_size);
        loop {
            let chunk = self.with_lock(db, coll, || self.storage.get_documents(db, coll, &mut plan))?;
            if !chunk.is_empty() {
                indexing.insert_documents(db, coll, &chunk);
            }
            if plan.ended() {
                break;
            }
        }

        Ok(id)
    }

    pub fn delete_index(&self, db: &str, coll: &str, index_id: &str) -> bool {
        match &self.indexing {
            Some(indexing) => indexing.delete_index(db, coll, index_id),
            None => false,
        }
    }

    pub fn get_indexes_list(&self, db: &str, coll: &str) -> Vec<IndexListEntry> {
        match &self.indexing {
            Some(indexing) => indexing.get_indexes_list(db, coll),
            None => Vec::new(),
        }
    }
}
