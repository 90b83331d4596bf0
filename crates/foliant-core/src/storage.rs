//! Append-log storage engine: maps each collection to a single UTF-8,
//! newline-delimited file, and every document to a byte offset (its lookup
//! key) within that file.
//!
//! A document's line is either a JSON object terminated by `\n`, or a
//! tombstone: the ASCII byte `0` repeated to the line's original byte length
//! followed by `\n`. Updates tombstone the old line and append a fresh one;
//! deletes only tombstone. Nothing is ever compacted.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use parking_lot::ReentrantMutex;
use serde_json::Value;

use crate::error::{FoliantError, Result};
use crate::plan::{LookupKey, ReadPlan};
use crate::{log_debug, log_trace};

pub struct StorageEngine {
    root: PathBuf,
    locks: DashMap<(String, String), ReentrantMutex<()>>,
}

impl StorageEngine {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            fs::create_dir_all(&root)?;
        }
        Ok(StorageEngine {
            root,
            locks: DashMap::new(),
        })
    }

    fn database_path(&self, db: &str) -> PathBuf {
        self.root.join(db)
    }

    fn collection_path(&self, db: &str, coll: &str) -> PathBuf {
        self.database_path(db).join(coll)
    }

    pub fn database_exists(&self, db: &str) -> bool {
        self.database_path(db).is_dir()
    }

    pub fn collection_exists(&self, db: &str, coll: &str) -> bool {
        self.collection_path(db, coll).is_file()
    }

    pub fn create_database(&self, db: &str) -> Result<bool> {
        if self.database_exists(db) {
            return Ok(false);
        }
        fs::create_dir(self.database_path(db))?;
        Ok(true)
    }

    pub fn drop_database(&self, db: &str) -> Result<bool> {
        if !self.database_exists(db) {
            return Ok(false);
        }
        fs::remove_dir_all(self.database_path(db))?;
        Ok(true)
    }

    pub fn create_collection(&self, db: &str, coll: &str) -> Result<bool> {
        if !self.database_exists(db) {
            fs::create_dir(self.database_path(db))?;
        }
        if self.collection_exists(db, coll) {
            return Ok(false);
        }
        File::create(self.collection_path(db, coll))?;
        Ok(true)
    }

    pub fn drop_collection(&self, db: &str, coll: &str) -> Result<bool> {
        if !self.collection_exists(db, coll) {
            return Ok(false);
        }
        fs::remove_file(self.collection_path(db, coll))?;
        self.locks.remove(&(db.to_string(), coll.to_string()));
        Ok(true)
    }

    pub fn get_collections_list(&self, db: &str) -> Result<Vec<String>> {
        if !self.database_exists(db) {
            return Err(FoliantError::DatabaseNotFound(db.to_string()));
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(self.database_path(db))? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    /// Run `body` while holding the exclusive lock for `(db, coll)`. The
    /// lock map entry is created lazily and never removed except by
    /// `drop_collection`, matching the collection file's own lifetime.
    fn with_collection_lock<T>(&self, db: &str, coll: &str, body: impl FnOnce() -> Result<T>) -> Result<T> {
        let key = (db.to_string(), coll.to_string());
        self.locks.entry(key.clone()).or_insert_with(|| ReentrantMutex::new(()));
        let entry = self.locks.get(&key).expect("lock entry just inserted");
        let _guard = entry.lock();
        log_debug!("acquired collection lock for {}.{}", db, coll);
        let result = body();
        log_debug!("released collection lock for {}.{}", db, coll);
        result
    }

    fn is_tombstone(line: &str) -> bool {
        line.starts_with('0')
    }

    /// Read one chunk of documents according to `plan`, mutating it in
    /// place to record progress (a new `offset` for scan mode, a shrunk
    /// `indexes` set for indexed mode) and setting `ended` once there is
    /// nothing left to read.
    pub fn get_documents(
        &self,
        db: &str,
        coll: &str,
        plan: &mut ReadPlan,
    ) -> Result<Vec<(Value, LookupKey)>> {
        if plan.ended() {
            return Ok(Vec::new());
        }
        let path = self.collection_path(db, coll);

        self.with_collection_lock(db, coll, || {
            if let Some(indexes) = plan.indexes.clone() {
                self.get_documents_indexed(&path, plan, indexes)
            } else {
                let offset = plan.offset.unwrap_or(0);
                self.get_documents_scan(&path, plan, offset)
            }
        })
    }

    fn get_documents_indexed(
        &self,
        path: &Path,
        plan: &mut ReadPlan,
        mut indexes: BTreeSet<LookupKey>,
    ) -> Result<Vec<(Value, LookupKey)>> {
        let mut file = File::open(path)?;
        let quota = plan.chunk_size.unwrap_or(usize::MAX);
        let mut out = Vec::new();

        while out.len() < quota {
            let Some(&key) = indexes.iter().next() else {
                break;
            };
            indexes.remove(&key);

            if plan.exclude_indexes.contains(&key) {
                continue;
            }

            file.seek(SeekFrom::Start(key))?;
            let mut reader = BufReader::new(&mut file);
            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                continue;
            }
            if Self::is_tombstone(&line) {
                continue;
            }
            let value: Value = serde_json::from_str(line.trim_end_matches('\n'))?;
            out.push((value, key));
        }

        let exhausted = indexes.is_empty();
        plan.indexes = Some(indexes);
        if exhausted {
            plan.end();
        }
        Ok(out)
    }

    fn get_documents_scan(
        &self,
        path: &Path,
        plan: &mut ReadPlan,
        offset: LookupKey,
    ) -> Result<Vec<(Value, LookupKey)>> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        // One reader for the whole chunk: wrapping a fresh BufReader around
        // the same file handle on every line would discard whatever its
        // predecessor had already buffered past the last line it returned.
        let mut reader = BufReader::new(file);
        let quota = plan.chunk_size.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        let mut position = offset;

        loop {
            if out.len() >= quota {
                break;
            }
            let line_start = position;
            let mut line = String::new();
            let bytes_read = reader.read_line(&mut line)?;
            if bytes_read == 0 {
                plan.offset = Some(position);
                plan.end();
                return Ok(out);
            }
            position += bytes_read as LookupKey;

            if Self::is_tombstone(&line) {
                log_trace!("skipped tombstoned line at offset {}", line_start);
                continue;
            }
            if plan.exclude_indexes.contains(&line_start) {
                continue;
            }
            let value: Value = serde_json::from_str(line.trim_end_matches('\n'))?;
            out.push((value, line_start));
        }

        plan.offset = Some(position);
        Ok(out)
    }

    pub fn insert_documents(&self, db: &str, coll: &str, documents: &[Value]) -> Result<Vec<LookupKey>> {
        let path = self.collection_path(db, coll);
        self.with_collection_lock(db, coll, || {
            let mut file = OpenOptions::new().append(true).read(true).open(&path)?;
            let mut lookup_keys = Vec::with_capacity(documents.len());
            for document in documents {
                let lookup_key = Self::append_line(&mut file, document)?;
                lookup_keys.push(lookup_key);
            }
            Ok(lookup_keys)
        })
    }

    /// Tombstone the line at `old_offset` and append `new_document`,
    /// returning its fresh lookup key.
    pub fn update_documents(
        &self,
        db: &str,
        coll: &str,
        overwrites: &[(LookupKey, Value)],
    ) -> Result<Vec<LookupKey>> {
        let path = self.collection_path(db, coll);
        self.with_collection_lock(db, coll, || {
            let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
            let mut new_keys = Vec::with_capacity(overwrites.len());
            for (old_offset, new_document) in overwrites {
                Self::tombstone_line(&mut file, *old_offset)?;
                let new_key = Self::append_line(&mut file, new_document)?;
                new_keys.push(new_key);
            }
            Ok(new_keys)
        })
    }

    pub fn delete_documents(&self, db: &str, coll: &str, lookup_keys: &[LookupKey]) -> Result<()> {
        let path = self.collection_path(db, coll);
        self.with_collection_lock(db, coll, || {
            let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
            for offset in lookup_keys {
                Self::tombstone_line(&mut file, *offset)?;
                log_debug!("tombstoned document at offset {} in {}.{}", offset, db, coll);
            }
            Ok(())
        })
    }

    fn append_line(file: &mut File, document: &Value) -> Result<LookupKey> {
        let offset = file.seek(SeekFrom::End(0))?;
        let mut line = serde_json::to_string(document)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(offset)
    }

    /// Overwrite the line starting at `offset` with `0` bytes up to (but not
    /// including) its trailing newline, preserving the file's byte layout so
    /// every other lookup key remains valid.
    fn tombstone_line(file: &mut File, offset: LookupKey) -> Result<()> {
        file.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(&mut *file);
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            return Ok(());
        }
        let content_len = line.trim_end_matches('\n').len();

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&vec![b'0'; content_len])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn engine() -> (TempDir, StorageEngine) {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::open(dir.path()).unwrap();
        (dir, engine)
    }

    #[test]
    fn create_and_drop_database() {
        let (_dir, engine) = engine();
        assert!(engine.create_database("db").unwrap());
        assert!(!engine.create_database("db").unwrap());
        assert!(engine.database_exists("db"));
        assert!(engine.drop_database("db").unwrap());
        assert!(!engine.database_exists("db"));
    }

    #[test]
    fn create_collection_lazily_creates_database() {
        let (_dir, engine) = engine();
        assert!(engine.create_collection("db", "users").unwrap());
        assert!(engine.database_exists("db"));
        assert!(engine.collection_exists("db", "users"));
    }

    #[test]
    fn insert_then_scan_returns_documents_in_order() {
        let (_dir, engine) = engine();
        engine.create_collection("db", "users").unwrap();
        let docs = vec![json!({"_id": "a", "n": 1}), json!({"_id": "b", "n": 2})];
        let keys = engine.insert_documents("db", "users", &docs).unwrap();
        assert_eq!(keys.len(), 2);

        let mut plan = ReadPlan::scan(0);
        let result = engine.get_documents("db", "users", &mut plan).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].0["n"], 1);
        assert_eq!(result[1].0["n"], 2);
        assert!(plan.ended());
    }

    #[test]
    fn scan_respects_chunk_size_and_resumes() {
        let (_dir, engine) = engine();
        engine.create_collection("db", "users").unwrap();
        let docs: Vec<Value> = (0..5).map(|i| json!({"_id": i.to_string(), "n": i})).collect();
        engine.insert_documents("db", "users", &docs).unwrap();

        let mut plan = ReadPlan::scan(0).with_chunk_size(2);
        let first = engine.get_documents("db", "users", &mut plan).unwrap();
        assert_eq!(first.len(), 2);
        assert!(!plan.ended());

        let second = engine.get_documents("db", "users", &mut plan).unwrap();
        assert_eq!(second.len(), 2);

        let third = engine.get_documents("db", "users", &mut plan).unwrap();
        assert_eq!(third.len(), 1);
        assert!(plan.ended());
    }

    #[test]
    fn delete_tombstones_and_scan_skips_it() {
        let (_dir, engine) = engine();
        engine.create_collection("db", "users").unwrap();
        let docs = vec![json!({"_id": "a"}), json!({"_id": "b"})];
        let keys = engine.insert_documents("db", "users", &docs).unwrap();

        engine.delete_documents("db", "users", &[keys[0]]).unwrap();

        let mut plan = ReadPlan::scan(0);
        let result = engine.get_documents("db", "users", &mut plan).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].0["_id"], "b");
    }

    #[test]
    fn tombstoned_lines_do_not_consume_a_chunk_slot() {
        let (_dir, engine) = engine();
        engine.create_collection("db", "users").unwrap();
        let docs: Vec<Value> = (0..3).map(|i| json!({"_id": i.to_string()})).collect();
        let keys = engine.insert_documents("db", "users", &docs).unwrap();
        engine.delete_documents("db", "users", &[keys[1]]).unwrap();

        let mut plan = ReadPlan::scan(0).with_chunk_size(2);
        let result = engine.get_documents("db", "users", &mut plan).unwrap();
        // document 1 is tombstoned; the chunk still yields 2 live docs (0 and 2)
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].0["_id"], "0");
        assert_eq!(result[1].0["_id"], "2");
        assert!(plan.ended());
    }

    #[test]
    fn update_tombstones_old_offset_and_appends_new_line() {
        let (_dir, engine) = engine();
        engine.create_collection("db", "users").unwrap();
        let keys = engine
            .insert_documents("db", "users", &[json!({"_id": "a", "n": 1})])
            .unwrap();

        let new_keys = engine
            .update_documents("db", "users", &[(keys[0], json!({"_id": "a", "n": 2}))])
            .unwrap();
        assert_ne!(new_keys[0], keys[0]);

        let mut plan = ReadPlan::scan(0);
        let result = engine.get_documents("db", "users", &mut plan).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].0["n"], 2);
    }

    #[test]
    fn indexed_plan_reads_exact_offsets() {
        let (_dir, engine) = engine();
        engine.create_collection("db", "users").unwrap();
        let docs: Vec<Value> = (0..4).map(|i| json!({"_id": i.to_string()})).collect();
        let keys = engine.insert_documents("db", "users", &docs).unwrap();

        let mut plan = ReadPlan::indexed(BTreeSet::from([keys[1], keys[3]]));
        let result = engine.get_documents("db", "users", &mut plan).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].0["_id"], "1");
        assert_eq!(result[1].0["_id"], "3");
        assert!(plan.ended());
    }

    #[test]
    fn drop_nonexistent_collection_returns_false() {
        let (_dir, engine) = engine();
        engine.create_database("db").unwrap();
        assert!(!engine.drop_collection("db", "ghost").unwrap());
    }
}
