//! Collection (C8 facade): the handle callers actually insert into, find
//! from, and mutate. Thin by design: it assembles `Command` values and hands
//! them to the owning `Session`; it carries no query-builder or schema
//! logic of its own.

use std::sync::Arc;

use serde_json::Value;

use crate::command::{Command, CommandOutcome};
use crate::cursor::Cursor;
use crate::document::{Document, ObjectId};
use crate::error::{FoliantError, Result};
use crate::indexing_engine::IndexListEntry;
use crate::session::Session;

pub struct Collection {
    session: Arc<Session>,
    database_name: String,
    name: String,
}

impl Collection {
    pub(crate) fn new(session: Arc<Session>, database_name: String, name: String) -> Result<Self> {
        validate_collection_name(&name)?;
        session.execute(Command::CreateCollection {
            database_name: database_name.clone(),
            collection_name: name.clone(),
        })?;
        Ok(Collection { session, database_name, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn drop(&self) -> Result<bool> {
        match self.session.execute(Command::DropCollection {
            database_name: self.database_name.clone(),
            collection_name: self.name.clone(),
        })? {
            CommandOutcome::Created(dropped) => Ok(dropped),
            _ => unreachable!("DropCollection always returns Created"),
        }
    }

    pub fn insert_one(&self, document: Value) -> Result<ObjectId> {
        let mut ids = self.insert_many(vec![document])?;
        Ok(ids.remove(0))
    }

    pub fn insert_many(&self, documents: Vec<Value>) -> Result<Vec<ObjectId>> {
        match self.session.execute(Command::Insert {
            database_name: self.database_name.clone(),
            collection_name: self.name.clone(),
            documents,
        })? {
            CommandOutcome::InsertedIds(ids) => Ok(ids),
            _ => unreachable!("Insert always returns InsertedIds"),
        }
    }

    pub fn find(&self, filter: Value, fields: Value) -> Result<Cursor> {
        self.find_with_many(filter, fields, true)
    }

    pub fn find_one(&self, filter: Value, fields: Value) -> Result<Option<Document>> {
        let mut cursor = self.find_with_many(filter, fields, false)?;
        cursor.next().transpose()
    }

    fn find_with_many(&self, filter: Value, fields: Value, many: bool) -> Result<Cursor> {
        match self.session.execute(Command::Find {
            database_name: self.database_name.clone(),
            collection_name: self.name.clone(),
            filter,
            fields,
            many,
        })? {
            CommandOutcome::Cursor(cursor) => Ok(cursor),
            _ => unreachable!("Find always returns Cursor"),
        }
    }

    pub fn update_one(&self, filter: Value, r#override: Value) -> Result<usize> {
        self.update_with_many(filter, r#override, false)
    }

    pub fn update_many(&self, filter: Value, r#override: Value) -> Result<usize> {
        self.update_with_many(filter, r#override, true)
    }

    fn update_with_many(&self, filter: Value, r#override: Value, many: bool) -> Result<usize> {
        match self.session.execute(Command::Update {
            database_name: self.database_name.clone(),
            collection_name: self.name.clone(),
            filter,
            r#override,
            many,
        })? {
            CommandOutcome::ModifiedCount(n) => Ok(n),
            _ => unreachable!("Update always returns ModifiedCount"),
        }
    }

    pub fn replace_one(&self, filter: Value, replacement: Value) -> Result<usize> {
        self.replace_with_many(filter, replacement, false)
    }

    pub fn replace_many(&self, filter: Value, replacement: Value) -> Result<usize> {
        self.replace_with_many(filter, replacement, true)
    }

    fn replace_with_many(&self, filter: Value, replacement: Value, many: bool) -> Result<usize> {
        match self.session.execute(Command::Replace {
            database_name: self.database_name.clone(),
            collection_name: self.name.clone(),
            filter,
            replacement,
            many,
        })? {
            CommandOutcome::ModifiedCount(n) => Ok(n),
            _ => unreachable!("Replace always returns ModifiedCount"),
        }
    }

    pub fn delete_one(&self, filter: Value) -> Result<usize> {
        self.delete_with_many(filter, false)
    }

    pub fn delete_many(&self, filter: Value) -> Result<usize> {
        self.delete_with_many(filter, true)
    }

    fn delete_with_many(&self, filter: Value, many: bool) -> Result<usize> {
        match self.session.execute(Command::Delete {
            database_name: self.database_name.clone(),
            collection_name: self.name.clone(),
            filter,
            many,
        })? {
            CommandOutcome::DeletedCount(n) => Ok(n),
            _ => unreachable!("Delete always returns DeletedCount"),
        }
    }

    /// `index` must be a single-pair map, e.g. `{"age": 1}`; the pair's
    /// value is the index type (only `1`, an ascending scalar index, is
    /// currently supported).
    pub fn create_index(&self, index: &Value) -> Result<Option<String>> {
        let Some(map) = index.as_object() else {
            return Err(FoliantError::IndexMustBeSingleField);
        };
        if map.len() != 1 {
            return Err(FoliantError::IndexMustBeSingleField);
        }
        let (field, index_type) = map.iter().next().expect("checked len == 1");
        let index_type = index_type.as_i64().ok_or(FoliantError::IndexMustBeSingleField)?;

        match self.session.execute(Command::CreateIndex {
            database_name: self.database_name.clone(),
            collection_name: self.name.clone(),
            field: field.clone(),
            index_type,
        })? {
            CommandOutcome::IndexId(id) => Ok(id),
            _ => unreachable!("CreateIndex always returns IndexId"),
        }
    }

    pub fn delete_index(&self, index_id: &str) -> Result<bool> {
        match self.session.execute(Command::DeleteIndex {
            database_name: self.database_name.clone(),
            collection_name: self.name.clone(),
            index_id: index_id.to_string(),
        })? {
            CommandOutcome::IndexDeleted(deleted) => Ok(deleted),
            _ => unreachable!("DeleteIndex always returns IndexDeleted"),
        }
    }

    pub fn get_indexes(&self) -> Result<Vec<IndexListEntry>> {
        match self.session.execute(Command::GetIndexList {
            database_name: self.database_name.clone(),
            collection_name: self.name.clone(),
        })? {
            CommandOutcome::IndexList(list) => Ok(list),
            _ => unreachable!("GetIndexList always returns IndexList"),
        }
    }
}

/// Non-empty, no `..`, no leading/trailing `.`, no NUL, and no unescaped `$`
/// outside the reserved `oplog.$main`/`$cmd` prefixes.
fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains("..") {
        return Err(FoliantError::InvalidName(name.to_string()));
    }
    if name.contains('$') && !(name.starts_with("oplog.$main") || name.starts_with("$cmd")) {
        return Err(FoliantError::InvalidName(name.to_string()));
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err(FoliantError::InvalidName(name.to_string()));
    }
    if name.contains('\0') {
        return Err(FoliantError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn collection() -> (TempDir, Collection) {
        let dir = TempDir::new().unwrap();
        let session = Arc::new(Session::open(dir.path()).unwrap());
        session.execute(Command::CreateDatabase { database_name: "db".into() }).unwrap();
        let collection = Collection::new(session, "db".into(), "users".into()).unwrap();
        (dir, collection)
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(validate_collection_name("").is_err());
        assert!(validate_collection_name("a..b").is_err());
        assert!(validate_collection_name(".a").is_err());
        assert!(validate_collection_name("a.").is_err());
        assert!(validate_collection_name("a$b").is_err());
        assert!(validate_collection_name("a\0b").is_err());
        assert!(validate_collection_name("users").is_ok());
        assert!(validate_collection_name("oplog.$main").is_ok());
    }

    #[test]
    fn insert_one_then_find_one() {
        let (_dir, coll) = collection();
        let id = coll.insert_one(json!({"a": 1})).unwrap();
        let found = coll.find_one(json!({"a": 1}), json!({})).unwrap().unwrap();
        assert_eq!(found.id, id);
    }

    #[test]
    fn find_one_on_empty_result_returns_none() {
        let (_dir, coll) = collection();
        coll.insert_one(json!({"a": 1})).unwrap();
        assert!(coll.find_one(json!({"a": 99}), json!({})).unwrap().is_none());
    }

    #[test]
    fn create_index_rejects_multi_field_map() {
        let (_dir, coll) = collection();
        let result = coll.create_index(&json!({"a": 1, "b": 1}));
        assert!(matches!(result, Err(FoliantError::IndexMustBeSingleField)));
    }

    #[test]
    fn end_to_end_push_each_sort_slice() {
        let (_dir, coll) = collection();
        coll.insert_one(json!({"a": [0]})).unwrap();
        coll.update_one(json!({}), json!({"$push": {"a": {"$each": [3, 1, 2], "$sort": 1, "$slice": 3}}})).unwrap();

        let found = coll.find_one(json!({}), json!({"_id": 0})).unwrap().unwrap();
        assert_eq!(found.value, json!({"a": [0, 1, 2]}));
    }
}
