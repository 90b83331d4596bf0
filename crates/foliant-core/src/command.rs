//! The command envelope (C8): the message a `Session` hands down into the
//! execution engine. Unlike the reference implementation this is modeled as
//! an enum of distinct, strongly-typed variants rather than a single struct
//! with an open-ended kwargs bag read back with attribute access — every
//! command here carries exactly the arguments it uses.

use crate::cursor::Cursor;
use crate::document::{ObjectId, Value};
use crate::indexing_engine::IndexListEntry;

#[derive(Debug, Clone)]
pub enum Command {
    CreateDatabase {
        database_name: String,
    },
    DropDatabase {
        database_name: String,
    },
    CreateCollection {
        database_name: String,
        collection_name: String,
    },
    DropCollection {
        database_name: String,
        collection_name: String,
    },
    GetCollectionList {
        database_name: String,
    },
    Insert {
        database_name: String,
        collection_name: String,
        documents: Vec<Value>,
    },
    Find {
        database_name: String,
        collection_name: String,
        filter: Value,
        fields: Value,
        many: bool,
    },
    Update {
        database_name: String,
        collection_name: String,
        filter: Value,
        r#override: Value,
        many: bool,
    },
    Replace {
        database_name: String,
        collection_name: String,
        filter: Value,
        replacement: Value,
        many: bool,
    },
    Delete {
        database_name: String,
        collection_name: String,
        filter: Value,
        many: bool,
    },
    CreateIndex {
        database_name: String,
        collection_name: String,
        field: String,
        index_type: i64,
    },
    DeleteIndex {
        database_name: String,
        collection_name: String,
        index_id: String,
    },
    GetIndexList {
        database_name: String,
        collection_name: String,
    },
}

/// Whatever a command produced. Each variant matches one or more `Command`
/// shapes; callers destructure the one they expect (the facade layer knows
/// which it asked for).
#[derive(Debug)]
pub enum CommandOutcome {
    Created(bool),
    CollectionList(Vec<String>),
    InsertedIds(Vec<ObjectId>),
    Cursor(Cursor),
    ModifiedCount(usize),
    DeletedCount(usize),
    IndexId(Option<String>),
    IndexDeleted(bool),
    IndexList(Vec<IndexListEntry>),
}
