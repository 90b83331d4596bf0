//! Crate-wide error type.
//!
//! Every operation that can fail returns [`Result<T>`], an alias over
//! [`FoliantError`]. Kinds mirror the command-dispatch and storage failure
//! modes a caller needs to distinguish; OS and codec failures are wrapped
//! transparently rather than flattened into a generic variant so `?` keeps
//! working at every call site.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FoliantError>;

#[derive(Debug, Error)]
pub enum FoliantError {
    #[error("a default database name is required but none was configured")]
    MissingDatabaseName,

    #[error("command dispatched without a database name")]
    DatabaseIsRequired,

    #[error("command dispatched without a collection name")]
    CollectionIsRequired,

    #[error("database '{0}' not found")]
    DatabaseNotFound(String),

    #[error("collection '{1}' not found in database '{0}'")]
    CollectionNotFound(String, String),

    #[error("database '{0}' already exists")]
    DatabaseAlreadyExists(String),

    #[error("collection '{1}' already exists in database '{0}'")]
    CollectionAlreadyExists(String, String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("session is closed")]
    SessionClosed,

    #[error("create_index expects a single {{field: type}} pair")]
    IndexMustBeSingleField,

    #[error("unsupported index type: {0}")]
    UnsupportedIndexType(i64),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
