//! Document identity and the JSON document model.
//!
//! A document body is modeled directly as [`serde_json::Value`] (always an
//! `Object` in practice) rather than a crate-private recursive enum: the
//! filter matcher, update interpreter and projection all dispatch on this
//! variant, so there is no value in re-declaring it.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A JSON document body. Always a `Value::Object` once it has passed through
/// insert, but kept as the general `Value` type since every interpreter
/// function (filter matching, update application, projection) operates on
/// it uniformly.
pub type Value = serde_json::Value;

/// A 128-bit random document identity, string-serialized on disk.
///
/// Wraps a UUID v4 the same way the system this crate replaces wraps one:
/// as an opaque string-backed token, ordered and compared as a string so a
/// secondary index on `_id` (or the implicit root index) sorts consistently
/// with how it is stored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Mint a fresh, random identity.
    pub fn new() -> Self {
        ObjectId(Uuid::new_v4().to_string())
    }

    /// Wrap an existing string as an identity, e.g. when reading `_id` back
    /// off disk. Does not validate UUID shape: an `_id` written by a future
    /// version of this format, or a caller-supplied string id, is accepted
    /// as-is.
    pub fn from_string(s: impl Into<String>) -> Self {
        ObjectId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Value::String(id.0)
    }
}

/// A document handed back to callers: the full JSON body plus its identity
/// parsed out for convenient comparison, without mutating the body itself
/// (the body keeps `_id` as the plain string it is stored as).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: ObjectId,
    pub value: Value,
}

impl Document {
    pub fn new(id: ObjectId, value: Value) -> Self {
        Document { id, value }
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Pull `_id` out of a document body and parse it as an [`ObjectId`].
/// Returns `None` if the field is absent or not a string, which should not
/// happen for any document that passed through [`crate::engine`]'s insert
/// path.
pub fn extract_object_id(value: &Value) -> Option<ObjectId> {
    value.get("_id")?.as_str().map(ObjectId::from_string)
}
