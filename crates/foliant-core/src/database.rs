//! Database (C8 facade): names a database and hands out `Collection`
//! handles within it. Creating a `Database` eagerly issues `CreateDatabase`
//! (idempotent), matching the reference client's "touching a database
//! brings it into existence" behavior.

use std::sync::Arc;

use crate::collection::Collection;
use crate::command::{Command, CommandOutcome};
use crate::error::Result;
use crate::session::Session;

pub struct Database {
    session: Arc<Session>,
    name: String,
}

impl Database {
    pub(crate) fn new(session: Arc<Session>, name: String) -> Result<Self> {
        session.execute(Command::CreateDatabase { database_name: name.clone() })?;
        Ok(Database { session, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self, name: impl Into<String>) -> Result<Collection> {
        Collection::new(self.session.clone(), self.name.clone(), name.into())
    }

    pub fn list_collection_names(&self) -> Result<Vec<String>> {
        match self.session.execute(Command::GetCollectionList { database_name: self.name.clone() })? {
            CommandOutcome::CollectionList(names) => Ok(names),
            _ => unreachable!("GetCollectionList always returns CollectionList"),
        }
    }

    pub fn drop_collection(&self, name: &str) -> Result<bool> {
        match self.session.execute(Command::DropCollection {
            database_name: self.name.clone(),
            collection_name: name.to_string(),
        })? {
            CommandOutcome::Created(dropped) => Ok(dropped),
            _ => unreachable!("DropCollection always returns Created"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn collection_list_reflects_created_collections() {
        let dir = TempDir::new().unwrap();
        let session = Arc::new(Session::open(dir.path()).unwrap());
        let db = Database::new(session, "db".into()).unwrap();
        db.collection("users").unwrap();
        db.collection("orders").unwrap();

        let mut names = db.list_collection_names().unwrap();
        names.sort();
        assert_eq!(names, vec!["orders".to_string(), "users".to_string()]);
    }

    #[test]
    fn drop_collection_removes_it() {
        let dir = TempDir::new().unwrap();
        let session = Arc::new(Session::open(dir.path()).unwrap());
        let db = Database::new(session, "db".into()).unwrap();
        db.collection("users").unwrap();

        assert!(db.drop_collection("users").unwrap());
        assert!(db.list_collection_names().unwrap().is_empty());
    }
}
