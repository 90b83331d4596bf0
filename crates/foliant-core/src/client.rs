//! Client (C8 facade): the top-level handle a caller opens once per root
//! directory. Owns the `Session` and hands out `Database` handles from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::command::{Command, CommandOutcome};
use crate::database::Database;
use crate::error::{FoliantError, Result};
use crate::session::Session;

pub struct Client {
    session: Arc<Session>,
    root: PathBuf,
    default_database_name: Option<String>,
}

impl Client {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_default_database(path, None)
    }

    pub fn with_default_database(path: impl AsRef<Path>, database: Option<String>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let session = Arc::new(Session::open(&root)?);
        Ok(Client { session, root, default_database_name: database })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    pub fn close(&self) {
        self.session.close();
    }

    pub fn database(&self, name: impl Into<String>) -> Result<Database> {
        Database::new(self.session.clone(), name.into())
    }

    pub fn default_database(&self) -> Result<Database> {
        let name = self.default_database_name.clone().ok_or(FoliantError::MissingDatabaseName)?;
        self.database(name)
    }

    pub fn drop_database(&self, name: Option<&str>) -> Result<bool> {
        let name = match name {
            Some(n) => n.to_string(),
            None => self.default_database_name.clone().ok_or(FoliantError::MissingDatabaseName)?,
        };
        match self.session.execute(Command::DropDatabase { database_name: name })? {
            CommandOutcome::Created(dropped) => Ok(dropped),
            _ => unreachable!("DropDatabase always returns Created"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn default_database_requires_configuration() {
        let dir = TempDir::new().unwrap();
        let client = Client::open(dir.path()).unwrap();
        assert!(matches!(client.default_database(), Err(FoliantError::MissingDatabaseName)));
    }

    #[test]
    fn full_chain_inserts_and_finds() {
        let dir = TempDir::new().unwrap();
        let client = Client::with_default_database(dir.path(), Some("db".into())).unwrap();
        let db = client.default_database().unwrap();
        let coll = db.collection("users").unwrap();

        coll.insert_one(json!({"a": 1, "b": 2})).unwrap();
        let found = coll.find_one(json!({"a": 1}), json!({"_id": 0})).unwrap().unwrap();
        assert_eq!(found.value, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn drop_database_removes_it() {
        let dir = TempDir::new().unwrap();
        let client = Client::with_default_database(dir.path(), Some("db".into())).unwrap();
        client.default_database().unwrap();
        assert!(client.drop_database(None).unwrap());
        assert!(!client.drop_database(Some("db")).unwrap());
    }

    #[test]
    fn close_makes_session_reject_further_commands() {
        let dir = TempDir::new().unwrap();
        let client = Client::with_default_database(dir.path(), Some("db".into())).unwrap();
        client.close();
        assert!(client.is_closed());
        assert!(matches!(client.default_database(), Err(FoliantError::SessionClosed)));
    }
}
