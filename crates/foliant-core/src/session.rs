//! Session (C8): the single dispatch chokepoint between the facade
//! (`Client`/`Database`/`Collection`) and the execution engine. Closing a
//! session makes every subsequent `execute` call fail with `SessionClosed`,
//! regardless of how many facade handles still reference it.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::command::{Command, CommandOutcome};
use crate::engine::ExecutionEngine;
use crate::error::{FoliantError, Result};
use crate::indexing_engine::IndexingEngine;
use crate::storage::StorageEngine;

pub struct Session {
    engine: Arc<ExecutionEngine>,
    closed: AtomicBool,
}

impl Session {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::with_chunk_size(root, crate::engine::DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(root: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let storage = StorageEngine::open(root)?;
        let engine = ExecutionEngine::with_chunk_size(storage, Some(IndexingEngine::new()), chunk_size);
        Ok(Session {
            engine: Arc::new(engine),
            closed: AtomicBool::new(false),
        })
    }

    pub fn execute(&self, command: Command) -> Result<CommandOutcome> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FoliantError::SessionClosed);
        }
        self.engine.clone().execute(command)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
