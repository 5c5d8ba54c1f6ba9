//! Mnemo Storage - Low-level storage layer for the memory pipeline
//!
//! Persistence uses redb as the embedded database. This crate only exposes
//! byte-level APIs; typed wrappers and serialization live in `mnemo-core`.
//!
//! # Tables
//!
//! - `user_memories` / `user_memory_index` - Durable facts per user
//! - `session_summaries` - One rolling summary per (session, user)
//! - `conversation_messages` / `message_session_index` - Append-only message log
//! - `message_meta` - Message sequence counter

pub mod memory;
pub mod message;
pub mod paths;
pub mod range_utils;
pub mod summary;
pub mod time_utils;

use anyhow::Result;
use redb::{Database, ReadableDatabase};
use std::path::Path;
use std::sync::Arc;

pub use memory::UserMemoryStorage;
pub use message::MessageStorage;
pub use summary::SessionSummaryStorage;

/// Central storage manager that initializes all storage subsystems
pub struct Storage {
    db: Arc<Database>,
    pub memories: UserMemoryStorage,
    pub summaries: SessionSummaryStorage,
    pub messages: MessageStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will create the database file if it doesn't exist and initialize
    /// all required tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Arc::new(Database::create(path)?);

        let memories = UserMemoryStorage::new(db.clone())?;
        let summaries = SessionSummaryStorage::new(db.clone())?;
        let messages = MessageStorage::new(db.clone())?;

        tracing::debug!(path = %path.display(), "Opened memory database");

        Ok(Self {
            db,
            memories,
            summaries,
            messages,
        })
    }

    /// Get a reference to the underlying database
    pub fn get_db(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Verify the database can start a read transaction.
    pub fn health_check(&self) -> Result<()> {
        let _read_txn = self.db.begin_read()?;
        Ok(())
    }
}
