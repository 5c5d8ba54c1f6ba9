//! Conversation message storage - byte-level, append-only API.
//!
//! # Tables
//!
//! - `conversation_messages`: message_id -> message_data
//! - `message_session_index`: scope(user_id, session_id) + seq -> message_id
//! - `message_meta`: counters (`next_seq`)
//!
//! The sequence number is allocated inside the same write transaction as the
//! insert, so index order is insertion order.

use crate::range_utils::{prefix_range, scope_key};
use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

const MESSAGE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("conversation_messages");
const SESSION_INDEX_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("message_session_index");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("message_meta");

const NEXT_SEQ_KEY: &str = "next_seq";

fn session_prefix(user_id: &str, session_id: &str) -> String {
    scope_key(&[user_id, session_id])
}

/// Low-level message storage with byte-level API
#[derive(Debug, Clone)]
pub struct MessageStorage {
    db: Arc<Database>,
}

impl MessageStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(MESSAGE_TABLE)?;
        write_txn.open_table(SESSION_INDEX_TABLE)?;
        write_txn.open_table(META_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Append a message to its session. Returns the allocated sequence number.
    pub fn append_raw(
        &self,
        message_id: &str,
        user_id: &str,
        session_id: &str,
        data: &[u8],
    ) -> Result<u64> {
        let write_txn = self.db.begin_write()?;
        let seq = {
            let mut meta = write_txn.open_table(META_TABLE)?;
            let seq = meta.get(NEXT_SEQ_KEY)?.map(|v| v.value()).unwrap_or(0);
            meta.insert(NEXT_SEQ_KEY, seq + 1)?;

            let mut table = write_txn.open_table(MESSAGE_TABLE)?;
            table.insert(message_id, data)?;

            let mut session_index = write_txn.open_table(SESSION_INDEX_TABLE)?;
            let key = format!("{}{:020}", session_prefix(user_id, session_id), seq);
            session_index.insert(key.as_str(), message_id)?;

            seq
        };
        write_txn.commit()?;
        Ok(seq)
    }

    /// Get raw message data by ID
    pub fn get_raw(&self, message_id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MESSAGE_TABLE)?;

        if let Some(value) = table.get(message_id)? {
            Ok(Some(value.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// List messages of a session in insertion order.
    ///
    /// With `limit`, only the most recent `limit` messages are returned (still
    /// oldest first).
    pub fn list_session_raw(
        &self,
        user_id: &str,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let session_index = read_txn.open_table(SESSION_INDEX_TABLE)?;
        let table = read_txn.open_table(MESSAGE_TABLE)?;

        let prefix = session_prefix(user_id, session_id);
        let (start, end) = prefix_range(&prefix);
        let take = limit.unwrap_or(usize::MAX);
        let mut messages = Vec::new();

        for item in session_index.range(start.as_str()..end.as_str())?.rev() {
            if messages.len() >= take {
                break;
            }
            let (_, value) = item?;
            let message_id = value.value();
            if let Some(data) = table.get(message_id)? {
                messages.push((message_id.to_string(), data.value().to_vec()));
            }
        }

        messages.reverse();
        Ok(messages)
    }

    /// Count messages in a session
    pub fn count_session(&self, user_id: &str, session_id: &str) -> Result<u64> {
        let read_txn = self.db.begin_read()?;
        let session_index = read_txn.open_table(SESSION_INDEX_TABLE)?;

        let prefix = session_prefix(user_id, session_id);
        let (start, end) = prefix_range(&prefix);
        let mut count = 0u64;
        for item in session_index.range(start.as_str()..end.as_str())? {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Delete every message in a session. Administrative use only.
    pub fn delete_session(&self, user_id: &str, session_id: &str) -> Result<u32> {
        let prefix = session_prefix(user_id, session_id);
        let (start, end) = prefix_range(&prefix);

        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut session_index = write_txn.open_table(SESSION_INDEX_TABLE)?;
            let mut table = write_txn.open_table(MESSAGE_TABLE)?;

            let mut entries = Vec::new();
            for item in session_index.range(start.as_str()..end.as_str())? {
                let (key, value) = item?;
                entries.push((key.value().to_string(), value.value().to_string()));
            }

            for (key, message_id) in &entries {
                session_index.remove(key.as_str())?;
                table.remove(message_id.as_str())?;
            }

            entries.len() as u32
        };
        write_txn.commit()?;
        Ok(deleted)
    }
}
