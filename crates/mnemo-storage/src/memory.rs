//! User memory storage - byte-level API for durable user facts.
//!
//! # Tables
//!
//! - `user_memories`: memory_id -> memory_data
//! - `user_memory_index`: scope(user_id) + memory_id -> memory_id

use crate::range_utils::{prefix_range, scope_key};
use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

const USER_MEMORY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("user_memories");
/// Index: scope(user_id) + memory_id -> memory_id
const USER_INDEX_TABLE: TableDefinition<&str, &str> = TableDefinition::new("user_memory_index");

fn index_key(user_id: &str, memory_id: &str) -> String {
    format!("{}{}", scope_key(&[user_id]), memory_id)
}

/// Low-level user memory storage with byte-level API
#[derive(Debug, Clone)]
pub struct UserMemoryStorage {
    db: Arc<Database>,
}

impl UserMemoryStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(USER_MEMORY_TABLE)?;
        write_txn.open_table(USER_INDEX_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Insert or overwrite a memory and its user index entry.
    pub fn put_raw(&self, memory_id: &str, user_id: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USER_MEMORY_TABLE)?;
            table.insert(memory_id, data)?;

            let mut user_index = write_txn.open_table(USER_INDEX_TABLE)?;
            let key = index_key(user_id, memory_id);
            user_index.insert(key.as_str(), memory_id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get raw memory data by ID
    pub fn get_raw(&self, memory_id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USER_MEMORY_TABLE)?;

        if let Some(value) = table.get(memory_id)? {
            Ok(Some(value.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// Check whether a memory belongs to the given user.
    pub fn exists_for_user(&self, user_id: &str, memory_id: &str) -> Result<bool> {
        let read_txn = self.db.begin_read()?;
        let user_index = read_txn.open_table(USER_INDEX_TABLE)?;
        let key = index_key(user_id, memory_id);
        Ok(user_index.get(key.as_str())?.is_some())
    }

    /// List all memories for a user
    pub fn list_by_user_raw(&self, user_id: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db.begin_read()?;
        let user_index = read_txn.open_table(USER_INDEX_TABLE)?;
        let table = read_txn.open_table(USER_MEMORY_TABLE)?;

        let prefix = scope_key(&[user_id]);
        let (start, end) = prefix_range(&prefix);
        let mut memories = Vec::new();

        for item in user_index.range(start.as_str()..end.as_str())? {
            let (_, value) = item?;
            let memory_id = value.value();
            if let Some(data) = table.get(memory_id)? {
                memories.push((memory_id.to_string(), data.value().to_vec()));
            }
        }

        Ok(memories)
    }

    /// Count memories for a user
    pub fn count_by_user(&self, user_id: &str) -> Result<u32> {
        let read_txn = self.db.begin_read()?;
        let user_index = read_txn.open_table(USER_INDEX_TABLE)?;

        let prefix = scope_key(&[user_id]);
        let (start, end) = prefix_range(&prefix);
        let mut count = 0u32;
        for item in user_index.range(start.as_str()..end.as_str())? {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Delete a single memory owned by `user_id`.
    pub fn delete(&self, user_id: &str, memory_id: &str) -> Result<bool> {
        Ok(self.delete_many(user_id, &[memory_id.to_string()])? > 0)
    }

    /// Delete a set of memories owned by `user_id` in one transaction.
    ///
    /// IDs that do not belong to the user are ignored. Returns the number of
    /// memories removed.
    pub fn delete_many(&self, user_id: &str, memory_ids: &[String]) -> Result<u32> {
        if memory_ids.is_empty() {
            return Ok(0);
        }

        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(USER_MEMORY_TABLE)?;
            let mut user_index = write_txn.open_table(USER_INDEX_TABLE)?;
            let mut deleted = 0u32;

            for memory_id in memory_ids {
                let key = index_key(user_id, memory_id);
                if user_index.remove(key.as_str())?.is_none() {
                    continue;
                }
                if table.remove(memory_id.as_str())?.is_some() {
                    deleted += 1;
                }
            }

            deleted
        };
        write_txn.commit()?;
        Ok(deleted)
    }

    /// Delete all memories for a user
    pub fn delete_all_for_user(&self, user_id: &str) -> Result<u32> {
        let ids: Vec<String> = self
            .list_by_user_raw(user_id)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        self.delete_many(user_id, &ids)
    }
}
