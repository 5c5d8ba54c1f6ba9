//! Session summary storage - byte-level API.
//!
//! One row per `(session_id, user_id)` pair; writes overwrite in place.

use crate::range_utils::scope_key;
use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

const SESSION_SUMMARY_TABLE: TableDefinition<&str, &[u8]> =
    TableDefinition::new("session_summaries");

/// Low-level session summary storage with byte-level API
#[derive(Debug, Clone)]
pub struct SessionSummaryStorage {
    db: Arc<Database>,
}

impl SessionSummaryStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(SESSION_SUMMARY_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Store raw summary data, replacing any existing row for the pair.
    pub fn put_raw(&self, session_id: &str, user_id: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSION_SUMMARY_TABLE)?;
            let key = scope_key(&[session_id, user_id]);
            table.insert(key.as_str(), data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get raw summary data for the pair.
    pub fn get_raw(&self, session_id: &str, user_id: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSION_SUMMARY_TABLE)?;
        let key = scope_key(&[session_id, user_id]);

        if let Some(data) = table.get(key.as_str())? {
            Ok(Some(data.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// Delete the summary for the pair.
    pub fn delete(&self, session_id: &str, user_id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(SESSION_SUMMARY_TABLE)?;
            let key = scope_key(&[session_id, user_id]);
            table.remove(key.as_str())?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_put_overwrites_in_place() {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("test.db")).unwrap());
        let storage = SessionSummaryStorage::new(db).unwrap();

        storage.put_raw("s1", "alice", b"first").unwrap();
        storage.put_raw("s1", "alice", b"second").unwrap();
        storage.put_raw("s1", "bob", b"other user").unwrap();

        assert_eq!(storage.get_raw("s1", "alice").unwrap().unwrap(), b"second");
        assert_eq!(storage.get_raw("s1", "bob").unwrap().unwrap(), b"other user");
        assert!(storage.get_raw("s2", "alice").unwrap().is_none());
    }

    #[test]
    fn test_delete() {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("test.db")).unwrap());
        let storage = SessionSummaryStorage::new(db).unwrap();

        storage.put_raw("s1", "alice", b"summary").unwrap();
        assert!(storage.delete("s1", "alice").unwrap());
        assert!(!storage.delete("s1", "alice").unwrap());
        assert!(storage.get_raw("s1", "alice").unwrap().is_none());
    }
}
