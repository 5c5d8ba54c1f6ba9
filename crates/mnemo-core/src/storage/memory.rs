//! Typed user memory storage wrapper.
//!
//! Wraps the byte-level `mnemo_storage::UserMemoryStorage` with
//! [`UserMemory`] (de)serialization, ordering and keyword search.

use crate::models::UserMemory;
use anyhow::Result;

/// Ordering for memory listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryOrder {
    /// `updated_at` descending
    #[default]
    RecentlyUpdated,
    /// `created_at` ascending
    EarliestCreated,
}

/// Typed user memory storage wrapper around mnemo_storage::UserMemoryStorage.
#[derive(Debug, Clone)]
pub struct UserMemoryStorage {
    inner: mnemo_storage::UserMemoryStorage,
}

impl From<mnemo_storage::UserMemoryStorage> for UserMemoryStorage {
    fn from(inner: mnemo_storage::UserMemoryStorage) -> Self {
        Self { inner }
    }
}

impl UserMemoryStorage {
    /// Insert or overwrite a memory.
    pub fn put(&self, memory: &UserMemory) -> Result<()> {
        let json_bytes = serde_json::to_vec(memory)?;
        self.inner
            .put_raw(&memory.id, &memory.user_id, &json_bytes)
    }

    /// Get a memory by ID, only if it belongs to `user_id`.
    pub fn get(&self, user_id: &str, memory_id: &str) -> Result<Option<UserMemory>> {
        if !self.inner.exists_for_user(user_id, memory_id)? {
            return Ok(None);
        }
        match self.inner.get_raw(memory_id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn exists(&self, user_id: &str, memory_id: &str) -> Result<bool> {
        self.inner.exists_for_user(user_id, memory_id)
    }

    /// List memories for a user in the requested order.
    pub fn list(
        &self,
        user_id: &str,
        limit: Option<usize>,
        order: MemoryOrder,
    ) -> Result<Vec<UserMemory>> {
        let mut memories = self.list_unordered(user_id)?;
        sort_memories(&mut memories, order);
        if let Some(limit) = limit {
            memories.truncate(limit);
        }
        Ok(memories)
    }

    /// Case-insensitive keyword search; every keyword must be present.
    pub fn search(&self, user_id: &str, query: &str, limit: Option<usize>) -> Result<Vec<UserMemory>> {
        let query_lower = query.to_lowercase();
        let keywords: Vec<&str> = query_lower.split_whitespace().collect();

        let mut matches: Vec<UserMemory> = self
            .list_unordered(user_id)?
            .into_iter()
            .filter(|m| {
                let content_lower = m.memory.to_lowercase();
                keywords.iter().all(|kw| content_lower.contains(kw))
            })
            .collect();

        sort_memories(&mut matches, MemoryOrder::RecentlyUpdated);
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }

    pub fn count(&self, user_id: &str) -> Result<u32> {
        self.inner.count_by_user(user_id)
    }

    pub fn delete(&self, user_id: &str, memory_id: &str) -> Result<bool> {
        self.inner.delete(user_id, memory_id)
    }

    /// Delete a set of memories in one transaction.
    pub fn delete_many(&self, user_id: &str, memory_ids: &[String]) -> Result<u32> {
        self.inner.delete_many(user_id, memory_ids)
    }

    pub fn clear(&self, user_id: &str) -> Result<u32> {
        self.inner.delete_all_for_user(user_id)
    }

    fn list_unordered(&self, user_id: &str) -> Result<Vec<UserMemory>> {
        let mut result = Vec::new();
        for (_, bytes) in self.inner.list_by_user_raw(user_id)? {
            let memory: UserMemory = serde_json::from_slice(&bytes)?;
            result.push(memory);
        }
        Ok(result)
    }
}

fn sort_memories(memories: &mut [UserMemory], order: MemoryOrder) {
    match order {
        MemoryOrder::RecentlyUpdated => memories.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        }),
        MemoryOrder::EarliestCreated => memories.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_storage() -> (UserMemoryStorage, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let storage = mnemo_storage::Storage::new(temp_dir.path().join("test.db")).unwrap();
        (UserMemoryStorage::from(storage.memories), temp_dir)
    }

    fn memory_at(id: &str, text: &str, created_at: i64, updated_at: i64) -> UserMemory {
        let mut memory = UserMemory::new("alice", text).with_id(id);
        memory.created_at = created_at;
        memory.updated_at = updated_at;
        memory
    }

    #[test]
    fn test_list_orders() {
        let (storage, _dir) = create_test_storage();

        storage.put(&memory_at("m1", "first", 100, 500)).unwrap();
        storage.put(&memory_at("m2", "second", 200, 200)).unwrap();
        storage.put(&memory_at("m3", "third", 300, 300)).unwrap();

        let recent = storage
            .list("alice", None, MemoryOrder::RecentlyUpdated)
            .unwrap();
        let ids: Vec<_> = recent.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m3", "m2"]);

        let earliest = storage
            .list("alice", Some(2), MemoryOrder::EarliestCreated)
            .unwrap();
        let ids: Vec<_> = earliest.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_get_is_scoped_to_owner() {
        let (storage, _dir) = create_test_storage();
        storage.put(&memory_at("m1", "likes tea", 1, 1)).unwrap();

        assert!(storage.get("alice", "m1").unwrap().is_some());
        assert!(storage.get("bob", "m1").unwrap().is_none());
    }

    #[test]
    fn test_keyword_search() {
        let (storage, _dir) = create_test_storage();

        storage.put(&memory_at("m1", "Likes green tea", 1, 1)).unwrap();
        storage.put(&memory_at("m2", "Drinks coffee in the morning", 2, 2)).unwrap();
        storage.put(&memory_at("m3", "Tea ceremony enthusiast", 3, 3)).unwrap();

        let results = storage.search("alice", "TEA", None).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "m3");

        let results = storage.search("alice", "green tea", None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "m1");

        assert!(storage.search("alice", "juice", None).unwrap().is_empty());
        assert!(storage.search("bob", "tea", None).unwrap().is_empty());
    }
}
