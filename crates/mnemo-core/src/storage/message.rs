//! Typed conversation message storage wrapper.

use crate::models::ConversationMessage;
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct MessageStorage {
    inner: mnemo_storage::MessageStorage,
}

impl From<mnemo_storage::MessageStorage> for MessageStorage {
    fn from(inner: mnemo_storage::MessageStorage) -> Self {
        Self { inner }
    }
}

impl MessageStorage {
    /// Append a message to its session log.
    pub fn append(&self, message: &ConversationMessage) -> Result<()> {
        let json_bytes = serde_json::to_vec(message)?;
        self.inner.append_raw(
            &message.id,
            &message.user_id,
            &message.session_id,
            &json_bytes,
        )?;
        Ok(())
    }

    pub fn get(&self, message_id: &str) -> Result<Option<ConversationMessage>> {
        match self.inner.get_raw(message_id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Messages of a session, oldest first. `limit` keeps the most recent ones.
    pub fn list(
        &self,
        user_id: &str,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationMessage>> {
        let mut result = Vec::new();
        for (_, bytes) in self.inner.list_session_raw(user_id, session_id, limit)? {
            let message: ConversationMessage = serde_json::from_slice(&bytes)?;
            result.push(message);
        }
        Ok(result)
    }

    pub fn count(&self, user_id: &str, session_id: &str) -> Result<u64> {
        self.inner.count_session(user_id, session_id)
    }

    pub fn delete_session(&self, user_id: &str, session_id: &str) -> Result<u32> {
        self.inner.delete_session(user_id, session_id)
    }
}
