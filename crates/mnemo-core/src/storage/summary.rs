//! Typed session summary storage wrapper.

use crate::models::SessionSummary;
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct SessionSummaryStorage {
    inner: mnemo_storage::SessionSummaryStorage,
}

impl From<mnemo_storage::SessionSummaryStorage> for SessionSummaryStorage {
    fn from(inner: mnemo_storage::SessionSummaryStorage) -> Self {
        Self { inner }
    }
}

impl SessionSummaryStorage {
    pub fn get(&self, session_id: &str, user_id: &str) -> Result<Option<SessionSummary>> {
        match self.inner.get_raw(session_id, user_id)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Upsert the summary for `(session_id, user_id)`.
    ///
    /// An existing row keeps its `created_at`.
    pub fn save(&self, summary: &SessionSummary) -> Result<SessionSummary> {
        let mut stored = summary.clone();
        if let Some(existing) = self.get(&summary.session_id, &summary.user_id)? {
            stored.created_at = existing.created_at;
        }
        let json_bytes = serde_json::to_vec(&stored)?;
        self.inner
            .put_raw(&stored.session_id, &stored.user_id, &json_bytes)?;
        Ok(stored)
    }

    pub fn delete(&self, session_id: &str, user_id: &str) -> Result<bool> {
        self.inner.delete(session_id, user_id)
    }
}
