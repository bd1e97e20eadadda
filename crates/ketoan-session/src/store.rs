//! Session storage.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;

use crate::error::SessionResult;
use crate::types::{SessionId, SessionRecord};

/// Lifetime rules shared by every store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub idle_timeout: Duration,
    pub absolute_timeout: Duration,
    /// Idle limit for records without a user, which only carry flashes.
    pub anonymous_timeout: Duration,
}

impl ExpiryPolicy {
    pub fn is_expired(&self, record: &SessionRecord, now: OffsetDateTime) -> bool {
        let idle_limit = if record.data.user_id.is_some() {
            self.idle_timeout
        } else {
            self.anonymous_timeout
        };
        now - record.last_activity_at > idle_limit
            || now - record.created_at > self.absolute_timeout
    }
}

/// Storage for session records.
///
/// Expired records must behave exactly like missing ones: `load` never
/// returns a record the store's [`ExpiryPolicy`] considers expired.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a live session record.
    async fn load(&self, id: &SessionId) -> SessionResult<Option<SessionRecord>>;

    /// Insert or replace a session record.
    async fn save(&self, id: &SessionId, record: SessionRecord) -> SessionResult<()>;

    /// Record activity on an existing session without touching its data.
    async fn touch(&self, id: &SessionId, now: OffsetDateTime) -> SessionResult<()>;

    /// Remove a session record. Removing a missing record is not an error.
    async fn delete(&self, id: &SessionId) -> SessionResult<()>;

    /// Drop every record expired at `now`, returning how many were removed.
    async fn purge_expired(&self, now: OffsetDateTime) -> SessionResult<usize>;

    /// Number of records currently held, expired ones included.
    async fn count(&self) -> SessionResult<usize>;
}

/// In-process session store backed by a concurrent map.
///
/// Sessions do not survive a restart; users simply log in again.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: DashMap<SessionId, SessionRecord>,
    policy: ExpiryPolicy,
}

impl MemorySessionStore {
    pub fn new(policy: ExpiryPolicy) -> Self {
        Self {
            sessions: DashMap::new(),
            policy,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &SessionId) -> SessionResult<Option<SessionRecord>> {
        let now = OffsetDateTime::now_utc();
        let record = self.sessions.get(id).map(|r| r.value().clone());
        match record {
            Some(record) if self.policy.is_expired(&record, now) => {
                self.sessions
                    .remove_if(id, |_, r| self.policy.is_expired(r, now));
                tracing::debug!(session_id = %id, "Session expired");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn save(&self, id: &SessionId, record: SessionRecord) -> SessionResult<()> {
        self.sessions.insert(*id, record);
        Ok(())
    }

    async fn touch(&self, id: &SessionId, now: OffsetDateTime) -> SessionResult<()> {
        if let Some(mut record) = self.sessions.get_mut(id) {
            record.last_activity_at = now;
        }
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> SessionResult<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn purge_expired(&self, now: OffsetDateTime) -> SessionResult<usize> {
        let mut purged = 0;
        self.sessions.retain(|_, record| {
            let keep = !self.policy.is_expired(record, now);
            if !keep {
                purged += 1;
            }
            keep
        });
        Ok(purged)
    }

    async fn count(&self) -> SessionResult<usize> {
        Ok(self.sessions.len())
    }
}
