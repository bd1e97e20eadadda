use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;

use crate::store::SessionStore;

/// Periodically purge expired sessions.
///
/// The task runs until aborted; the server aborts it on shutdown.
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately; nothing can be expired yet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.purge_expired(OffsetDateTime::now_utc()).await {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Purged expired sessions"),
                Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ExpiryPolicy, MemorySessionStore};
    use crate::types::{SessionData, SessionId, SessionRecord};

    #[tokio::test(start_paused = true)]
    async fn sweeper_purges_on_tick() {
        let store = Arc::new(MemorySessionStore::new(ExpiryPolicy {
            idle_timeout: Duration::from_secs(1),
            absolute_timeout: Duration::from_secs(10),
            anonymous_timeout: Duration::from_secs(1),
        }));
        let stale = OffsetDateTime::now_utc() - time::Duration::seconds(30);
        store
            .save(
                &SessionId::generate(),
                SessionRecord::new(SessionData::default(), stale),
            )
            .await
            .unwrap();

        let handle = spawn_sweeper(store.clone(), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;
        for _ in 0..10 {
            if store.count().await.unwrap() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(store.count().await.unwrap(), 0);
        handle.abort();
    }
}
