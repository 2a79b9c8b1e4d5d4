//! services/app/src/session.rs
//!
//! Day-scoped session and usage bookkeeping over an injected key-value store.
//!
//! Every storage fault is caught, logged, and treated as "absent": a broken
//! store degrades to a fresh (possibly unpersisted) session rather than a
//! crash.

use chrono::{Local, NaiveDate, Utc};
use gpdf_core::domain::{Session, UsageSnapshot};
use gpdf_core::ports::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

// Persisted key names, shared with the host platform's daily-reset trigger.
const KEY_SESSION_ID: &str = "sessionId";
const KEY_SESSION_DATE: &str = "sessionDate";
const KEY_USAGE_INFO: &str = "usageInfo";
const KEY_LAST_UPDATED: &str = "lastUpdated";
const KEY_SETTINGS: &str = "settings";

/// A cached usage snapshot is discarded once it is this old.
const USAGE_FRESHNESS_MS: i64 = 24 * 60 * 60 * 1000;

//=========================================================================================
// "Impure" Stored Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize)]
struct UsageRecord {
    usage_count: u32,
    limit: u32,
    remaining: u32,
    reset_time: chrono::DateTime<Utc>,
}

impl UsageRecord {
    fn from_domain(snapshot: &UsageSnapshot) -> Self {
        Self {
            usage_count: snapshot.usage_count,
            limit: snapshot.limit,
            remaining: snapshot.remaining,
            reset_time: snapshot.reset_time,
        }
    }

    fn to_domain(self) -> UsageSnapshot {
        // Recomputed so the clamping invariant survives whatever was stored.
        UsageSnapshot::new(self.usage_count, self.limit, self.reset_time)
    }
}

//=========================================================================================
// The Session Tracker
//=========================================================================================

/// Tracks the per-day session identifier and the cached usage snapshot.
#[derive(Clone)]
pub struct SessionTracker {
    store: Arc<dyn KeyValueStore>,
}

impl SessionTracker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Mints a collision-resistant (not cryptographic) session identifier.
    fn mint_session_id() -> String {
        format!(
            "session_{}_{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        )
    }

    /// Returns the stored session only if it was created today. Never mutates
    /// storage; a stale entry is simply reported as absent.
    pub async fn get_session(&self) -> Option<Session> {
        let values = match self.store.get(&[KEY_SESSION_ID, KEY_SESSION_DATE]).await {
            Ok(values) => values,
            Err(e) => {
                warn!("Failed to read session from storage: {}", e);
                return None;
            }
        };

        let id = values.get(KEY_SESSION_ID)?.as_str()?.to_string();
        let created_on = values
            .get(KEY_SESSION_DATE)?
            .as_str()?
            .parse::<NaiveDate>()
            .ok()?;

        let session = Session { id, created_on };
        session.is_valid_on(Self::today()).then_some(session)
    }

    /// Stores the given id with today's date, overwriting any prior session.
    pub async fn set_session(&self, id: &str) {
        let entries = HashMap::from([
            (KEY_SESSION_ID.to_string(), serde_json::json!(id)),
            (
                KEY_SESSION_DATE.to_string(),
                serde_json::json!(Self::today().to_string()),
            ),
        ]);
        if let Err(e) = self.store.set(entries).await {
            warn!("Failed to persist session: {}", e);
        }
    }

    /// Returns today's session, minting and persisting a new one if needed.
    ///
    /// When the store is faulty the new session is returned unpersisted, so
    /// the flow is never blocked by a storage error.
    pub async fn get_or_create_session(&self) -> Session {
        if let Some(session) = self.get_session().await {
            return session;
        }

        let session = Session {
            id: Self::mint_session_id(),
            created_on: Self::today(),
        };
        self.set_session(&session.id).await;
        session
    }

    /// Returns the cached usage snapshot while it is younger than 24 hours.
    pub async fn get_usage_snapshot(&self) -> Option<UsageSnapshot> {
        let values = match self.store.get(&[KEY_USAGE_INFO, KEY_LAST_UPDATED]).await {
            Ok(values) => values,
            Err(e) => {
                warn!("Failed to read usage snapshot from storage: {}", e);
                return None;
            }
        };

        let last_updated = values.get(KEY_LAST_UPDATED)?.as_i64()?;
        if Utc::now().timestamp_millis() - last_updated >= USAGE_FRESHNESS_MS {
            return None;
        }

        let record: UsageRecord =
            serde_json::from_value(values.get(KEY_USAGE_INFO)?.clone()).ok()?;
        Some(record.to_domain())
    }

    /// Caches the snapshot together with the current instant.
    pub async fn set_usage_snapshot(&self, snapshot: &UsageSnapshot) {
        let record = UsageRecord::from_domain(snapshot);
        let value = match serde_json::to_value(&record) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to encode usage snapshot: {}", e);
                return;
            }
        };
        let entries = HashMap::from([
            (KEY_USAGE_INFO.to_string(), value),
            (
                KEY_LAST_UPDATED.to_string(),
                serde_json::json!(Utc::now().timestamp_millis()),
            ),
        ]);
        if let Err(e) = self.store.set(entries).await {
            warn!("Failed to persist usage snapshot: {}", e);
        }
    }

    /// Returns the opaque settings blob, defaulting to an empty object.
    pub async fn get_settings(&self) -> serde_json::Value {
        match self.store.get(&[KEY_SETTINGS]).await {
            Ok(mut values) => values
                .remove(KEY_SETTINGS)
                .unwrap_or_else(|| serde_json::json!({})),
            Err(e) => {
                warn!("Failed to read settings: {}", e);
                serde_json::json!({})
            }
        }
    }

    pub async fn set_settings(&self, settings: serde_json::Value) {
        let entries = HashMap::from([(KEY_SETTINGS.to_string(), settings)]);
        if let Err(e) = self.store.set(entries).await {
            warn!("Failed to persist settings: {}", e);
        }
    }

    /// Clears the session and usage keys. Invoked by the host platform's
    /// scheduled midnight trigger; settings are left intact.
    pub async fn reset_daily(&self) {
        let keys = [KEY_SESSION_ID, KEY_SESSION_DATE, KEY_USAGE_INFO, KEY_LAST_UPDATED];
        if let Err(e) = self.store.remove(&keys).await {
            warn!("Failed to reset daily keys: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryStore;
    use async_trait::async_trait;
    use chrono::Duration;
    use gpdf_core::ports::{PortError, PortResult};
    use serde_json::json;

    /// A store whose every operation fails, for exercising fail-open paths.
    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _: &[&str]) -> PortResult<HashMap<String, serde_json::Value>> {
            Err(PortError::Storage("quota exceeded".to_string()))
        }
        async fn set(&self, _: HashMap<String, serde_json::Value>) -> PortResult<()> {
            Err(PortError::Storage("quota exceeded".to_string()))
        }
        async fn remove(&self, _: &[&str]) -> PortResult<()> {
            Err(PortError::Storage("quota exceeded".to_string()))
        }
    }

    fn tracker_with_memory() -> (SessionTracker, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SessionTracker::new(store.clone()), store)
    }

    #[tokio::test]
    async fn session_is_reused_within_the_same_day() {
        let (tracker, _) = tracker_with_memory();
        let first = tracker.get_or_create_session().await;
        let second = tracker.get_or_create_session().await;
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn session_from_an_earlier_date_is_absent() {
        let (tracker, store) = tracker_with_memory();
        let yesterday = (Local::now().date_naive() - Duration::days(1)).to_string();
        store
            .set(HashMap::from([
                (KEY_SESSION_ID.to_string(), json!("session_old")),
                (KEY_SESSION_DATE.to_string(), json!(yesterday)),
            ]))
            .await
            .unwrap();

        assert!(tracker.get_session().await.is_none());

        // A stale entry is superseded, not resurrected.
        let fresh = tracker.get_or_create_session().await;
        assert_ne!(fresh.id, "session_old");
    }

    #[tokio::test]
    async fn get_session_does_not_mutate_storage() {
        let (tracker, store) = tracker_with_memory();
        let yesterday = (Local::now().date_naive() - Duration::days(1)).to_string();
        store
            .set(HashMap::from([
                (KEY_SESSION_ID.to_string(), json!("session_old")),
                (KEY_SESSION_DATE.to_string(), json!(yesterday.clone())),
            ]))
            .await
            .unwrap();

        tracker.get_session().await;

        let values = store.get(&[KEY_SESSION_ID, KEY_SESSION_DATE]).await.unwrap();
        assert_eq!(values[KEY_SESSION_ID], json!("session_old"));
        assert_eq!(values[KEY_SESSION_DATE], json!(yesterday));
    }

    #[tokio::test]
    async fn minted_session_ids_are_distinct() {
        let a = SessionTracker::mint_session_id();
        let b = SessionTracker::mint_session_id();
        assert_ne!(a, b);
        assert!(a.starts_with("session_"));
    }

    #[tokio::test]
    async fn broken_store_still_yields_an_ephemeral_session() {
        let tracker = SessionTracker::new(Arc::new(BrokenStore));
        let session = tracker.get_or_create_session().await;
        assert!(session.id.starts_with("session_"));
        assert!(session.is_valid_on(Local::now().date_naive()));
    }

    #[tokio::test]
    async fn usage_snapshot_round_trips_while_fresh() {
        let (tracker, _) = tracker_with_memory();
        let snapshot = UsageSnapshot::new(1, 3, Utc::now() + Duration::hours(12));
        tracker.set_usage_snapshot(&snapshot).await;

        let cached = tracker.get_usage_snapshot().await.unwrap();
        assert_eq!(cached, snapshot);
    }

    #[tokio::test]
    async fn usage_snapshot_older_than_24h_is_discarded() {
        let (tracker, store) = tracker_with_memory();
        let stale_instant = Utc::now().timestamp_millis() - USAGE_FRESHNESS_MS;
        store
            .set(HashMap::from([
                (
                    KEY_USAGE_INFO.to_string(),
                    json!({
                        "usage_count": 1,
                        "limit": 3,
                        "remaining": 2,
                        "reset_time": "2030-01-01T00:00:00Z"
                    }),
                ),
                (KEY_LAST_UPDATED.to_string(), json!(stale_instant)),
            ]))
            .await
            .unwrap();

        assert!(tracker.get_usage_snapshot().await.is_none());
    }

    #[tokio::test]
    async fn daily_reset_clears_session_but_keeps_settings() {
        let (tracker, store) = tracker_with_memory();
        tracker.set_session("session_1").await;
        tracker.set_settings(json!({"format": "docx"})).await;

        tracker.reset_daily().await;

        assert!(tracker.get_session().await.is_none());
        assert_eq!(tracker.get_settings().await, json!({"format": "docx"}));
        let leftovers = store.get(&[KEY_USAGE_INFO, KEY_LAST_UPDATED]).await.unwrap();
        assert!(leftovers.is_empty());
    }
}
