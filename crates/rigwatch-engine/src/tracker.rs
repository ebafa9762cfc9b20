//! Fault lifecycle tracking
//!
//! Each (device, fault code) pair moves through three states:
//!
//! ```text
//!   absent ──first detection──▶ active ──resolve──▶ absent
//!                                │  ▲                 │
//!                                └──┘ refresh          └─▶ error_history
//! ```
//!
//! Active episodes live in `active_errors` under `"{device}/{code}"`. Opening
//! uses the store's create-if-absent and resolving uses delete-if-exists, so
//! a racing writer that loses simply observes a no-op.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use rigwatch_core::{
    collections, from_document, to_document, ActiveFault, Clock, Direction, Document,
    DocumentStore, FaultEvent, Filter, HistoryRecord, Query, RawSnapshot, StoreResult,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::EngineConfig;

/// Tracker settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Upper bound on records returned by [`FaultTracker::list_history`]
    pub history_limit: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { history_limit: 200 }
    }
}

impl From<&EngineConfig> for TrackerConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            history_limit: config.history_limit,
        }
    }
}

/// What a detection did to the stored episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultTransition {
    /// absent → active
    Opened,
    /// active → active, `lastSeenAt` bumped
    Refreshed,
}

/// Result of [`FaultTracker::log_error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOutcome {
    pub transition: FaultTransition,
    /// First detection of this episode seen by this process
    pub notify: bool,
}

/// Store key of an active fault
pub fn active_key(device_id: &str, code: &str) -> String {
    format!("{}/{}", device_id, code)
}

/// Tracks open fault episodes and their history
pub struct FaultTracker {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
    /// Episodes already reported, keyed like `active_errors`
    notified: Mutex<HashSet<String>>,
    device_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl FaultTracker {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, config: TrackerConfig) -> Self {
        Self {
            store,
            clock,
            config,
            notified: Mutex::new(HashSet::new()),
            device_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn device_lock(&self, device_id: &str) -> Arc<AsyncMutex<()>> {
        self.device_locks
            .lock()
            .entry(device_id.to_string())
            .or_default()
            .clone()
    }

    /// Record a detection of `event` on `device_id`.
    ///
    /// Opens a new episode when none is active; otherwise only `lastSeenAt`
    /// moves, and never backwards. `startedAt` and the start snapshot are
    /// fixed once written.
    pub async fn log_error(
        &self,
        device_id: &str,
        event: &FaultEvent,
        snapshot: &RawSnapshot,
    ) -> StoreResult<LogOutcome> {
        let lock = self.device_lock(device_id);
        let _guard = lock.lock().await;

        let key = active_key(device_id, &event.code);
        let now = self.clock.now();

        let transition = if self.open(&key, device_id, event, snapshot, now).await? {
            FaultTransition::Opened
        } else if self.refresh(&key, now).await? {
            FaultTransition::Refreshed
        } else if self.open(&key, device_id, event, snapshot, now).await? {
            // resolved by another writer between the two calls
            FaultTransition::Opened
        } else {
            FaultTransition::Refreshed
        };

        let notify = self.notified.lock().insert(key);
        if transition == FaultTransition::Opened {
            tracing::debug!(device = %device_id, code = %event.code, "Fault episode opened");
        }
        Ok(LogOutcome { transition, notify })
    }

    async fn open(
        &self,
        key: &str,
        device_id: &str,
        event: &FaultEvent,
        snapshot: &RawSnapshot,
        now: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<bool> {
        let active = ActiveFault {
            device_id: device_id.to_string(),
            code: event.code.clone(),
            message: event.message.clone(),
            sensor_channel: event.sensor_channel.clone(),
            value_at_start: event.value,
            started_at: now,
            last_seen_at: now,
            snapshot_at_start: snapshot.clone(),
        };
        self.store
            .create(collections::ACTIVE_ERRORS, key, to_document(&active)?)
            .await
    }

    /// Bump `lastSeenAt`; `false` when the episode no longer exists
    async fn refresh(&self, key: &str, now: chrono::DateTime<chrono::Utc>) -> StoreResult<bool> {
        let Some(doc) = self.store.get(collections::ACTIVE_ERRORS, key).await? else {
            return Ok(false);
        };
        let existing: ActiveFault = from_document(doc)?;
        if now <= existing.last_seen_at {
            return Ok(true);
        }
        let mut fields = Document::new();
        fields.insert(
            "lastSeenAt".to_string(),
            Value::from(now.timestamp_millis()),
        );
        self.store
            .update(collections::ACTIVE_ERRORS, key, fields)
            .await
    }

    /// Close the active episode of `code` on `device_id`.
    ///
    /// Returns `None` when nothing was active. If the history write fails the
    /// episode is put back so a later resolve can retry.
    pub async fn resolve_error(
        &self,
        device_id: &str,
        code: &str,
        snapshot: &RawSnapshot,
    ) -> StoreResult<Option<HistoryRecord>> {
        let lock = self.device_lock(device_id);
        let _guard = lock.lock().await;

        let key = active_key(device_id, code);
        let Some(doc) = self.store.take(collections::ACTIVE_ERRORS, &key).await? else {
            self.notified.lock().remove(&key);
            return Ok(None);
        };

        let active: ActiveFault = from_document(doc.clone())?;
        let ended_at = self.clock.now().max(active.started_at);
        let mut record = HistoryRecord::close(active, ended_at, snapshot.clone());

        match self
            .store
            .add(collections::ERROR_HISTORY, to_document(&record)?)
            .await
        {
            Ok(id) => record.id = id,
            Err(e) => {
                tracing::error!(device = %device_id, code, error = %e, "Failed to write fault history, restoring episode");
                if let Err(restore) = self.store.create(collections::ACTIVE_ERRORS, &key, doc).await {
                    tracing::error!(device = %device_id, code, error = %restore, "Failed to restore active fault");
                }
                return Err(e);
            }
        }

        self.notified.lock().remove(&key);
        Ok(Some(record))
    }

    /// The active episode of `code` on `device_id`, if any
    pub async fn get_active(&self, device_id: &str, code: &str) -> StoreResult<Option<ActiveFault>> {
        self.store
            .get(collections::ACTIVE_ERRORS, &active_key(device_id, code))
            .await?
            .map(from_document)
            .transpose()
    }

    /// Open episodes, oldest first
    pub async fn list_active_faults(&self, device_id: Option<&str>) -> StoreResult<Vec<ActiveFault>> {
        let mut query = Query::new().order_by("startedAt", Direction::Asc);
        if let Some(device_id) = device_id {
            query = query.filter(Filter::eq("deviceId", device_id));
        }
        self.store
            .query(collections::ACTIVE_ERRORS, &query)
            .await?
            .into_iter()
            .map(|doc| from_document(doc.data))
            .collect()
    }

    /// Resolved episodes, most recently started first, capped at the
    /// configured history limit
    pub async fn list_history(
        &self,
        device_id: Option<&str>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<HistoryRecord>> {
        let limit = limit
            .unwrap_or(self.config.history_limit)
            .min(self.config.history_limit);
        let mut query = Query::new()
            .order_by("startedAt", Direction::Desc)
            .limit(limit);
        if let Some(device_id) = device_id {
            query = query.filter(Filter::eq("deviceId", device_id));
        }
        self.store
            .query(collections::ERROR_HISTORY, &query)
            .await?
            .into_iter()
            .map(|doc| {
                let mut record: HistoryRecord = from_document(doc.data)?;
                record.id = doc.id;
                Ok(record)
            })
            .collect()
    }
}
