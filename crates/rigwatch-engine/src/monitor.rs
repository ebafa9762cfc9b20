//! Per-device evaluation pipeline
//!
//! Every incoming snapshot runs one pass:
//!
//! 1. evaluate against the rule table
//! 2. record each emitted fault (open or refresh)
//! 3. resolve every code that was open last pass but is not emitted now
//! 4. append the raw snapshot to `machine_logs`, rate limited per device
//!
//! Passes for one device never overlap; different devices proceed
//! independently. Store failures are logged and skip only the affected step.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rigwatch_core::{
    Clock, CriticalMetrics, Diagnosis, DocumentStore, MachineLogEntry, OperationalMetrics,
    PhysicalSnapshot, RawSnapshot,
};
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Mutex as AsyncMutex};

use crate::config::EngineConfig;
use crate::evaluator::Evaluator;
use crate::ingest::{parse_bytes, InboundMessage};
use crate::limiter::RateLimiter;
use crate::notify::{FaultNotifier, LogNotifier};
use crate::records;
use crate::tracker::{FaultTracker, FaultTransition};

/// Queue depth of each per-device worker
const DEVICE_QUEUE: usize = 64;

/// Capacity of the pass report broadcast
const REPORT_CHANNEL: usize = 256;

/// Outcome of one evaluation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub device_id: String,
    pub diagnosis: Diagnosis,
    /// Codes whose episode started in this pass
    pub opened: Vec<String>,
    /// Codes whose episode ended in this pass
    pub resolved: Vec<String>,
    /// Snapshot was written to `machine_logs`
    pub logged: bool,
    /// Store operations that failed or timed out
    pub failures: usize,
}

/// Most recent snapshot of a device with derived views
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestSnapshot {
    pub device_id: String,
    #[serde(with = "ts_milliseconds")]
    pub received_at: DateTime<Utc>,
    pub raw: RawSnapshot,
    pub physical: PhysicalSnapshot,
    pub critical_metrics: CriticalMetrics,
    pub operational_metrics: OperationalMetrics,
    pub diagnosis: Diagnosis,
    pub valid: bool,
}

struct DeviceState {
    /// Codes emitted by the previous pass (plus any that failed to resolve)
    open_codes: BTreeSet<String>,
    /// Open codes have been loaded from the store
    seeded: bool,
    limiter: RateLimiter,
}

/// Drives evaluation passes for all devices
pub struct Monitor {
    evaluator: Evaluator,
    tracker: Arc<FaultTracker>,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn FaultNotifier>,
    config: EngineConfig,
    devices: Mutex<HashMap<String, Arc<AsyncMutex<DeviceState>>>>,
    latest: RwLock<HashMap<String, LatestSnapshot>>,
    reports: broadcast::Sender<PassReport>,
}

impl Monitor {
    pub fn new(
        evaluator: Evaluator,
        tracker: Arc<FaultTracker>,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        let (reports, _) = broadcast::channel(REPORT_CHANNEL);
        Self {
            evaluator,
            tracker,
            store,
            clock,
            notifier: Arc::new(LogNotifier),
            config,
            devices: Mutex::new(HashMap::new()),
            latest: RwLock::new(HashMap::new()),
            reports,
        }
    }

    /// Replace the default log notifier
    pub fn with_notifier(mut self, notifier: Arc<dyn FaultNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn tracker(&self) -> &Arc<FaultTracker> {
        &self.tracker
    }

    /// Receive a report after every pass
    pub fn subscribe(&self) -> broadcast::Receiver<PassReport> {
        self.reports.subscribe()
    }

    /// Last snapshot processed for a device
    pub fn latest(&self, device_id: &str) -> Option<LatestSnapshot> {
        self.latest.read().get(device_id).cloned()
    }

    /// Devices seen since startup, sorted
    pub fn devices(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.latest.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Register `device_id` unless the device limit is reached.
    ///
    /// Known devices are always admitted. Callers feeding telemetry from
    /// untrusted sources check this before [`process`](Self::process).
    pub fn admit(&self, device_id: &str) -> bool {
        let mut devices = self.devices.lock();
        if devices.contains_key(device_id) {
            return true;
        }
        if devices.len() >= self.config.max_devices {
            return false;
        }
        devices.insert(device_id.to_string(), self.new_device_state());
        true
    }

    fn new_device_state(&self) -> Arc<AsyncMutex<DeviceState>> {
        Arc::new(AsyncMutex::new(DeviceState {
            open_codes: BTreeSet::new(),
            seeded: false,
            limiter: RateLimiter::new(self.config.snapshot_interval()),
        }))
    }

    fn device_state(&self, device_id: &str) -> Arc<AsyncMutex<DeviceState>> {
        self.devices
            .lock()
            .entry(device_id.to_string())
            .or_insert_with(|| self.new_device_state())
            .clone()
    }

    /// Run one evaluation pass for `device_id`
    pub async fn process(&self, device_id: &str, snapshot: RawSnapshot) -> PassReport {
        let state = self.device_state(device_id);
        let mut state = state.lock().await;
        let now = self.clock.now();

        let diagnosis = self.evaluator.evaluate(&snapshot);
        let mut report = PassReport {
            device_id: device_id.to_string(),
            diagnosis: diagnosis.clone(),
            ..Default::default()
        };

        if !state.seeded {
            match self.tracker.list_active_faults(Some(device_id)).await {
                Ok(active) => {
                    if !active.is_empty() {
                        tracing::info!(device = %device_id, count = active.len(), "Resuming open faults");
                    }
                    state.open_codes.extend(active.into_iter().map(|a| a.code));
                    state.seeded = true;
                }
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(device = %device_id, error = %e, "Failed to load open faults");
                }
            }
        }

        let mut open = BTreeSet::new();
        for event in &diagnosis.errors {
            open.insert(event.code.clone());
            match self.tracker.log_error(device_id, event, &snapshot).await {
                Ok(outcome) => {
                    if outcome.transition == FaultTransition::Opened {
                        report.opened.push(event.code.clone());
                    }
                    if outcome.notify {
                        self.notifier.fault_opened(device_id, event).await;
                    }
                }
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(device = %device_id, code = %event.code, error = %e, "Failed to record fault");
                }
            }
        }

        let cleared: Vec<String> = state.open_codes.difference(&open).cloned().collect();
        for code in cleared {
            match self.tracker.resolve_error(device_id, &code, &snapshot).await {
                Ok(Some(record)) => {
                    report.resolved.push(code);
                    self.notifier.fault_resolved(&record).await;
                }
                Ok(None) => {}
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(device = %device_id, code = %code, error = %e, "Failed to resolve fault");
                    open.insert(code);
                }
            }
        }
        state.open_codes = open;

        let issues = snapshot.issues();
        if !issues.is_empty() {
            tracing::debug!(
                device = %device_id,
                issues = %issues.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("; "),
                "Snapshot failed validation, not logged"
            );
        } else if state.limiter.try_acquire(now) {
            let entry = MachineLogEntry {
                device_id: device_id.to_string(),
                timestamp: now,
                snapshot: snapshot.clone(),
            };
            match records::append_log(self.store.as_ref(), &entry).await {
                Ok(_) => report.logged = true,
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(device = %device_id, error = %e, "Failed to log snapshot");
                }
            }
        }

        let latest = LatestSnapshot {
            device_id: device_id.to_string(),
            received_at: now,
            physical: self.evaluator.knowledge().condition(&snapshot),
            critical_metrics: snapshot.critical_metrics(),
            operational_metrics: snapshot.operational_metrics(),
            diagnosis,
            valid: issues.is_empty(),
            raw: snapshot,
        };
        self.latest.write().insert(device_id.to_string(), latest);
        drop(state);

        // no subscribers is fine
        let _ = self.reports.send(report.clone());
        report
    }

    /// Consume telemetry messages until the channel closes.
    ///
    /// Each device gets its own worker task so a slow store call for one
    /// machine does not delay the others. Messages for the same device are
    /// processed in arrival order; when a device's queue is full its newest
    /// snapshot is dropped. Devices beyond the configured limit are ignored.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<InboundMessage>) {
        let mut workers: HashMap<String, mpsc::Sender<RawSnapshot>> = HashMap::new();
        let mut handles = Vec::new();

        while let Some(message) = rx.recv().await {
            let parsed = match parse_bytes(&message.payload) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping telemetry message");
                    continue;
                }
            };
            let device_id = parsed
                .device_id
                .or(message.device_id)
                .unwrap_or_else(|| self.config.device_id.clone());

            let tx = match workers.entry(device_id.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    if !self.admit(&device_id) {
                        tracing::warn!(
                            device = %device_id,
                            limit = self.config.max_devices,
                            "Device limit reached, dropping telemetry"
                        );
                        continue;
                    }
                    tracing::info!(device = %device_id, "Starting device worker");
                    let (tx, rx) = mpsc::channel(DEVICE_QUEUE);
                    handles.push(tokio::spawn(self.clone().device_worker(device_id.clone(), rx)));
                    entry.insert(tx)
                }
            };
            match tx.try_send(parsed.snapshot) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(device = %device_id, "Device queue full, dropping snapshot");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::error!(device = %device_id, "Device worker stopped, dropping snapshot");
                }
            }
        }

        drop(workers);
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Device worker panicked");
            }
        }
        tracing::info!("Telemetry channel closed, monitor stopped");
    }

    async fn device_worker(self: Arc<Self>, device_id: String, mut rx: mpsc::Receiver<RawSnapshot>) {
        while let Some(snapshot) = rx.recv().await {
            self.process(&device_id, snapshot).await;
        }
    }
}
