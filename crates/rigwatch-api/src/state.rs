//! Application state for the rigwatch API

use std::future::Future;
use std::sync::Arc;

use rigwatch_conv::KnowledgeBase;
use rigwatch_core::{Clock, DocumentStore, Forecaster};
use rigwatch_engine::{FaultTracker, InboundMessage, Monitor};
use tokio::sync::{mpsc, watch};

use crate::error::ApiError;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    monitor: Arc<Monitor>,
    /// Store used for logs and maintenance records (already time-bounded)
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    forecaster: Option<Arc<dyn Forecaster>>,
    /// Feed into the monitor's telemetry loop
    telemetry_tx: mpsc::Sender<InboundMessage>,
    /// Flips to `true` when the server is stopping
    shutdown: Option<watch::Receiver<bool>>,
}

impl AppState {
    pub fn new(
        monitor: Arc<Monitor>,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
        telemetry_tx: mpsc::Sender<InboundMessage>,
    ) -> Self {
        Self {
            monitor,
            store,
            clock,
            forecaster: None,
            telemetry_tx,
            shutdown: None,
        }
    }

    /// Let long-lived connections observe server shutdown
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Attach a forecast service
    pub fn with_forecaster(mut self, forecaster: Arc<dyn Forecaster>) -> Self {
        self.forecaster = Some(forecaster);
        self
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    pub fn tracker(&self) -> &Arc<FaultTracker> {
        self.monitor.tracker()
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        self.monitor.evaluator().knowledge()
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn forecaster(&self) -> Option<&dyn Forecaster> {
        self.forecaster.as_deref()
    }

    pub fn telemetry(&self) -> &mpsc::Sender<InboundMessage> {
        &self.telemetry_tx
    }

    /// Resolves once shutdown is signalled or its sender is gone.
    /// Never resolves when no shutdown channel is attached.
    pub fn shutdown_requested(&self) -> impl Future<Output = ()> + Send + 'static {
        let shutdown = self.shutdown.clone();
        async move {
            match shutdown {
                Some(mut rx) => {
                    let _ = rx.wait_for(|stop| *stop).await;
                }
                None => std::future::pending().await,
            }
        }
    }

    /// Device id from a request, falling back to the configured default
    pub fn device_or_default(&self, device_id: Option<String>) -> String {
        device_id
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| self.monitor.config().device_id.clone())
    }

    /// Latest snapshot of a device
    pub fn latest(&self, device_id: &str) -> Result<rigwatch_engine::LatestSnapshot, ApiError> {
        self.monitor
            .latest(device_id)
            .ok_or_else(|| ApiError::NotFound(format!("No telemetry received from {}", device_id)))
    }
}
