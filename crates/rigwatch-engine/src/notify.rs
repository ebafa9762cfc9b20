//! Fault notification sink
//!
//! The monitor reports each newly detected fault episode and each resolution
//! through a [`FaultNotifier`]. The default sink writes structured log lines.

use async_trait::async_trait;
use rigwatch_core::{FaultEvent, HistoryRecord};

#[async_trait]
pub trait FaultNotifier: Send + Sync {
    /// A fault episode was detected for the first time
    async fn fault_opened(&self, device_id: &str, event: &FaultEvent);

    /// A fault episode ended and was moved to history
    async fn fault_resolved(&self, record: &HistoryRecord);
}

/// Notifier that emits `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl FaultNotifier for LogNotifier {
    async fn fault_opened(&self, device_id: &str, event: &FaultEvent) {
        tracing::warn!(
            device = %device_id,
            code = %event.code,
            sensor = %event.sensor_channel,
            value = event.value,
            severity = ?event.severity,
            "Fault detected: {}",
            event.message
        );
    }

    async fn fault_resolved(&self, record: &HistoryRecord) {
        tracing::info!(
            device = %record.device_id,
            code = %record.code,
            duration_secs = record.duration_seconds,
            "Fault resolved"
        );
    }
}
