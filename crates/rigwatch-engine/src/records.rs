//! Machine log and maintenance record access

use chrono::{DateTime, Utc};
use rigwatch_core::{
    collections, from_document, to_document, Direction, DocumentStore, Filter, FilterOp,
    MachineLogEntry, MaintenanceRecord, Query, SeriesPeriod, SeriesPoint, StoreResult,
};
use serde_json::{Map, Value};

/// Append a raw snapshot to `machine_logs`
pub async fn append_log(store: &dyn DocumentStore, entry: &MachineLogEntry) -> StoreResult<String> {
    store
        .add(collections::MACHINE_LOGS, to_document(entry)?)
        .await
}

/// One channel from `machine_logs` over the last `period`, oldest first.
///
/// Entries without the channel contribute a zero.
pub async fn sensor_series(
    store: &dyn DocumentStore,
    device_id: Option<&str>,
    sensor: &str,
    period: SeriesPeriod,
    now: DateTime<Utc>,
) -> StoreResult<Vec<SeriesPoint>> {
    let since = now - period.duration();
    let mut query = Query::new()
        .filter(Filter::new("timestamp", FilterOp::Ge, since.timestamp_millis()))
        .filter(Filter::new("timestamp", FilterOp::Le, now.timestamp_millis()))
        .order_by("timestamp", Direction::Asc);
    if let Some(device_id) = device_id {
        query = query.filter(Filter::eq("deviceId", device_id));
    }

    let docs = store.query(collections::MACHINE_LOGS, &query).await?;
    let mut points = Vec::with_capacity(docs.len());
    for doc in docs {
        let Some(timestamp) = doc
            .data
            .get("timestamp")
            .and_then(Value::as_i64)
            .and_then(DateTime::from_timestamp_millis)
        else {
            tracing::debug!(id = %doc.id, "Skipping machine log without timestamp");
            continue;
        };
        let value = doc.data.get(sensor).and_then(Value::as_f64).unwrap_or(0.0);
        points.push(SeriesPoint { timestamp, value });
    }
    Ok(points)
}

/// Store a maintenance record, stamping its creation time
pub async fn add_maintenance(
    store: &dyn DocumentStore,
    mut fields: Map<String, Value>,
    now: DateTime<Utc>,
) -> StoreResult<MaintenanceRecord> {
    fields.remove("id");
    fields.remove("createdAt");
    let mut record = MaintenanceRecord {
        id: String::new(),
        created_at: now,
        fields,
    };
    record.id = store
        .add(collections::MAINTENANCE_RECORDS, to_document(&record)?)
        .await?;
    Ok(record)
}

/// All maintenance records, newest first
pub async fn list_maintenance(store: &dyn DocumentStore) -> StoreResult<Vec<MaintenanceRecord>> {
    let query = Query::new().order_by("createdAt", Direction::Desc);
    store
        .query(collections::MAINTENANCE_RECORDS, &query)
        .await?
        .into_iter()
        .map(|doc| {
            let mut record: MaintenanceRecord = from_document(doc.data)?;
            record.id = doc.id;
            Ok(record)
        })
        .collect()
}
