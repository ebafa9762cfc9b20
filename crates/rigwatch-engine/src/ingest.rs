//! Telemetry message parsing
//!
//! Machines publish one JSON object per snapshot. Parsing is lenient: any
//! numeric field is a channel, and unknown non-numeric fields are dropped.

use rigwatch_core::RawSnapshot;
use serde_json::Value;

use crate::error::{IngestError, IngestResult};

/// A parsed telemetry message
#[derive(Debug, Clone, PartialEq)]
pub struct InboundSnapshot {
    /// Device named in the message itself, if any
    pub device_id: Option<String>,
    pub snapshot: RawSnapshot,
}

/// A telemetry message as received from a transport
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Device the transport associates with the message
    pub device_id: Option<String>,
    /// Raw frame; expected to be a UTF-8 JSON object
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(device_id: Option<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            device_id,
            payload: payload.into(),
        }
    }
}

/// Parse one JSON telemetry message
pub fn parse_snapshot(payload: &str) -> IngestResult<InboundSnapshot> {
    let value: Value = serde_json::from_str(payload)?;
    let obj = value.as_object().ok_or(IngestError::NotAnObject)?;

    let device_id = ["device_id", "deviceId"]
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    let snapshot = RawSnapshot::from_json(&value).ok_or(IngestError::NotAnObject)?;
    if snapshot.channels.is_empty() && snapshot.gps.is_none() {
        return Err(IngestError::NoReadings);
    }
    Ok(InboundSnapshot {
        device_id,
        snapshot,
    })
}

/// Parse a binary frame carrying a UTF-8 JSON message
pub fn parse_bytes(payload: &[u8]) -> IngestResult<InboundSnapshot> {
    parse_snapshot(std::str::from_utf8(payload)?)
}
