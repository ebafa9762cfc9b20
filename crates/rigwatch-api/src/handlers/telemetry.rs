//! Telemetry ingestion handlers
//!
//! Machines stream snapshots over a websocket; each text or binary frame is
//! one JSON snapshot forwarded to the monitor, which drops frames that do
//! not parse. The socket also receives a pass report for every snapshot
//! processed for its device.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use futures::{Sink, SinkExt, Stream, StreamExt};
use rigwatch_engine::{parse_snapshot, InboundMessage, PassReport};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct TelemetryQuery {
    pub device: Option<String>,
}

/// POST /api/telemetry
/// Process one snapshot synchronously and return the pass report
pub async fn ingest(
    State(state): State<AppState>,
    Query(query): Query<TelemetryQuery>,
    body: String,
) -> Result<Json<PassReport>, ApiError> {
    let parsed = parse_snapshot(&body)?;
    let device_id = state.device_or_default(parsed.device_id.or(query.device));
    if !state.monitor().admit(&device_id) {
        return Err(ApiError::ServiceUnavailable(format!(
            "Device limit reached, not accepting telemetry from {}",
            device_id
        )));
    }
    Ok(Json(state.monitor().process(&device_id, parsed.snapshot).await))
}

/// GET /ws/telemetry
pub async fn telemetry_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<TelemetryQuery>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.device))
}

async fn handle_socket(socket: WebSocket, state: AppState, device: Option<String>) {
    let device_id = state.device_or_default(device);
    let (sender, receiver) = socket.split();
    serve_socket(receiver, sender, state, device_id).await;
}

/// Pump one telemetry connection until the peer hangs up or the server
/// shuts down.
///
/// Frames go to the monitor as they arrive; pass reports for `device_id`
/// go back out. On shutdown a close frame is sent and the state, including
/// its telemetry sender, is released.
pub async fn serve_socket<R, W>(mut receiver: R, mut sender: W, state: AppState, device_id: String)
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
    W: Sink<Message> + Unpin,
{
    tracing::info!(device = %device_id, "Telemetry socket connected");

    let mut reports = state.monitor().subscribe();
    let shutdown = state.shutdown_requested();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!(device = %device_id, "Closing telemetry socket for shutdown");
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
            frame = receiver.next() => {
                let payload = match frame {
                    Some(Ok(Message::Text(text))) => text.as_str().as_bytes().to_vec(),
                    Some(Ok(Message::Binary(bytes))) => bytes.to_vec(),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::debug!(device = %device_id, error = %e, "Telemetry socket error");
                        break;
                    }
                };
                let message = InboundMessage::new(Some(device_id.clone()), payload);
                if state.telemetry().send(message).await.is_err() {
                    tracing::error!("Monitor is not running, closing telemetry socket");
                    break;
                }
            }
            report = reports.recv() => {
                match report {
                    Ok(report) if report.device_id == device_id => {
                        let Ok(json) = serde_json::to_string(&report) else {
                            continue;
                        };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(device = %device_id, skipped, "Telemetry socket lagging behind reports");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::info!(device = %device_id, "Telemetry socket disconnected");
}
