//! HTTP tests for the rigwatch API over the in-memory store

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use rigwatch_api::{create_router, AppState};
use rigwatch_core::{Clock, ForecastError, ForecastResult, Forecaster, ManualClock};
use rigwatch_api::handlers::telemetry::serve_socket;
use rigwatch_engine::{
    EngineConfig, Evaluator, FaultTracker, InMemoryStore, InboundMessage, KnowledgeBase, Monitor,
    TimedStore, TrackerConfig,
};
use serde_json::{json, Value};
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tower::ServiceExt;

struct DoublingForecaster;

#[async_trait::async_trait]
impl Forecaster for DoublingForecaster {
    async fn predict(&self, series: &[f64]) -> ForecastResult<Vec<f64>> {
        Ok(series.iter().map(|v| v * 2.0).collect())
    }
}

struct BrokenForecaster;

#[async_trait::async_trait]
impl Forecaster for BrokenForecaster {
    async fn predict(&self, _series: &[f64]) -> ForecastResult<Vec<f64>> {
        Err(ForecastError::Unavailable)
    }
}

struct TestApp {
    router: Router,
    store: Arc<InMemoryStore>,
    clock: Arc<ManualClock>,
}

struct Parts {
    state: AppState,
    store: Arc<InMemoryStore>,
    clock: Arc<ManualClock>,
    telemetry: mpsc::Receiver<InboundMessage>,
}

fn parts(forecaster: Option<Arc<dyn Forecaster>>, config: EngineConfig) -> Parts {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
    ));
    let timed = Arc::new(TimedStore::new(store.clone(), config.store_timeout()));
    let tracker = Arc::new(FaultTracker::new(
        timed.clone(),
        clock.clone(),
        TrackerConfig::from(&config),
    ));
    let kb = Arc::new(KnowledgeBase::builtin().unwrap());
    let monitor = Arc::new(Monitor::new(
        Evaluator::new(kb),
        tracker,
        timed.clone(),
        clock.clone(),
        config,
    ));
    let (tx, telemetry) = mpsc::channel(8);
    let mut state = AppState::new(monitor, timed, clock.clone(), tx);
    if let Some(forecaster) = forecaster {
        state = state.with_forecaster(forecaster);
    }
    Parts {
        state,
        store,
        clock,
        telemetry,
    }
}

fn app_with(forecaster: Option<Arc<dyn Forecaster>>, history_limit: usize) -> TestApp {
    let config = EngineConfig {
        history_limit,
        ..Default::default()
    };
    let parts = parts(forecaster, config);
    TestApp {
        router: create_router(parts.state),
        store: parts.store,
        clock: parts.clock,
    }
}

fn app() -> TestApp {
    app_with(Some(Arc::new(DoublingForecaster)), 200)
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn overheat_body(device: &str) -> Value {
    json!({
        "errorDetail": { "code": "E03", "msg": "Engine coolant overheating", "sensor": "eng_wtr_temp", "value": 120.0 },
        "fullSnapshot": { "crank_sen": 1, "eng_wtr_temp": 105 },
        "deviceId": device
    })
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_log_and_resolve_error() {
    let app = app();

    let (status, body) = send(&app.router, "POST", "/api/log-error", Some(overheat_body("komatsu"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "transition": "opened" }));

    app.clock.advance(Duration::seconds(4));
    let (_, body) = send(&app.router, "POST", "/api/log-error", Some(overheat_body("komatsu"))).await;
    assert_eq!(body["transition"], json!("refreshed"));

    let (status, active) = send(&app.router, "GET", "/api/active-errors?device=komatsu", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active.as_array().unwrap().len(), 1);
    assert_eq!(active[0]["code"], json!("E03"));
    assert_eq!(active[0]["snapshotAtStart"]["eng_wtr_temp"], json!(105.0));

    app.clock.advance(Duration::seconds(6));
    let (status, body) = send(
        &app.router,
        "POST",
        "/api/resolve-error",
        Some(json!({ "errorCode": "E03", "fullSnapshot": { "eng_wtr_temp": 60 }, "deviceId": "komatsu" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resolved"], json!(true));
    assert_eq!(body["record"]["durationSeconds"], json!(10.0));

    // second resolve is a no-op
    let (_, body) = send(
        &app.router,
        "POST",
        "/api/resolve-error",
        Some(json!({ "errorCode": "E03", "fullSnapshot": {}, "deviceId": "komatsu" })),
    )
    .await;
    assert_eq!(body, json!({ "success": true, "resolved": false }));

    let (_, history) = send(&app.router, "GET", "/api/error-history", None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["lastSnapshot"]["eng_wtr_temp"], json!(60.0));
}

#[tokio::test]
async fn test_log_error_fills_known_fields_and_default_device() {
    let app = app();
    let body = json!({ "errorDetail": { "code": "E05", "value": 4 }, "fullSnapshot": {} });
    let (status, _) = send(&app.router, "POST", "/api/log-error", Some(body)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, active) = send(&app.router, "GET", "/api/active-errors?device=komatsu", None).await;
    assert_eq!(active[0]["sensorChannel"], json!("fuel_lvl"));
    assert!(active[0]["message"].as_str().unwrap().contains("Fuel level"));
}

#[tokio::test]
async fn test_bad_requests() {
    let app = app();

    let cases = [
        ("/api/log-error", json!({ "fullSnapshot": {} })),
        ("/api/log-error", json!({ "errorDetail": { "code": "" }, "fullSnapshot": {} })),
        ("/api/log-error", json!({ "errorDetail": { "code": "E03" }, "fullSnapshot": [1] })),
        ("/api/resolve-error", json!({ "fullSnapshot": {} })),
        ("/api/predict", json!({ "values": "abc" })),
        ("/api/predict", json!({ "values": [1, "x"] })),
        ("/api/maintenance", json!(["not", "an", "object"])),
    ];
    for (uri, body) in cases {
        let (status, response) = send(&app.router, "POST", uri, Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", uri, body);
        assert_eq!(response["error"], json!("bad_request"));
    }

    let (status, _) = send(&app.router, "GET", "/api/sensor-data", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_outage_is_503() {
    let app = app();
    app.store.set_available(false);
    let (status, body) = send(&app.router, "POST", "/api/log-error", Some(overheat_body("komatsu"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], json!("service_unavailable"));

    let (status, _) = send(&app.router, "GET", "/api/error-history", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_error_history_limit_is_capped() {
    let app = app_with(None, 3);
    for i in 0..5 {
        let code = format!("X{}", i);
        let body = json!({ "errorDetail": { "code": code }, "fullSnapshot": {} });
        send(&app.router, "POST", "/api/log-error", Some(body)).await;
        app.clock.advance(Duration::seconds(1));
        let body = json!({ "errorCode": code, "fullSnapshot": {} });
        send(&app.router, "POST", "/api/resolve-error", Some(body)).await;
    }

    let (_, history) = send(&app.router, "GET", "/api/error-history?limit=500", None).await;
    let codes: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["X4", "X3", "X2"]);

    let (_, history) = send(&app.router, "GET", "/api/error-history?limit=1", None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_predict() {
    let app = app();
    let (status, body) = send(&app.router, "POST", "/api/predict", Some(json!({ "values": [1, 2.5] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([2.0, 5.0]));

    let (_, body) = send(&app.router, "POST", "/api/predict", Some(json!([3]))).await;
    assert_eq!(body, json!([6.0]));

    let broken = app_with(Some(Arc::new(BrokenForecaster)), 200);
    let (status, body) = send(&broken.router, "POST", "/api/predict", Some(json!({ "values": [1] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let none = app_with(None, 200);
    let (_, body) = send(&none.router, "POST", "/api/predict", Some(json!({ "values": [1] }))).await;
    assert_eq!(body, json!([]));
}

fn healthy_telemetry(fuel: f64) -> Value {
    json!({
        "crank_sen": 1, "cam_sen": 1,
        "eng_wtr_temp": 78.75, "boost_prs": 19.6, "rail_prs": 14,
        "fuel_lvl": fuel, "hyd_oil_temp": 60,
        "boom_up_prs": 14, "swing_left_prs": 14, "travel_lr_prs": 14,
        "amb_air_prs": 25.5, "eng_oil_lvl": 55, "rad_wtr_lvl": 1
    })
}

#[tokio::test]
async fn test_telemetry_latest_and_sensor_data() {
    let app = app();

    let (status, report) = send(
        &app.router,
        "POST",
        "/api/telemetry?device=rig-7",
        Some(healthy_telemetry(8.0)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["opened"], json!(["E05"]));
    assert_eq!(report["logged"], json!(true));

    app.clock.advance(Duration::seconds(15));
    let (_, report) = send(
        &app.router,
        "POST",
        "/api/telemetry?device=rig-7",
        Some(healthy_telemetry(50.0)),
    )
    .await;
    assert_eq!(report["resolved"], json!(["E05"]));

    let (status, latest) = send(&app.router, "GET", "/api/machines/rig-7/latest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["raw"]["fuel_lvl"], json!(50.0));
    assert_eq!(latest["physical"]["eng_wtr_temp"], json!(90.0));
    assert_eq!(latest["criticalMetrics"]["fuel_level"], json!(50.0));

    let (status, _) = send(&app.router, "GET", "/api/machines/unknown/latest", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, machines) = send(&app.router, "GET", "/api/machines", None).await;
    assert_eq!(machines, json!(["rig-7"]));

    let (status, series) = send(
        &app.router,
        "GET",
        "/api/sensor-data?sensor=fuel_lvl&period=1h&device=rig-7",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let values: Vec<f64> = series
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["value"].as_f64().unwrap())
        .collect();
    assert_eq!(values, vec![8.0, 50.0]);

    let (status, _) = send(&app.router, "POST", "/api/telemetry", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_maintenance_records() {
    let app = app();
    let (status, created) = send(
        &app.router,
        "POST",
        "/api/maintenance",
        Some(json!({ "task": "Replace hydraulic filter", "hours": 1500 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["id"].as_str().is_some());
    assert_eq!(created["createdAt"], json!(app.clock.now().timestamp_millis()));

    app.clock.advance(Duration::minutes(5));
    send(&app.router, "POST", "/api/maintenance", Some(json!({ "task": "Grease pins" }))).await;

    let (_, records) = send(&app.router, "GET", "/api/maintenance", None).await;
    let tasks: Vec<&str> = records
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["task"].as_str().unwrap())
        .collect();
    assert_eq!(tasks, vec!["Grease pins", "Replace hydraulic filter"]);
}

#[tokio::test]
async fn test_telemetry_socket_closes_on_shutdown() {
    let Parts {
        state, mut telemetry, ..
    } = parts(None, EngineConfig::default());
    let (stop_tx, stop_rx) = watch::channel(false);
    let state = state.with_shutdown(stop_rx);

    let (frames_tx, frames_rx) = futures::channel::mpsc::unbounded::<Result<Message, axum::Error>>();
    let (out_tx, mut out_rx) = futures::channel::mpsc::unbounded::<Message>();
    let socket = tokio::spawn(serve_socket(frames_rx, out_tx, state, "rig-7".to_string()));

    frames_tx
        .unbounded_send(Ok(Message::Text(r#"{"crank_sen":1,"cam_sen":1}"#.into())))
        .unwrap();
    let forwarded = telemetry.recv().await.unwrap();
    assert_eq!(forwarded.device_id.as_deref(), Some("rig-7"));

    let body = br#"{"crank_sen":0,"cam_sen":0}"#;
    frames_tx
        .unbounded_send(Ok(Message::Binary(body.to_vec().into())))
        .unwrap();
    let forwarded = telemetry.recv().await.unwrap();
    assert_eq!(forwarded.payload, body.to_vec());
    assert_eq!(forwarded.device_id.as_deref(), Some("rig-7"));

    // the machine keeps its side open; only shutdown ends the loop
    stop_tx.send(true).unwrap();
    tokio::time::timeout(StdDuration::from_secs(5), socket)
        .await
        .expect("socket loop did not stop on shutdown")
        .unwrap();
    assert!(matches!(out_rx.next().await, Some(Message::Close(None))));

    // the socket held the last telemetry sender, so the monitor's feed closes
    assert!(telemetry.recv().await.is_none());
    drop(frames_tx);
}

#[tokio::test]
async fn test_telemetry_rejected_beyond_device_limit() {
    let config = EngineConfig {
        max_devices: 1,
        ..Default::default()
    };
    let router = create_router(parts(None, config).state);
    let body = json!({ "crank_sen": 1, "cam_sen": 1, "fuel_lvl": 60 });

    let (status, _) = send(&router, "POST", "/api/telemetry?device=rig-1", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, error) = send(&router, "POST", "/api/telemetry?device=rig-2", Some(body.clone())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error["error"], json!("service_unavailable"));
    let (status, _) = send(&router, "POST", "/api/telemetry?device=rig-1", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
}
