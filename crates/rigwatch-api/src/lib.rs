//! rigwatch-api - REST and websocket API for machine fault tracking
//!
//! This crate exposes the fault tracker, machine logs, maintenance records
//! and the forecast proxy over HTTP, and accepts live telemetry over a
//! websocket.
//!
//! # Usage
//!
//! ```ignore
//! use rigwatch_api::{create_router, AppState};
//!
//! let state = AppState::new(monitor, store, clock, telemetry_tx);
//! let router = create_router(state);
//! ```

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the REST API router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Fault lifecycle
        .route("/api/log-error", post(handlers::faults::log_error))
        .route("/api/resolve-error", post(handlers::faults::resolve_error))
        .route("/api/active-errors", get(handlers::faults::active_errors))
        .route("/api/error-history", get(handlers::faults::error_history))
        // Forecasting and machine logs
        .route("/api/predict", post(handlers::forecast::predict))
        .route("/api/sensor-data", get(handlers::sensor_data::sensor_data))
        // Maintenance
        .route(
            "/api/maintenance",
            get(handlers::maintenance::list_maintenance)
                .post(handlers::maintenance::add_maintenance),
        )
        // Machines
        .route("/api/machines", get(handlers::machines::list_machines))
        .route(
            "/api/machines/{device}/latest",
            get(handlers::machines::latest),
        )
        // Telemetry
        .route("/api/telemetry", post(handlers::telemetry::ingest))
        .route("/ws/telemetry", get(handlers::telemetry::telemetry_ws))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
