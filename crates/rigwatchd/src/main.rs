//! rigwatchd - machine telemetry diagnostics daemon
//!
//! Evaluates live telemetry against the diagnostic rule table, tracks fault
//! episodes and serves the REST/websocket API.
//!
//! Usage:
//!   rigwatchd [OPTIONS] [config.toml]
//!
//! If no config file is provided, built-in defaults and the built-in PC200
//! rule table are used.

mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use rigwatch_api::{create_router, AppState};
use rigwatch_conv::KnowledgeBase;
use rigwatch_core::{Clock, DocumentStore, SystemClock};
use rigwatch_engine::{
    Evaluator, FaultTracker, HttpForecaster, InMemoryStore, Monitor, TimedStore, TrackerConfig,
};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::DaemonConfig;

/// Capacity of the telemetry queue between the websocket and the monitor
const TELEMETRY_QUEUE: usize = 1024;

/// How long shutdown waits for the monitor to drain queued telemetry
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "rigwatchd")]
#[command(author, version, about = "Machine telemetry diagnostics server")]
struct Args {
    /// Server config file (TOML)
    config: Option<PathBuf>,

    /// Listen port (overrides the config file)
    #[arg(short, long, env = "RIGWATCH_PORT")]
    port: Option<u16>,

    /// Rule table YAML file (overrides the config file)
    #[arg(short, long, env = "RIGWATCH_RULES")]
    rules: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rigwatchd=info,rigwatch_api=info,rigwatch_engine=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn load_rules(config: &DaemonConfig) -> anyhow::Result<KnowledgeBase> {
    match &config.diagnostics.rules {
        Some(path) => {
            tracing::info!("Loading rules from: {}", path.display());
            KnowledgeBase::from_file(path)
                .with_context(|| format!("Failed to load rules from {}", path.display()))
        }
        None => KnowledgeBase::builtin().context("Built-in rule table is invalid"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    tracing::info!("Starting rigwatchd");

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading config from: {}", path.display());
            DaemonConfig::load(path)?
        }
        None => {
            tracing::info!("No config file provided, using defaults");
            DaemonConfig::default()
        }
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(rules) = args.rules {
        config.diagnostics.rules = Some(rules);
    }

    let kb = load_rules(&config)?;
    tracing::info!(
        rules = kb.len(),
        table = kb.meta().name.as_deref().unwrap_or("unnamed"),
        "Rule table loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store: Arc<dyn DocumentStore> = Arc::new(TimedStore::new(
        Arc::new(InMemoryStore::new()),
        config.diagnostics.store_timeout(),
    ));
    let tracker = Arc::new(FaultTracker::new(
        store.clone(),
        clock.clone(),
        TrackerConfig::from(&config.diagnostics),
    ));
    let monitor = Arc::new(Monitor::new(
        Evaluator::new(Arc::new(kb)),
        tracker,
        store.clone(),
        clock.clone(),
        config.diagnostics.clone(),
    ));

    let (telemetry_tx, telemetry_rx) = mpsc::channel(TELEMETRY_QUEUE);
    let monitor_task = tokio::spawn(monitor.clone().run(telemetry_rx));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut state = AppState::new(monitor, store, clock, telemetry_tx).with_shutdown(shutdown_rx);
    if let Some(url) = &config.forecast.url {
        let forecaster = HttpForecaster::new(url, config.forecast.timeout())?;
        tracing::info!("Forecast service: {}", forecaster.url());
        state = state.with_forecaster(Arc::new(forecaster));
    }

    let app = create_router(state);

    let addr = config.server.addr();
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // telemetry sockets close and release their senders
            let _ = shutdown_tx.send(true);
        })
        .await?;

    // Once every telemetry sender is gone the monitor drains and exits
    match tokio::time::timeout(DRAIN_TIMEOUT, monitor_task).await {
        Ok(joined) => joined?,
        Err(_) => tracing::warn!("Monitor did not drain within {:?}, exiting", DRAIN_TIMEOUT),
    }
    tracing::info!("rigwatchd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
