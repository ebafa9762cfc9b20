//! rigwatch-engine - Diagnostic pipeline for machine telemetry
//!
//! This crate turns raw snapshots into fault episodes. It evaluates each
//! snapshot against the rule table, keeps one active record per open fault
//! and moves closed episodes into history.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Monitor                              │
//! │  one worker + one pass lock per device                      │
//! │                                                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │ Evaluator   │  │FaultTracker │  │ RateLimiter         │  │
//! │  │ (rules)     │  │ (episodes)  │  │ (machine_logs)      │  │
//! │  └─────────────┘  └──────┬──────┘  └─────────────────────┘  │
//! │                          │                                  │
//! │                    ┌─────┴─────┐                            │
//! │                    │TimedStore │                            │
//! │                    │(deadline) │                            │
//! │                    └─────┬─────┘                            │
//! │                          │                                  │
//! │                 ┌────────┴────────┐                         │
//! │                 │ DocumentStore   │                         │
//! │                 │ (InMemoryStore) │                         │
//! │                 └─────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod forecast;
pub mod ingest;
pub mod limiter;
pub mod memory;
pub mod monitor;
pub mod notify;
pub mod records;
pub mod timed;
pub mod tracker;

pub use config::{EngineConfig, ForecastConfig};
pub use error::{IngestError, IngestResult};
pub use evaluator::Evaluator;
pub use forecast::{forecast_or_empty, HttpForecaster};
pub use ingest::{parse_bytes, parse_snapshot, InboundMessage, InboundSnapshot};
pub use limiter::RateLimiter;
pub use memory::InMemoryStore;
pub use monitor::{LatestSnapshot, Monitor, PassReport};
pub use notify::{FaultNotifier, LogNotifier};
pub use timed::TimedStore;
pub use tracker::{active_key, FaultTracker, FaultTransition, LogOutcome, TrackerConfig};

// Re-export for convenience
pub use rigwatch_conv::KnowledgeBase;
pub use rigwatch_core::{
    ActiveFault, Clock, Diagnosis, DocumentStore, FaultEvent, HistoryRecord, RawSnapshot,
    StoreError, StoreResult, SystemClock,
};
