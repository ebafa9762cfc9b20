//! rigwatch-core - Core traits and types for machine telemetry diagnostics
//!
//! This crate provides the shared vocabulary of the workspace: telemetry
//! snapshots, fault records, and the abstract collaborators (document store,
//! forecast service, clock) the diagnostic engine talks to.

pub mod clock;
pub mod document;
pub mod error;
pub mod forecast;
pub mod models;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use document::{
    from_document, to_document, Direction, Document, Filter, FilterOp, OrderBy, Query,
    StoredDocument,
};
pub use error::{ForecastError, ForecastResult, StoreError, StoreResult};
pub use forecast::Forecaster;
pub use models::*;
pub use store::{collections, DocumentStore};
