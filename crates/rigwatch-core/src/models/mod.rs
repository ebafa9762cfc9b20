//! Shared data models

mod fault;
mod log;
mod maintenance;
mod snapshot;

pub use fault::*;
pub use log::*;
pub use maintenance::*;
pub use snapshot::*;
