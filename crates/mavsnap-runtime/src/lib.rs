//! Collector runtime for mavsnap.
//!
//! Owns the polling context, runs polling cycles over the telemetry link and
//! schedules them from a tokio task.

pub mod context;
pub mod orchestrator;
pub mod poller;

pub use mavsnap_core as core;
pub use mavsnap_link as link;
