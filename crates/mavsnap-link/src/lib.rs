//! Telemetry link layer for mavsnap.
//!
//! Wraps the `mavlink` crate behind the [`TelemetryLink`] trait so the
//! collector only sees connect / wait-heartbeat / request-stream /
//! receive-by-type, and provides a scripted link for tests.

pub mod address;
pub mod link;
pub mod mavlink_link;
pub mod message;
pub mod mock;

pub use address::LinkAddress;
pub use link::{LinkTarget, TelemetryLink};
pub use mavlink_link::MavlinkLink;
pub use message::TelemetryMessage;

pub use mavsnap_core as core;
