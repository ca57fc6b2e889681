//! The seam between the collector and whatever produces telemetry.

use std::time::Duration;

use mavsnap_core::message_types::MessageType;
use mavsnap_core::Result;

use crate::message::TelemetryMessage;

/// System and component id of the vehicle, learned from its first heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTarget {
    pub system_id: u8,
    pub component_id: u8,
}

/// Blocking telemetry source.
///
/// Implementations own the connection; the collector drives them from a
/// single thread, one call at a time.
pub trait TelemetryLink: Send {
    /// Block until the vehicle's first heartbeat, or until `timeout` passes.
    fn wait_heartbeat(&mut self, timeout: Option<Duration>) -> Result<LinkTarget>;

    /// Ask the vehicle to start streaming telemetry. Not every autopilot
    /// honours the request, so callers treat failure as non-fatal.
    fn request_data_stream(&mut self) -> Result<()>;

    /// Return the first message of `message_type` that arrives within
    /// `timeout`, discarding everything else. `Ok(None)` means timeout.
    fn recv_match(
        &mut self,
        message_type: &MessageType,
        timeout: Duration,
    ) -> Result<Option<TelemetryMessage>>;
}
