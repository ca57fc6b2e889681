//! Everything a polling cycle needs, bundled into one value.

use std::time::Duration;

use mavsnap_core::message_types::MessageTypeList;
use mavsnap_core::snapshot::SnapshotStore;
use mavsnap_link::TelemetryLink;

/// Connection plus configuration for the collector. The link keeps track of
/// the vehicle it is talking to once a heartbeat has been seen.
///
/// Owned by the [`Poller`](crate::poller::Poller) and handed by mutable
/// reference to [`poll_message_type`](crate::poller::poll_message_type).
pub struct CollectorContext {
    pub(crate) link: Box<dyn TelemetryLink>,
    pub(crate) store: SnapshotStore,
    pub(crate) message_types: MessageTypeList,
    pub(crate) receive_timeout: Duration,
}

impl CollectorContext {
    pub fn new(
        link: Box<dyn TelemetryLink>,
        store: SnapshotStore,
        message_types: MessageTypeList,
        receive_timeout: Duration,
    ) -> Self {
        Self {
            link,
            store,
            message_types,
            receive_timeout,
        }
    }
}
