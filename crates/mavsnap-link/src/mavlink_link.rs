//! [`TelemetryLink`] backed by the `mavlink` crate.
//!
//! `mavlink` connections only offer a blocking `recv`, so a reader thread
//! pulls frames off the wire and hands them to the link through a channel.
//! That lets [`MavlinkLink::recv_match`] honour a deadline without touching
//! socket or serial-port timeouts.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mavlink::ardupilotmega::{MavDataStream, MavMessage, MavType, REQUEST_DATA_STREAM_DATA};
use mavlink::error::MessageReadError;
use mavlink::{MavConnection, MavHeader, Message};
use mavsnap_core::message_types::MessageType;
use mavsnap_core::{MavsnapError, Result};
use tracing::{debug, error, info, trace};

use crate::address::LinkAddress;
use crate::link::{LinkTarget, TelemetryLink};
use crate::message::TelemetryMessage;

/// Requested rate for REQUEST_DATA_STREAM, in Hz.
const DATA_STREAM_RATE_HZ: u16 = 4;

type Connection = Arc<Box<dyn MavConnection<MavMessage> + Sync + Send>>;
type Frame = (MavHeader, MavMessage);

/// A live MAVLink connection.
pub struct MavlinkLink {
    connection: Connection,
    frames: Receiver<Frame>,
    target: Option<LinkTarget>,
}

impl MavlinkLink {
    /// Open `address` and start the reader thread.
    pub fn connect(address: LinkAddress) -> Result<Self> {
        let connection_string = address.to_connection_string();
        info!(address = %connection_string, "Connecting to telemetry link");

        let connection = mavlink::connect::<MavMessage>(&connection_string).map_err(|source| {
            MavsnapError::Connect {
                address: connection_string.clone(),
                source,
            }
        })?;
        let connection: Connection = Arc::new(connection);

        let (tx, frames) = mpsc::channel();
        let reader = Arc::clone(&connection);
        thread::Builder::new()
            .name("mavlink-reader".to_string())
            .spawn(move || read_frames(reader, tx))?;

        Ok(Self {
            connection,
            frames,
            target: None,
        })
    }

    /// Target learned from the first heartbeat, if one has arrived.
    pub fn target(&self) -> Option<LinkTarget> {
        self.target
    }

    /// Next frame before `deadline` (or ever, when `None`).
    /// `Ok(None)` means the deadline passed.
    fn next_frame(&self, deadline: Option<Instant>) -> Result<Option<Frame>> {
        let Some(deadline) = deadline else {
            return self
                .frames
                .recv()
                .map(Some)
                .map_err(|_| MavsnapError::LinkClosed);
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.frames.recv_timeout(remaining) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(MavsnapError::LinkClosed),
        }
    }
}

impl TelemetryLink for MavlinkLink {
    fn wait_heartbeat(&mut self, timeout: Option<Duration>) -> Result<LinkTarget> {
        let deadline = timeout.and_then(deadline_after);

        loop {
            let Some((header, message)) = self.next_frame(deadline)? else {
                return Err(MavsnapError::HeartbeatTimeout(timeout.unwrap_or_default()));
            };

            // Other ground stations on the same link also send heartbeats.
            if let MavMessage::HEARTBEAT(heartbeat) = message {
                if heartbeat.mavtype == MavType::MAV_TYPE_GCS {
                    continue;
                }
                let target = LinkTarget {
                    system_id: header.system_id,
                    component_id: header.component_id,
                };
                debug!(?target, "heartbeat received");
                self.target = Some(target);
                return Ok(target);
            }
        }
    }

    fn request_data_stream(&mut self) -> Result<()> {
        // Before the first heartbeat the request is broadcast.
        let target = self.target.unwrap_or(LinkTarget {
            system_id: 0,
            component_id: 0,
        });

        let request = MavMessage::REQUEST_DATA_STREAM(REQUEST_DATA_STREAM_DATA {
            req_message_rate: DATA_STREAM_RATE_HZ,
            target_system: target.system_id,
            target_component: target.component_id,
            req_stream_id: MavDataStream::MAV_DATA_STREAM_ALL as u8,
            start_stop: 1,
        });

        self.connection
            .send_default(&request)
            .map_err(|e| MavsnapError::Send {
                message: request.message_name().to_string(),
                reason: format!("{e:?}"),
            })?;
        Ok(())
    }

    fn recv_match(
        &mut self,
        message_type: &MessageType,
        timeout: Duration,
    ) -> Result<Option<TelemetryMessage>> {
        let deadline = deadline_after(timeout);

        loop {
            let Some((_, message)) = self.next_frame(deadline)? else {
                return Ok(None);
            };
            if message.message_name() == message_type.as_str() {
                return TelemetryMessage::from_mavlink(&message).map(Some);
            }
            trace!(
                wanted = %message_type,
                got = message.message_name(),
                "discarding frame"
            );
        }
    }
}

/// `None` when `timeout` reaches past what `Instant` can represent, which
/// callers treat as no deadline at all.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Reader thread body: forward frames until the link fails or the
/// [`MavlinkLink`] is dropped.
fn read_frames(connection: Connection, tx: Sender<Frame>) {
    loop {
        match connection.recv() {
            Ok(frame) => {
                if tx.send(frame).is_err() {
                    debug!("frame receiver dropped; stopping reader");
                    return;
                }
            }
            Err(MessageReadError::Io(e)) => match e.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {
                    continue
                }
                _ => {
                    error!(error = %e, "telemetry link read failed; closing link");
                    return;
                }
            },
            Err(e) => {
                trace!(error = ?e, "discarding undecodable frame");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::ardupilotmega::{ATTITUDE_DATA, HEARTBEAT_DATA};
    use std::net::UdpSocket;

    type Peer = Box<dyn MavConnection<MavMessage> + Sync + Send>;

    // ── helpers ───────────────────────────────────────────────────────────

    /// A link listening on a free local UDP port plus a peer sending to it.
    fn loopback() -> (MavlinkLink, Peer) {
        let port = UdpSocket::bind("127.0.0.1:0")
            .and_then(|socket| socket.local_addr())
            .expect("free port")
            .port();
        let link = MavlinkLink::connect(LinkAddress::UdpIn(format!("127.0.0.1:{port}")))
            .expect("udpin link");
        let peer = mavlink::connect::<MavMessage>(&format!("udpout:127.0.0.1:{port}"))
            .expect("udpout peer");
        (link, peer)
    }

    fn send(peer: &Peer, system_id: u8, component_id: u8, message: &MavMessage) {
        let header = MavHeader {
            system_id,
            component_id,
            sequence: 0,
        };
        peer.send(&header, message).expect("send");
    }

    fn heartbeat(mavtype: MavType) -> MavMessage {
        MavMessage::HEARTBEAT(HEARTBEAT_DATA {
            mavtype,
            ..HEARTBEAT_DATA::default()
        })
    }

    fn attitude(roll: f32) -> MavMessage {
        MavMessage::ATTITUDE(ATTITUDE_DATA {
            roll,
            ..ATTITUDE_DATA::default()
        })
    }

    fn mt(name: &str) -> MessageType {
        MessageType::new(name).unwrap()
    }

    // ── wait_heartbeat ────────────────────────────────────────────────────

    #[test]
    fn test_heartbeat_from_vehicle_sets_target() {
        let (mut link, peer) = loopback();
        send(&peer, 255, 190, &heartbeat(MavType::MAV_TYPE_GCS));
        send(&peer, 7, 1, &heartbeat(MavType::MAV_TYPE_QUADROTOR));

        let target = link.wait_heartbeat(Some(Duration::from_secs(2))).unwrap();
        let expected = LinkTarget {
            system_id: 7,
            component_id: 1,
        };
        assert_eq!(target, expected, "ground station heartbeats are skipped");
        assert_eq!(link.target(), Some(expected));
    }

    #[test]
    fn test_silent_link_times_out_waiting_for_heartbeat() {
        let (mut link, _peer) = loopback();
        let err = link.wait_heartbeat(Some(Duration::from_millis(100))).unwrap_err();
        assert!(matches!(err, MavsnapError::HeartbeatTimeout(_)));
        assert!(link.target().is_none());
    }

    // ── recv_match ────────────────────────────────────────────────────────

    #[test]
    fn test_recv_match_skips_other_types_then_times_out() {
        let (mut link, peer) = loopback();
        send(&peer, 7, 1, &heartbeat(MavType::MAV_TYPE_QUADROTOR));
        send(&peer, 7, 1, &attitude(0.5));

        let got = link
            .recv_match(&mt("ATTITUDE"), Duration::from_secs(2))
            .unwrap()
            .expect("ATTITUDE arrives");
        assert_eq!(got.name(), "ATTITUDE");
        assert_eq!(got.fields()["roll"], 0.5);

        let missing = link.recv_match(&mt("RAW_IMU"), Duration::from_millis(200)).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_unrepresentable_timeout_means_no_deadline() {
        assert!(deadline_after(Duration::MAX).is_none());

        let (mut link, peer) = loopback();
        send(&peer, 7, 1, &attitude(-0.25));
        let got = link.recv_match(&mt("ATTITUDE"), Duration::MAX).unwrap();
        assert_eq!(got.expect("ATTITUDE arrives").fields()["roll"], -0.25);
    }
}
