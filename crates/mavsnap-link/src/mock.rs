//! In-memory [`TelemetryLink`] with scripted responses, for tests.
//!
//! Clones share state, so a test can keep one handle for scripting and
//! inspection while the collector owns another.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use mavsnap_core::message_types::MessageType;
use mavsnap_core::{MavsnapError, Result};
use serde_json::Value;

use crate::link::{LinkTarget, TelemetryLink};
use crate::message::TelemetryMessage;

/// One scripted answer to `recv_match`.
#[derive(Debug, Clone)]
pub enum Scripted {
    Message(TelemetryMessage),
    Timeout,
    LinkClosed,
}

#[derive(Debug, Default)]
struct ScriptState {
    queued: HashMap<String, VecDeque<Scripted>>,
    repeating: HashMap<String, TelemetryMessage>,
    heartbeat: Option<LinkTarget>,
    heartbeat_fails: bool,
    stream_requests_fail: bool,
    stream_requests: usize,
    heartbeat_waits: usize,
    polled: Vec<String>,
}

/// Scripted telemetry source.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLink {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Answer the next `recv_match` for the message's type with it.
    pub fn push_message(&self, message: TelemetryMessage) {
        self.push(message.name().to_string(), Scripted::Message(message));
    }

    /// Queue an explicit answer for `message_type`.
    pub fn push(&self, message_type: impl Into<String>, answer: Scripted) {
        self.state()
            .queued
            .entry(message_type.into())
            .or_default()
            .push_back(answer);
    }

    /// Answer every otherwise-unscripted `recv_match` for the message's type
    /// with it.
    pub fn repeat_message(&self, message: TelemetryMessage) {
        self.state()
            .repeating
            .insert(message.name().to_string(), message);
    }

    /// Target returned from `wait_heartbeat` (defaults to system 1,
    /// component 1).
    pub fn set_heartbeat(&self, target: LinkTarget) {
        self.state().heartbeat = Some(target);
    }

    /// Never deliver a heartbeat: `wait_heartbeat` sleeps out its timeout
    /// and fails, or fails at once as a closed link when given none.
    pub fn fail_heartbeat(&self) {
        self.state().heartbeat_fails = true;
    }

    /// Make `request_data_stream` fail.
    pub fn fail_stream_requests(&self) {
        self.state().stream_requests_fail = true;
    }

    pub fn stream_requests(&self) -> usize {
        self.state().stream_requests
    }

    pub fn heartbeat_waits(&self) -> usize {
        self.state().heartbeat_waits
    }

    /// Message types passed to `recv_match`, in call order.
    pub fn polled(&self) -> Vec<String> {
        self.state().polled.clone()
    }
}

impl TelemetryLink for ScriptedLink {
    fn wait_heartbeat(&mut self, timeout: Option<Duration>) -> Result<LinkTarget> {
        let (fails, heartbeat) = {
            let mut state = self.state();
            state.heartbeat_waits += 1;
            (state.heartbeat_fails, state.heartbeat)
        };

        if !fails {
            return Ok(heartbeat.unwrap_or(LinkTarget {
                system_id: 1,
                component_id: 1,
            }));
        }
        match timeout {
            Some(t) => {
                // lock released so clones can inspect the link meanwhile
                std::thread::sleep(t);
                Err(MavsnapError::HeartbeatTimeout(t))
            }
            None => Err(MavsnapError::LinkClosed),
        }
    }

    fn request_data_stream(&mut self) -> Result<()> {
        let mut state = self.state();
        state.stream_requests += 1;
        if state.stream_requests_fail {
            return Err(MavsnapError::Send {
                message: "REQUEST_DATA_STREAM".to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    fn recv_match(
        &mut self,
        message_type: &MessageType,
        _timeout: Duration,
    ) -> Result<Option<TelemetryMessage>> {
        let mut state = self.state();
        state.polled.push(message_type.to_string());

        let next = state
            .queued
            .get_mut(message_type.as_str())
            .and_then(VecDeque::pop_front);

        match next {
            Some(Scripted::Message(message)) => Ok(Some(message)),
            Some(Scripted::Timeout) => Ok(None),
            Some(Scripted::LinkClosed) => Err(MavsnapError::LinkClosed),
            None => Ok(state.repeating.get(message_type.as_str()).cloned()),
        }
    }
}

/// Build a [`TelemetryMessage`] from a JSON object literal.
pub fn message(name: &str, fields: Value) -> TelemetryMessage {
    TelemetryMessage::new(name, fields.as_object().cloned().unwrap_or_default())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mt(name: &str) -> MessageType {
        MessageType::new(name).unwrap()
    }

    #[test]
    fn test_unscripted_type_times_out() {
        let mut link = ScriptedLink::new();
        let got = link.recv_match(&mt("ATTITUDE"), Duration::from_millis(10)).unwrap();
        assert!(got.is_none());
        assert_eq!(link.polled(), vec!["ATTITUDE"]);
    }

    #[test]
    fn test_queued_answers_come_back_in_order() {
        let mut link = ScriptedLink::new();
        link.push_message(message("ATTITUDE", json!({ "roll": 1.0 })));
        link.push("ATTITUDE", Scripted::Timeout);
        link.push("ATTITUDE", Scripted::LinkClosed);

        let first = link.recv_match(&mt("ATTITUDE"), Duration::ZERO).unwrap();
        assert_eq!(first.unwrap().fields()["roll"], 1.0);
        assert!(link.recv_match(&mt("ATTITUDE"), Duration::ZERO).unwrap().is_none());
        assert!(matches!(
            link.recv_match(&mt("ATTITUDE"), Duration::ZERO),
            Err(MavsnapError::LinkClosed)
        ));
    }

    #[test]
    fn test_repeating_message_after_queue_drains() {
        let mut link = ScriptedLink::new();
        link.push("HEARTBEAT", Scripted::Timeout);
        link.repeat_message(message("HEARTBEAT", json!({ "custom_mode": 4 })));

        assert!(link.recv_match(&mt("HEARTBEAT"), Duration::ZERO).unwrap().is_none());
        for _ in 0..3 {
            let got = link.recv_match(&mt("HEARTBEAT"), Duration::ZERO).unwrap();
            assert_eq!(got.unwrap().fields()["custom_mode"], 4);
        }
    }

    #[test]
    fn test_clones_share_state() {
        let link = ScriptedLink::new();
        let mut owned = link.clone();
        owned.request_data_stream().unwrap();
        owned.request_data_stream().unwrap();
        assert_eq!(link.stream_requests(), 2);
    }

    #[test]
    fn test_heartbeat_default_and_failure() {
        let mut link = ScriptedLink::new();
        let target = link.wait_heartbeat(None).unwrap();
        assert_eq!(target, LinkTarget { system_id: 1, component_id: 1 });

        link.fail_heartbeat();
        let err = link.wait_heartbeat(Some(Duration::from_millis(5))).unwrap_err();
        assert!(matches!(err, MavsnapError::HeartbeatTimeout(_)));
        assert_eq!(link.heartbeat_waits(), 2);
    }

    #[test]
    fn test_failing_stream_requests() {
        let mut link = ScriptedLink::new();
        link.fail_stream_requests();
        assert!(link.request_data_stream().is_err());
        assert_eq!(link.stream_requests(), 1);
    }
}
