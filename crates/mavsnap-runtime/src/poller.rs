//! Blocking polling cycle.
//!
//! A cycle walks the message type list in order and, for each type,
//! best-effort requests a data stream, waits up to the receive timeout for a
//! matching message and writes it to the snapshot directory. Every failure is
//! logged and recorded in the [`CycleReport`]; none of them stop the cycle.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use mavsnap_core::message_types::MessageType;
use mavsnap_core::Result;
use mavsnap_link::LinkTarget;
use tracing::{debug, info, warn};

use crate::context::CollectorContext;

// ── Public types ──────────────────────────────────────────────────────────────

/// What happened to one message type during a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A message arrived and its snapshot was written to this path.
    Written(PathBuf),
    /// Nothing arrived before the receive timeout; no file was touched.
    TimedOut,
    /// Receiving or writing failed; no file was touched.
    Failed(String),
}

/// Summary of one pass over the message type list.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// 1-based cycle counter.
    pub cycle: u64,
    /// Wall-clock time the cycle began.
    pub started_at: DateTime<Utc>,
    /// How long the cycle took.
    pub elapsed: Duration,
    /// Types whose snapshot was written, in poll order.
    pub written: Vec<MessageType>,
    /// Types that timed out, in poll order.
    pub timed_out: Vec<MessageType>,
    /// Types that failed, with the error message.
    pub failed: Vec<(MessageType, String)>,
}

impl CycleReport {
    /// Number of message types polled in this cycle.
    pub fn polled(&self) -> usize {
        self.written.len() + self.timed_out.len() + self.failed.len()
    }
}

// ── Polling function ──────────────────────────────────────────────────────────

/// Poll a single message type using `ctx`.
pub fn poll_message_type(ctx: &mut CollectorContext, message_type: &MessageType) -> PollOutcome {
    debug!(message_type = %message_type, "waiting for message");

    if let Err(e) = ctx.link.request_data_stream() {
        debug!(message_type = %message_type, error = %e, "data stream request failed");
    }

    let message = match ctx.link.recv_match(message_type, ctx.receive_timeout) {
        Ok(Some(message)) => message,
        Ok(None) => {
            warn!(
                message_type = %message_type,
                timeout_ms = ctx.receive_timeout.as_millis() as u64,
                "no message received within timeout"
            );
            return PollOutcome::TimedOut;
        }
        Err(e) => {
            warn!(message_type = %message_type, error = %e, "receive failed");
            return PollOutcome::Failed(e.to_string());
        }
    };

    let snapshot = message.to_snapshot();
    debug!(message_type = %message_type, %snapshot, "received");

    match ctx.store.write(message_type, &snapshot) {
        Ok(path) => {
            info!(
                message_type = %message_type,
                fields = message.fields().len(),
                path = %path.display(),
                "snapshot written"
            );
            PollOutcome::Written(path)
        }
        Err(e) => {
            warn!(message_type = %message_type, error = %e, "failed to write snapshot");
            PollOutcome::Failed(e.to_string())
        }
    }
}

// ── Poller ────────────────────────────────────────────────────────────────────

/// Owns a [`CollectorContext`] and runs numbered cycles over it.
pub struct Poller {
    ctx: CollectorContext,
    cycles: u64,
}

impl Poller {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx, cycles: 0 }
    }

    /// Number of cycles completed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Block until the vehicle's first heartbeat. The link targets later
    /// data stream requests at the returned ids.
    pub fn wait_heartbeat(&mut self, timeout: Option<Duration>) -> Result<LinkTarget> {
        self.ctx.link.wait_heartbeat(timeout)
    }

    /// Poll every configured message type once, in list order.
    pub fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_until_stopped(&AtomicBool::new(false))
    }

    /// Like [`Poller::run_cycle`], but checks `stop` before each message type
    /// and returns the partial report once it is set.
    pub fn run_cycle_until_stopped(&mut self, stop: &AtomicBool) -> CycleReport {
        self.cycles += 1;
        let started_at = Utc::now();
        let start = Instant::now();

        let mut report = CycleReport {
            cycle: self.cycles,
            started_at,
            elapsed: Duration::ZERO,
            written: Vec::new(),
            timed_out: Vec::new(),
            failed: Vec::new(),
        };

        let message_types = self.ctx.message_types.clone();
        for message_type in &message_types {
            if stop.load(Ordering::Relaxed) {
                debug!(cycle = self.cycles, "stop requested; ending cycle early");
                break;
            }
            match poll_message_type(&mut self.ctx, message_type) {
                PollOutcome::Written(_) => report.written.push(message_type.clone()),
                PollOutcome::TimedOut => report.timed_out.push(message_type.clone()),
                PollOutcome::Failed(e) => report.failed.push((message_type.clone(), e)),
            }
        }

        report.elapsed = start.elapsed();
        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
