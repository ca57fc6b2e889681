//! Async collector orchestrator.
//!
//! Drives a [`Poller`] from a tokio task: waits for the first heartbeat, then
//! runs one blocking cycle at a time on the blocking pool, pausing
//! `cycle_interval` between cycles. Each [`CycleReport`] is forwarded
//! through an `mpsc` channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mavsnap_core::{MavsnapError, Result};
use mavsnap_link::LinkTarget;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, error, info};

use crate::poller::{CycleReport, Poller};

/// Longest single blocking wait while looking for the first heartbeat.
const HEARTBEAT_SLICE: Duration = Duration::from_millis(250);

/// Floor for the pause between cycles; `tokio::time::interval` rejects zero.
const MIN_CYCLE_INTERVAL: Duration = Duration::from_millis(1);

// ── CollectorOrchestrator ─────────────────────────────────────────────────────

/// Background collector loop.
///
/// Call [`CollectorOrchestrator::start`] to spin up the loop in a dedicated
/// tokio task and receive a channel endpoint for [`CycleReport`]s. The
/// channel closes when the loop stops: the heartbeat never arrived, the
/// receiver was dropped, or the loop was aborted.
pub struct CollectorOrchestrator {
    /// Pause between the end of one cycle and the start of the next.
    cycle_interval: Duration,
    /// How long to wait for the first heartbeat; `None` waits forever.
    heartbeat_timeout: Option<Duration>,
}

impl CollectorOrchestrator {
    pub fn new(cycle_interval: Duration, heartbeat_timeout: Option<Duration>) -> Self {
        Self {
            cycle_interval,
            heartbeat_timeout,
        }
    }

    /// Start the collector loop.
    ///
    /// Returns the report receiver and a [`CollectorHandle`] that can abort
    /// the loop.
    pub fn start(self, poller: Poller) -> (mpsc::Receiver<CycleReport>, CollectorHandle) {
        let (tx, rx) = mpsc::channel(16);
        let stop = Arc::new(AtomicBool::new(false));

        let loop_stop = Arc::clone(&stop);
        let handle = tokio::spawn(async move {
            self.collector_loop(poller, tx, loop_stop).await;
        });

        (rx, CollectorHandle { handle, stop })
    }

    // ── Private implementation ────────────────────────────────────────────

    async fn collector_loop(
        self,
        poller: Poller,
        tx: mpsc::Sender<CycleReport>,
        stop: Arc<AtomicBool>,
    ) {
        info!("Waiting for heartbeat...");
        let timeout = self.heartbeat_timeout;
        let heartbeat_stop = Arc::clone(&stop);
        let joined = tokio::task::spawn_blocking(move || {
            let mut poller = poller;
            let result = wait_for_heartbeat(&mut poller, timeout, &heartbeat_stop);
            (poller, result)
        })
        .await;

        let mut poller = match joined {
            Ok((poller, Some(Ok(target)))) => {
                info!(
                    system_id = target.system_id,
                    component_id = target.component_id,
                    "Heartbeat received, starting telemetry polling"
                );
                poller
            }
            Ok((_, Some(Err(e)))) => {
                error!(error = %e, "no heartbeat; collector stopping");
                return;
            }
            Ok((_, None)) => {
                debug!("stopped while waiting for heartbeat");
                return;
            }
            Err(e) => {
                error!(error = %e, "heartbeat task failed; collector stopping");
                return;
            }
        };

        let mut interval = time::interval(self.cycle_interval.max(MIN_CYCLE_INTERVAL));

        loop {
            interval.tick().await;

            if tx.is_closed() {
                debug!("report channel closed; exiting loop");
                break;
            }

            let cycle_stop = Arc::clone(&stop);
            let joined = tokio::task::spawn_blocking(move || {
                let report = poller.run_cycle_until_stopped(&cycle_stop);
                (poller, report)
            })
            .await;

            let report = match joined {
                Ok((p, report)) => {
                    poller = p;
                    report
                }
                Err(e) => {
                    error!(error = %e, "polling cycle panicked; collector stopping");
                    break;
                }
            };

            if stop.load(Ordering::Relaxed) {
                debug!(cycle = report.cycle, "stop requested; exiting loop");
                break;
            }

            info!(
                cycle = report.cycle,
                written = report.written.len(),
                timed_out = report.timed_out.len(),
                failed = report.failed.len(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Completed cycle, waiting before next cycle"
            );

            if let Err(e) = tx.send(report).await {
                debug!(error = %e, "report receiver dropped; exiting loop");
                break;
            }

            // The pause runs from the end of the cycle, however long it took.
            interval.reset();
        }
    }
}

/// Wait for the first heartbeat in short slices so a stop request is noticed
/// while the link stays silent. `None` means the wait was stopped.
fn wait_for_heartbeat(
    poller: &mut Poller,
    timeout: Option<Duration>,
    stop: &AtomicBool,
) -> Option<Result<LinkTarget>> {
    let deadline = timeout.and_then(|t| Instant::now().checked_add(t));

    loop {
        if stop.load(Ordering::Relaxed) {
            return None;
        }

        let slice = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    let waited = timeout.unwrap_or_default();
                    return Some(Err(MavsnapError::HeartbeatTimeout(waited)));
                }
                remaining.min(HEARTBEAT_SLICE)
            }
            None => HEARTBEAT_SLICE,
        };

        match poller.wait_heartbeat(Some(slice)) {
            Err(MavsnapError::HeartbeatTimeout(_)) => continue,
            other => return Some(other),
        }
    }
}

// ── CollectorHandle ───────────────────────────────────────────────────────────

/// A handle to the background collector task.
pub struct CollectorHandle {
    handle: tokio::task::JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

impl CollectorHandle {
    /// Stop the collector loop.
    ///
    /// The async task ends at once. Blocking work already running on the
    /// blocking pool returns within one heartbeat slice, or after the message
    /// type currently being polled.
    pub fn abort(&self) {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.abort();
    }

    /// `true` once the loop has stopped on its own or been aborted.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
