//! # Scheduler Loop
//!
//! Background task that runs a pass, sleeps, and repeats until shut down.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌──────┐   tick    ┌─────────┐  pass ok   ┌──────┐                   │
//! │   │ Idle │──────────►│ Running │───────────►│ Idle │  sleep(interval)   │
//! │   └──────┘           └─────────┘            └──────┘                   │
//! │       ▲                   │                                             │
//! │       │                   │ pass failed                                 │
//! │       │                   ▼                                             │
//! │       │             ┌──────────┐                                        │
//! │       └─────────────│ Faulted  │  sleep(backoff), keeps looping         │
//! │        next tick    └──────────┘                                        │
//! │                                                                         │
//! │   shutdown (checked before each pass, raced against each sleep)        │
//! │       ──► Stopped                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delays
//! - After a successful pass: the base interval.
//! - After a failed pass: exponential from the base interval, doubling per
//!   consecutive failure, with jitter, capped at `max_backoff_secs`.
//!
//! An in-flight pass is never interrupted; shutdown waits for it to finish.
//! Each pass runs on its own task. A pass that panics counts as a failed
//! pass and gets a "pass failed" audit entry.

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ScheduleSettings;
use crate::error::{SyncError, SyncResult};
use crate::pipeline::{PassReport, SyncPipeline, Trigger};

/// Jitter applied to backoff delays (±25%).
pub const DEFAULT_JITTER: f64 = 0.25;

// =============================================================================
// Scheduler Status
// =============================================================================

/// Loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Sleeping after a successful pass (or not started yet).
    Idle,
    /// A pass is in flight.
    Running,
    /// Sleeping after a failed pass. The loop keeps going.
    Faulted,
    /// Loop has exited.
    Stopped,
}

/// Snapshot of the scheduler for external queries.
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub passes_run: u64,
    pub consecutive_failures: u32,
    /// Error of the most recent pass, if it failed.
    pub last_error: Option<String>,
    /// Rows inserted by the most recent successful pass.
    pub last_inserted: Option<u64>,
    /// Delay chosen after the most recent pass.
    pub next_delay: Option<Duration>,
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        SchedulerStatus {
            state: SchedulerState::Idle,
            passes_run: 0,
            consecutive_failures: 0,
            last_error: None,
            last_inserted: None,
            next_delay: None,
        }
    }
}

// =============================================================================
// Retry Delay
// =============================================================================

/// Delay policy between passes.
pub struct RetryDelay {
    backoff: ExponentialBackoff,
    base: Duration,
    max: Duration,
}

impl RetryDelay {
    pub fn new(base: Duration, max: Duration, jitter: f64) -> Self {
        let max = max.max(base);
        RetryDelay {
            backoff: ExponentialBackoff {
                current_interval: base,
                initial_interval: base,
                randomization_factor: jitter,
                multiplier: 2.0,
                max_interval: max,
                max_elapsed_time: None, // Never give up
                ..Default::default()
            },
            base,
            max,
        }
    }

    /// Resets the backoff and returns the base interval.
    pub fn after_success(&mut self) -> Duration {
        self.backoff.reset();
        self.base
    }

    /// Returns the next, longer, delay.
    pub fn after_failure(&mut self) -> Duration {
        let delay = self.backoff.next_backoff().unwrap_or(self.max).min(self.max);
        Duration::from_millis(delay.as_millis() as u64)
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// The background loop. Create with [`Scheduler::new`], start with
/// [`Scheduler::spawn`].
pub struct Scheduler {
    pipeline: Arc<SyncPipeline>,
    delay: RetryDelay,
    status: Arc<RwLock<SchedulerStatus>>,
    shutdown_rx: mpsc::Receiver<()>,
    shutdown_tx: mpsc::Sender<()>,
}

/// Handle for controlling a spawned scheduler.
///
/// Dropping the handle also stops the loop at its next check.
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    status: Arc<RwLock<SchedulerStatus>>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Current status snapshot.
    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    /// Stops the loop, waits for an in-flight pass, returns the final status.
    pub async fn shutdown(self) -> SyncResult<SchedulerStatus> {
        // The loop may already be gone; that is fine
        let _ = self.shutdown_tx.send(()).await;

        self.join
            .await
            .map_err(|e| SyncError::Internal(format!("scheduler task failed: {e}")))?;

        Ok(self.status.read().await.clone())
    }
}

impl Scheduler {
    pub fn new(pipeline: Arc<SyncPipeline>, settings: &ScheduleSettings) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        Scheduler {
            pipeline,
            delay: RetryDelay::new(settings.interval(), settings.max_backoff(), DEFAULT_JITTER),
            status: Arc::new(RwLock::new(SchedulerStatus::default())),
            shutdown_rx,
            shutdown_tx,
        }
    }

    /// Overrides backoff jitter (0.0 gives exact doubling).
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.delay = RetryDelay::new(self.delay.base, self.delay.max, jitter);
        self
    }

    /// Spawns the loop onto the current runtime.
    pub fn spawn(self) -> SchedulerHandle {
        let shutdown_tx = self.shutdown_tx.clone();
        let status = self.status.clone();
        let join = tokio::spawn(self.run());

        SchedulerHandle {
            shutdown_tx,
            status,
            join,
        }
    }

    async fn run(self) {
        let Scheduler {
            pipeline,
            mut delay,
            status,
            mut shutdown_rx,
            shutdown_tx,
        } = self;
        // Only the handle may keep the channel open
        drop(shutdown_tx);

        info!(
            interval_secs = delay.base.as_secs(),
            max_backoff_secs = delay.max.as_secs(),
            "Sales scheduler starting"
        );

        loop {
            match shutdown_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            status.write().await.state = SchedulerState::Running;

            let pass = {
                let pipeline = pipeline.clone();
                async move { pipeline.run_pass(Trigger::Scheduled).await }
            };
            let (succeeded, pass_error, inserted) = match run_isolated(pass).await {
                Ok(report) => {
                    if report.log.is_none() {
                        error!("Pass finished without an audit entry");
                    }
                    (report.is_success(), report.error, report.inserted)
                }
                Err(message) => {
                    error!(error = %message, "Sync pass aborted");
                    pipeline
                        .record_aborted(Trigger::Scheduled, &message)
                        .await;
                    (false, Some(message), 0)
                }
            };

            let next = {
                let mut status = status.write().await;
                status.passes_run += 1;

                let next = if succeeded {
                    if status.consecutive_failures > 0 {
                        info!(
                            failures = status.consecutive_failures,
                            "Sales sync recovered"
                        );
                    }
                    status.state = SchedulerState::Idle;
                    status.consecutive_failures = 0;
                    status.last_error = None;
                    status.last_inserted = Some(inserted);
                    delay.after_success()
                } else {
                    let next = delay.after_failure();
                    status.state = SchedulerState::Faulted;
                    status.consecutive_failures += 1;
                    status.last_error = pass_error;
                    warn!(
                        consecutive_failures = status.consecutive_failures,
                        retry_in_secs = next.as_secs(),
                        "Sales sync faulted, backing off"
                    );
                    next
                };

                status.next_delay = Some(next);
                next
            };

            tokio::select! {
                _ = tokio::time::sleep(next) => {}
                _ = shutdown_rx.recv() => {
                    info!("Sales scheduler received shutdown");
                    break;
                }
            }
        }

        status.write().await.state = SchedulerState::Stopped;
        info!("Sales scheduler stopped");
    }
}

/// Runs a pass on its own task, so a panic inside it becomes an error
/// message instead of ending the loop.
async fn run_isolated<F>(pass: F) -> Result<PassReport, String>
where
    F: Future<Output = PassReport> + Send + 'static,
{
    tokio::spawn(pass).await.map_err(|e| {
        if e.is_panic() {
            format!("pass panicked: {e}")
        } else {
            format!("pass cancelled: {e}")
        }
    })
}
