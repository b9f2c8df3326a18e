//! Idle-time scheduling for cooperative background work
//!
//! The scheduler defers units of work to spare time in the host event loop.
//! It never spawns threads: the host pumps [`IdleScheduler::drive`] once per
//! event-loop turn, and armed tasks run inside that pump, in arm order.
//! A task armed during a pump waits for the next one, which is what yields
//! control between successive chunks of work.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Idle budget assumed when the host cannot report a real estimate.
pub const FALLBACK_IDLE_BUDGET: Duration = Duration::from_millis(50);

/// Whether the host event loop can measure genuine idle time.
///
/// Decided once at startup and injected into the scheduler; the scheduler
/// never sniffs its environment per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleCapability {
    /// The host measures spare time per turn and passes it to `drive`.
    Native,
    /// No idle measurement available. Every armed task runs on the next
    /// pump with a fixed synthetic budget.
    Emulated,
}

/// Handle to an armed task, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

/// Remaining-time estimate handed to a task when it runs.
#[derive(Debug, Clone, Copy)]
pub struct IdleDeadline {
    budget: Duration,
    started: Instant,
    /// True when the task ran because its bounded wait expired rather than
    /// because the host reported idle time.
    pub did_timeout: bool,
}

impl IdleDeadline {
    /// Best-effort estimate of idle time still available to the task.
    pub fn time_remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }
}

/// One turn of the host event loop, as seen by the scheduler.
#[derive(Debug, Clone, Copy)]
pub struct FramePulse {
    /// Timestamp of the pump.
    pub now: Instant,
    /// Spare time the host measured for this turn. `None` when the host has
    /// no estimate (busy frame, or no measurement at all).
    pub idle_budget: Option<Duration>,
}

impl FramePulse {
    /// Pulse stamped with the current instant.
    pub fn now(idle_budget: Option<Duration>) -> Self {
        Self {
            now: Instant::now(),
            idle_budget,
        }
    }
}

type IdleTask = Box<dyn FnOnce(&IdleDeadline) + Send>;

struct QueuedTask {
    id: u64,
    task: IdleTask,
    armed_at: Instant,
    timeout: Duration,
}

/// Cooperative idle-task scheduler.
///
/// Tasks run at most once, never synchronously inside [`schedule`], and only
/// from within [`drive`]. Scheduling never fails; the worst case is
/// default-latency deferral until the bounded wait forces execution.
///
/// [`schedule`]: IdleScheduler::schedule
/// [`drive`]: IdleScheduler::drive
pub struct IdleScheduler {
    capability: IdleCapability,
    next_id: AtomicU64,
    // FIFO; entries are removed by handle on cancel. Pending counts are
    // small (one per feeder), so linear scans are fine.
    queue: Mutex<Vec<QueuedTask>>,
}

impl IdleScheduler {
    /// Create a scheduler for the given host capability.
    pub fn new(capability: IdleCapability) -> Self {
        Self {
            capability,
            next_id: AtomicU64::new(1),
            queue: Mutex::new(Vec::new()),
        }
    }

    /// The capability this scheduler was constructed with.
    pub fn capability(&self) -> IdleCapability {
        self.capability
    }

    /// Arm `task` to run on a future pump, no later than `timeout` after now.
    pub fn schedule(
        &self,
        timeout: Duration,
        task: impl FnOnce(&IdleDeadline) + Send + 'static,
    ) -> TaskHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.queue.lock().push(QueuedTask {
            id,
            task: Box::new(task),
            armed_at: Instant::now(),
            timeout,
        });
        tracing::trace!(id, ?timeout, "armed idle task");
        TaskHandle(id)
    }

    /// Drop an armed task. Guaranteed to prevent execution when the task has
    /// not yet run; a no-op when it already ran or was already cancelled.
    pub fn cancel(&self, handle: TaskHandle) {
        let mut queue = self.queue.lock();
        let before = queue.len();
        queue.retain(|entry| entry.id != handle.0);
        if queue.len() != before {
            tracing::trace!(id = handle.0, "cancelled idle task");
        }
    }

    /// Number of tasks currently armed.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Pump the scheduler for one event-loop turn.
    ///
    /// Tasks armed while this pump runs are held for the next one.
    pub fn drive(&self, pulse: FramePulse) {
        let due: Vec<(QueuedTask, bool)> = {
            let mut queue = self.queue.lock();
            if queue.is_empty() {
                return;
            }
            let mut due = Vec::new();
            let mut keep = Vec::new();
            for entry in queue.drain(..) {
                let expired =
                    pulse.now.saturating_duration_since(entry.armed_at) >= entry.timeout;
                let runnable = match self.capability {
                    IdleCapability::Emulated => true,
                    IdleCapability::Native => {
                        expired || pulse.idle_budget.map_or(false, |b| !b.is_zero())
                    }
                };
                if runnable {
                    let forced = expired && self.capability == IdleCapability::Native;
                    due.push((entry, forced));
                } else {
                    keep.push(entry);
                }
            }
            *queue = keep;
            due
        };

        for (entry, forced) in due {
            let budget = match self.capability {
                // Fixed budget so callers cannot tell emulation apart from
                // native idle behavior through the deadline alone.
                IdleCapability::Emulated => FALLBACK_IDLE_BUDGET,
                IdleCapability::Native => {
                    if forced {
                        Duration::ZERO
                    } else {
                        pulse.idle_budget.unwrap_or(Duration::ZERO)
                    }
                }
            };
            let deadline = IdleDeadline {
                budget,
                started: Instant::now(),
                did_timeout: forced,
            };
            tracing::trace!(id = entry.id, forced, "running idle task");
            (entry.task)(&deadline);
        }
    }
}
