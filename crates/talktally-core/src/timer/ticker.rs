//! Redraw tick.
//!
//! While someone is speaking, the live total changes every second even
//! though no state changes. The tick exists only to prompt a re-read of the
//! totals; it carries no data and never mutates the session. It must run
//! only while a participant is active.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Default redraw period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// Opaque handle for a scheduled recurring tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle(u64);

impl TickHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Recurring-callback primitive.
pub trait Scheduler {
    fn schedule(&mut self, interval: Duration) -> TickHandle;
    fn cancel(&mut self, handle: TickHandle);
}

/// Ties the tick's lifetime to the active state.
///
/// Call [`TickController::sync`] after every transition. The handle is
/// `Some` exactly while a participant is active.
#[derive(Debug)]
pub struct TickController<S: Scheduler> {
    scheduler: S,
    interval: Duration,
    handle: Option<TickHandle>,
}

impl<S: Scheduler> TickController<S> {
    pub fn new(scheduler: S, interval: Duration) -> Self {
        Self {
            scheduler,
            interval,
            handle: None,
        }
    }

    /// Start the tick on entering the active state, cancel it on leaving.
    pub fn sync(&mut self, active: bool) {
        match (active, self.handle) {
            (true, None) => {
                let handle = self.scheduler.schedule(self.interval);
                debug!(handle = handle.raw(), "tick started");
                self.handle = Some(handle);
            }
            (false, Some(handle)) => {
                self.scheduler.cancel(handle);
                debug!(handle = handle.raw(), "tick cancelled");
                self.handle = None;
            }
            _ => {}
        }
    }

    /// Cancel unconditionally. Runs on drop as well.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.scheduler.cancel(handle);
            debug!(handle = handle.raw(), "tick cancelled on shutdown");
        }
    }

    pub fn handle(&self) -> Option<TickHandle> {
        self.handle
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }
}

impl<S: Scheduler> Drop for TickController<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Tokio-backed scheduler. Each scheduled tick is a task sending `()` on a
/// channel once per interval; cancelling aborts the task.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<()>,
    tasks: HashMap<TickHandle, JoinHandle<()>>,
    next_id: u64,
}

impl TokioScheduler {
    /// Returns the scheduler and the receiving end of its tick channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                tasks: HashMap::new(),
                next_id: 1,
            },
            rx,
        )
    }

    pub fn active_tasks(&self) -> usize {
        self.tasks.len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, period: Duration) -> TickHandle {
        let handle = TickHandle(self.next_id);
        self.next_id += 1;

        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticks.tick().await;
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
