//! Host collaborators: the microtask queue and the uncaught-error sink.
//!
//! The core never talks to a real event loop. The terminal handlers of
//! the delegate chain need exactly two host-level effects, captured by
//! the [`ZoneHost`] trait: enqueue a microtask for later execution, and
//! accept an error that escaped every handler. Wiring those effects to a
//! real host is an adapter concern.
//!
//! [`FlushHost`] is the test-controlled implementation: an explicit FIFO
//! queue that must be manually flushed. One flush drains to quiescence,
//! including tasks scheduled during the drain, bounded by
//! [`HostConfig::max_drain`] so runaway continuation chains fail loudly
//! instead of spinning.

use std::sync::{Arc, OnceLock};

use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{HostError, UncaughtError};
use crate::task::{Task, TaskState};
use crate::zone::invoke_task;

/// The host-side effects the interception pipeline terminates into.
pub trait ZoneHost: Send + Sync {
    /// Accepts a scheduled microtask for eventual invocation.
    fn enqueue(&self, task: Task);

    /// Accepts an error that escaped every handler in the chain.
    fn report_uncaught(&self, error: UncaughtError);
}

/// Configuration for a [`FlushHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Maximum number of tasks one `flush` call may invoke before it
    /// gives up and reports a runaway chain.
    pub max_drain: u64,
}

impl HostConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self { max_drain: 100_000 }
    }

    /// Sets the per-flush invocation ceiling.
    #[must_use]
    pub const fn with_max_drain(mut self, max_drain: u64) -> Self {
        self.max_drain = max_drain;
        self
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A manually flushed microtask queue with a collected uncaught log.
///
/// Tasks enqueue in FIFO order and run only when [`FlushHost::flush`] is
/// called. Uncaught reports are collected for inspection rather than
/// printed, so tests can assert on exactly what escaped.
pub struct FlushHost {
    config: HostConfig,
    queue: SegQueue<Task>,
    uncaught: Mutex<Vec<UncaughtError>>,
}

impl FlushHost {
    /// Creates a flush host with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HostConfig::new())
    }

    /// Creates a flush host with an explicit configuration.
    #[must_use]
    pub fn with_config(config: HostConfig) -> Self {
        Self {
            config,
            queue: SegQueue::new(),
            uncaught: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of tasks waiting in the queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if no tasks are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drains the queue to quiescence, invoking each task through the
    /// interception pipeline.
    ///
    /// Tasks scheduled while the drain is running are drained by the
    /// same call. Canceled tasks are skipped. Returns the number of
    /// tasks invoked.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::DrainCeilingExceeded`] when the configured
    /// ceiling is hit with work still pending. The undrained work stays
    /// in the queue; a later `flush` call picks it up.
    pub fn flush(&self) -> Result<u64, HostError> {
        let mut drained: u64 = 0;
        while let Some(task) = self.queue.pop() {
            if task.state() == TaskState::Canceled {
                continue;
            }
            if drained >= self.config.max_drain {
                self.queue.push(task);
                return Err(HostError::DrainCeilingExceeded {
                    drained,
                    max_drain: self.config.max_drain,
                });
            }
            drained += 1;
            if let Err(err) = invoke_task(&task, None) {
                // Callback errors normally stop at the handle-error
                // terminal; reaching here means a hook declined them.
                warn!(task = %task.id(), %err, "task invocation failed during flush");
            }
        }
        Ok(drained)
    }

    /// Returns a copy of the collected uncaught reports.
    #[must_use]
    pub fn uncaught_reports(&self) -> Vec<UncaughtError> {
        self.uncaught.lock().clone()
    }

    /// Takes the collected uncaught reports, leaving the log empty.
    #[must_use]
    pub fn take_uncaught_reports(&self) -> Vec<UncaughtError> {
        std::mem::take(&mut self.uncaught.lock())
    }
}

impl Default for FlushHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneHost for FlushHost {
    fn enqueue(&self, task: Task) {
        self.queue.push(task);
    }

    fn report_uncaught(&self, error: UncaughtError) {
        self.uncaught.lock().push(error);
    }
}

static GLOBAL_HOST: OnceLock<Arc<FlushHost>> = OnceLock::new();

/// Returns the process-wide default host backing [`Zone::root`].
///
/// [`Zone::root`]: crate::zone::Zone::root
#[must_use]
pub fn global() -> Arc<FlushHost> {
    Arc::clone(GLOBAL_HOST.get_or_init(|| Arc::new(FlushHost::new())))
}
