//! Task records for the interception pipeline.
//!
//! A task is a descriptor for one unit of asynchronous work: its kind, its
//! one-shot callback, its monotonic state, and the zones it was scheduled
//! from and into. Every asynchronous operation that passes through a zone
//! is represented by exactly one task record.

use core::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, ErrorKind};
use crate::types::{ErrorValue, TaskId, Value};
use crate::zone::Zone;

/// The callback carried by a task.
///
/// An `Err` return models a thrown error; the invoke pipeline routes it
/// through the handle-error hook chain.
pub type TaskCallback = Box<dyn FnOnce(Option<Value>) -> Result<Value, ErrorValue> + Send>;

/// The kind of asynchronous work a task represents.
///
/// Only [`TaskKind::Microtask`] has host-side machinery in this crate; the
/// other kinds exist so the record can describe work owned by outer
/// adapters (timers, event sources).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// A single-shot task expected to run before the next externally
    /// visible I/O event.
    Microtask,
    /// A member of a periodic queue (timer-style work).
    Periodic,
    /// A callback attached to an event source.
    EventListener,
}

/// The state of a task in its lifecycle.
///
/// Transitions are monotonic: `Created → Scheduled → Running → Completed`,
/// with `Canceled` reachable only from `Scheduled`. `Completed` and
/// `Canceled` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Built but not yet accepted by the schedule chain's terminal.
    Created,
    /// Enqueued on the host, awaiting invocation.
    Scheduled,
    /// Callback currently executing.
    Running,
    /// Terminal: the callback ran (successfully or not).
    Completed,
    /// Terminal: canceled before it ran.
    Canceled,
}

impl TaskState {
    /// Returns true if the task is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }

    /// Returns true if the task can be invoked.
    #[must_use]
    pub const fn can_be_invoked(&self) -> bool {
        matches!(self, Self::Scheduled)
    }
}

struct TaskInner {
    id: TaskId,
    kind: TaskKind,
    source: String,
    state: Mutex<TaskState>,
    zone_of_origin: Zone,
    zone_of_execution: Mutex<Zone>,
    data: Option<Value>,
    callback: Mutex<Option<TaskCallback>>,
}

/// A cheaply cloneable handle to one task record.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

impl Task {
    /// Creates a new task in the `Created` state.
    ///
    /// `zone` becomes both the zone of origin and the zone of execution;
    /// a schedule hook may retarget the latter before the task is
    /// scheduled. `source` is a diagnostic label naming what scheduled
    /// the task.
    #[must_use]
    pub fn new(
        kind: TaskKind,
        source: impl Into<String>,
        zone: Zone,
        data: Option<Value>,
        callback: TaskCallback,
    ) -> Self {
        Self {
            inner: Arc::new(TaskInner {
                id: TaskId::next(),
                kind,
                source: source.into(),
                state: Mutex::new(TaskState::Created),
                zone_of_origin: zone.clone(),
                zone_of_execution: Mutex::new(zone),
                data,
                callback: Mutex::new(Some(callback)),
            }),
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    /// Returns the task kind.
    #[must_use]
    pub fn kind(&self) -> TaskKind {
        self.inner.kind
    }

    /// Returns the diagnostic source label.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.inner.source
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        *self.inner.state.lock()
    }

    /// Returns the opaque payload attached at creation, if any.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.inner.data.as_ref()
    }

    /// Returns the zone that requested scheduling.
    #[must_use]
    pub fn zone_of_origin(&self) -> Zone {
        self.inner.zone_of_origin.clone()
    }

    /// Returns the zone the task will execute under.
    #[must_use]
    pub fn zone_of_execution(&self) -> Zone {
        self.inner.zone_of_execution.lock().clone()
    }

    /// Retargets the task to execute under a different zone.
    ///
    /// Meaningful only from a schedule hook, before the terminal handler
    /// enqueues the task.
    pub fn retarget(&self, zone: Zone) {
        *self.inner.zone_of_execution.lock() = zone;
    }

    /// Returns true if two handles refer to the same record.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Marks the task as scheduled (`Created → Scheduled`).
    ///
    /// Returns true if the state changed.
    pub(crate) fn mark_scheduled(&self) -> bool {
        let mut state = self.inner.state.lock();
        if *state == TaskState::Created {
            *state = TaskState::Scheduled;
            true
        } else {
            false
        }
    }

    /// Begins invocation (`Scheduled → Running`).
    ///
    /// Fails synchronously for any other state; re-invoking a terminal
    /// task is a programmer error, not a silent no-op.
    pub(crate) fn begin_invoke(&self) -> Result<(), Error> {
        let mut state = self.inner.state.lock();
        match *state {
            TaskState::Scheduled => {
                *state = TaskState::Running;
                Ok(())
            }
            TaskState::Created => Err(Error::new(ErrorKind::TaskNotScheduled)
                .with_message(self.inner.id.to_string())),
            TaskState::Running => Err(Error::new(ErrorKind::TaskNotScheduled)
                .with_message(format!("{} is already running", self.inner.id))),
            TaskState::Completed => {
                Err(Error::new(ErrorKind::TaskCompleted).with_message(self.inner.id.to_string()))
            }
            TaskState::Canceled => {
                Err(Error::new(ErrorKind::TaskCanceled).with_message(self.inner.id.to_string()))
            }
        }
    }

    /// Completes the task (`Running → Completed`).
    ///
    /// Returns true if the state changed. Completion happens even when
    /// the callback failed.
    pub(crate) fn complete(&self) -> bool {
        let mut state = self.inner.state.lock();
        if *state == TaskState::Running {
            *state = TaskState::Completed;
            true
        } else {
            false
        }
    }

    /// Cancels the task (`Scheduled → Canceled`).
    ///
    /// A task that is past `Scheduled` can no longer be canceled.
    pub(crate) fn cancel(&self) -> Result<(), Error> {
        let mut state = self.inner.state.lock();
        match *state {
            TaskState::Scheduled => {
                *state = TaskState::Canceled;
                Ok(())
            }
            TaskState::Created => Err(Error::new(ErrorKind::TaskNotScheduled)
                .with_message(self.inner.id.to_string())),
            TaskState::Completed | TaskState::Running => {
                Err(Error::new(ErrorKind::TaskCompleted).with_message(self.inner.id.to_string()))
            }
            TaskState::Canceled => {
                Err(Error::new(ErrorKind::TaskCanceled).with_message(self.inner.id.to_string()))
            }
        }
    }

    /// Takes the one-shot callback out of the record.
    pub(crate) fn take_callback(&self) -> Option<TaskCallback> {
        self.inner.callback.lock().take()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("source", &self.inner.source)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
