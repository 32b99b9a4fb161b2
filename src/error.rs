//! Error types and error handling strategy.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - Task misuse (re-invoking a terminal task) surfaces synchronously to
//!   the caller, never swallowed
//! - Errors raised inside promise handlers stay inside the deferred-value
//!   chain until caught or reported once as an uncaught rejection
//! - Hook chain errors propagate synchronously to whoever triggered the
//!   dispatch, since hooks run inline with scheduling and invocation
//!
//! The [`UncaughtError`] type is the synthesized report handed to the
//! handle-error hook chain. Its `message` field is a compatibility
//! contract: `"Uncaught (in promise): " + String(reason)`, with a newline
//! and the stack appended when the reason carries one.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::task::Task;
use crate::types::{ErrorValue, Value};
use crate::zone::Zone;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Task misuse ===
    /// Tried to invoke a task that was never scheduled.
    TaskNotScheduled,
    /// Tried to invoke or cancel a task that already completed.
    TaskCompleted,
    /// Tried to invoke a task that was canceled, or cancel a task that
    /// is past the scheduled state.
    TaskCanceled,

    // === Deferred value ===
    /// A promise was resolved with itself (chaining cycle).
    ChainCycle,
    /// A task callback failed and no hook in the chain handled the error.
    CallbackFailed,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::TaskNotScheduled | Self::TaskCompleted | Self::TaskCanceled => {
                ErrorCategory::Task
            }
            Self::ChainCycle | Self::CallbackFailed => ErrorCategory::Promise,
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Self::TaskNotScheduled => "task is not in the scheduled state",
            Self::TaskCompleted => "task already completed",
            Self::TaskCanceled => "task was canceled",
            Self::ChainCycle => "promise resolution chain cycle",
            Self::CallbackFailed => "task callback failed",
        }
    }
}

/// High-level error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Task record lifecycle misuse.
    Task,
    /// Deferred-value chain errors.
    Promise,
}

/// The core error type.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    payload: Option<ErrorValue>,
}

impl Error {
    /// Creates a new error of the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            payload: None,
        }
    }

    /// Attaches a context message to this error.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Creates a callback-failure error carrying the thrown value.
    #[must_use]
    pub fn callback_failed(error: ErrorValue) -> Self {
        Self {
            kind: ErrorKind::CallbackFailed,
            message: None,
            payload: Some(error),
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns the attached context message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the thrown value for callback failures.
    #[must_use]
    pub fn payload(&self) -> Option<&ErrorValue> {
        self.payload.as_ref()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.describe())?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        if let Some(payload) = &self.payload {
            write!(f, ": {payload}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// Errors raised by a host implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The flush loop invoked `max_drain` tasks without reaching
    /// quiescence. Almost always a runaway continuation chain.
    #[error("flush invoked {drained} tasks without reaching quiescence (max_drain {max_drain})")]
    DrainCeilingExceeded {
        /// Number of tasks invoked before giving up.
        drained: u64,
        /// The configured ceiling.
        max_drain: u64,
    },
}

/// The synthesized report for an error that escaped every handler.
///
/// Produced in two situations: a task callback failed and no hook in the
/// handle-error chain claimed it, or a promise settled rejected with no
/// handler attached by the time the deferred check ran.
#[derive(Debug, Clone)]
pub struct UncaughtError {
    /// The formatted report message.
    pub message: String,
    /// The underlying thrown error.
    pub error: ErrorValue,
    /// The original rejection reason, for promise reports.
    pub rejection: Option<Value>,
    /// The zone active when the error occurred.
    pub zone: Option<Zone>,
    /// The task active when the error occurred.
    pub task: Option<Task>,
}

impl UncaughtError {
    /// Builds a report for a task callback failure.
    #[must_use]
    pub fn from_callback(error: ErrorValue, zone: Zone, task: Option<Task>) -> Self {
        Self {
            message: error.message().to_owned(),
            error,
            rejection: None,
            zone: Some(zone),
            task,
        }
    }

    /// Builds a report for an unhandled promise rejection.
    ///
    /// The message format is a compatibility contract:
    /// `"Uncaught (in promise): " + String(reason)`, plus a newline and
    /// the stack when the reason carries one.
    #[must_use]
    pub fn from_rejection(reason: Value, zone: Zone, task: Option<Task>) -> Self {
        let mut message = format!("Uncaught (in promise): {reason}");
        if let Value::Error(e) = &reason {
            if let Some(stack) = e.stack() {
                message.push('\n');
                message.push_str(stack);
            }
        }
        Self {
            error: ErrorValue::new(message.clone()),
            message,
            rejection: Some(reason),
            zone: Some(zone),
            task,
        }
    }

    /// Returns a serializable snapshot of this report for diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> UncaughtSnapshot {
        UncaughtSnapshot {
            message: self.message.clone(),
            zone: self.zone.as_ref().map(|z| z.name().to_owned()),
            task: self.task.as_ref().map(|t| t.source().to_owned()),
        }
    }
}

impl fmt::Display for UncaughtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UncaughtError {}

/// A serializable snapshot of an [`UncaughtError`] for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncaughtSnapshot {
    /// The formatted report message.
    pub message: String,
    /// Name of the zone active when the error occurred.
    pub zone: Option<String>,
    /// Source label of the task active when the error occurred.
    pub task: Option<String>,
}
