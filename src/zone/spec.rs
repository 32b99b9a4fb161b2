//! Zone fork specifications: hook overrides and properties.
//!
//! A [`ZoneSpec`] is the configuration object recognized when forking a
//! zone. Every hook is optional; an unset hook inherits the parent's
//! behavior. Each hook receives a forward handle bound to the parent's
//! chain, so it can observe and transform an operation and still call
//! through, or fully intercept it and suppress forwarding.

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, UncaughtError};
use crate::task::Task;
use crate::types::{ErrorValue, Value};
use crate::zone::delegate::{CancelForward, HandleErrorForward, InvokeForward, ScheduleForward};
use crate::zone::Zone;

/// Hook intercepting task scheduling.
///
/// Arguments: forward handle, current zone, target zone, task. Returns
/// the (possibly transformed) task. Not forwarding suppresses the
/// terminal enqueue entirely; the task then stays in the `Created` state.
pub type ScheduleHook =
    Arc<dyn Fn(&ScheduleForward, &Zone, &Zone, Task) -> Task + Send + Sync>;

/// Hook intercepting task invocation.
///
/// Arguments: forward handle, current zone, target zone, task, callback
/// arguments. An `Err` models a thrown error, routed through the
/// handle-error chain by the pipeline.
pub type InvokeHook = Arc<
    dyn Fn(&InvokeForward, &Zone, &Zone, &Task, Option<Value>) -> Result<Value, ErrorValue>
        + Send
        + Sync,
>;

/// Hook intercepting uncaught-error reporting.
///
/// Returns true if the error was handled (suppressed); the terminal
/// handler reports to the host sink and returns true.
pub type HandleErrorHook =
    Arc<dyn Fn(&HandleErrorForward, &Zone, &Zone, &UncaughtError) -> bool + Send + Sync>;

/// Hook intercepting task cancellation.
pub type CancelHook =
    Arc<dyn Fn(&CancelForward, &Zone, &Zone, &Task) -> Result<(), Error> + Send + Sync>;

/// Configuration for forking a zone: a name, property entries, and
/// optional hook overrides.
///
/// Properties attached here shadow same-named entries of ancestors;
/// ancestor values stay visible for unset keys.
#[derive(Clone, Default)]
pub struct ZoneSpec {
    pub(crate) name: Option<String>,
    pub(crate) properties: HashMap<String, Value>,
    pub(crate) on_schedule_task: Option<ScheduleHook>,
    pub(crate) on_invoke_task: Option<InvokeHook>,
    pub(crate) on_handle_error: Option<HandleErrorHook>,
    pub(crate) on_cancel_task: Option<CancelHook>,
}

impl ZoneSpec {
    /// Creates an empty spec with the given diagnostic name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Attaches a named property value, inherited down the tree.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Installs a schedule hook.
    #[must_use]
    pub fn on_schedule_task<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ScheduleForward, &Zone, &Zone, Task) -> Task + Send + Sync + 'static,
    {
        self.on_schedule_task = Some(Arc::new(hook));
        self
    }

    /// Installs an invoke hook.
    #[must_use]
    pub fn on_invoke_task<F>(mut self, hook: F) -> Self
    where
        F: Fn(&InvokeForward, &Zone, &Zone, &Task, Option<Value>) -> Result<Value, ErrorValue>
            + Send
            + Sync
            + 'static,
    {
        self.on_invoke_task = Some(Arc::new(hook));
        self
    }

    /// Installs a handle-error hook.
    #[must_use]
    pub fn on_handle_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HandleErrorForward, &Zone, &Zone, &UncaughtError) -> bool + Send + Sync + 'static,
    {
        self.on_handle_error = Some(Arc::new(hook));
        self
    }

    /// Installs a cancel hook.
    #[must_use]
    pub fn on_cancel_task<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CancelForward, &Zone, &Zone, &Task) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.on_cancel_task = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for ZoneSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZoneSpec")
            .field("name", &self.name)
            .field("properties", &self.properties.keys())
            .field("on_schedule_task", &self.on_schedule_task.is_some())
            .field("on_invoke_task", &self.on_invoke_task.is_some())
            .field("on_handle_error", &self.on_handle_error.is_some())
            .field("on_cancel_task", &self.on_cancel_task.is_some())
            .finish()
    }
}
