//! The delegate chain: hook dispatch with explicit forwarding.
//!
//! Every operation category (schedule, invoke, handle-error, cancel)
//! dispatches by walking from a starting zone toward the root and handing
//! the operation to the nearest override found. The override receives a
//! forward handle bound to its parent's chain: calling through continues
//! dispatch above it, and not calling through suppresses the terminal
//! effect. Chains that do forward always terminate at a built-in handler
//! performing the host-level effect: enqueue on the host queue, run the
//! callback, report to the uncaught-error sink, or cancel the record.
//!
//! The unhandled-rejection check is its own scheduling category with no
//! override surface; it goes straight to the terminal.

use tracing::{error, trace};

use crate::error::{Error, UncaughtError};
use crate::task::Task;
use crate::types::{ErrorValue, Value};
use crate::zone::current::{TaskGuard, ZoneGuard};
use crate::zone::Zone;

/// Forward handle for the schedule category, bound to the chain above
/// the override that received it.
pub struct ScheduleForward {
    next: Option<Zone>,
}

impl ScheduleForward {
    /// Continues schedule dispatch up the chain.
    ///
    /// `current` is the zone that requested scheduling.
    pub fn schedule_task(&self, current: &Zone, task: Task) -> Task {
        match &self.next {
            Some(zone) => dispatch_schedule(zone, current, task),
            None => terminal_schedule(task),
        }
    }
}

/// Forward handle for the invoke category.
pub struct InvokeForward {
    next: Option<Zone>,
}

impl InvokeForward {
    /// Continues invoke dispatch up the chain.
    pub fn invoke_task(
        &self,
        current: &Zone,
        task: &Task,
        args: Option<Value>,
    ) -> Result<Value, ErrorValue> {
        match &self.next {
            Some(zone) => dispatch_invoke(zone, current, task, args),
            None => terminal_invoke(task, args),
        }
    }
}

/// Forward handle for the handle-error category.
pub struct HandleErrorForward {
    next: Option<Zone>,
}

impl HandleErrorForward {
    /// Continues handle-error dispatch up the chain.
    pub fn handle_error(&self, current: &Zone, error: &UncaughtError) -> bool {
        match &self.next {
            Some(zone) => dispatch_handle_error(zone, current, error),
            None => terminal_handle_error(current, error),
        }
    }
}

/// Forward handle for the cancel category.
pub struct CancelForward {
    next: Option<Zone>,
}

impl CancelForward {
    /// Continues cancel dispatch up the chain.
    pub fn cancel_task(&self, current: &Zone, task: &Task) -> Result<(), Error> {
        match &self.next {
            Some(zone) => dispatch_cancel(zone, current, task),
            None => terminal_cancel(task),
        }
    }
}

pub(crate) fn dispatch_schedule(start: &Zone, current: &Zone, task: Task) -> Task {
    let mut cursor = Some(start.clone());
    while let Some(zone) = cursor {
        if let Some(hook) = zone.schedule_hook() {
            let forward = ScheduleForward {
                next: zone.parent(),
            };
            let target = task.zone_of_execution();
            return hook(&forward, current, &target, task);
        }
        cursor = zone.parent();
    }
    terminal_schedule(task)
}

fn terminal_schedule(task: Task) -> Task {
    task.mark_scheduled();
    let zone = task.zone_of_execution();
    trace!(task = %task.id(), zone = %zone.name(), source = task.source(), "task enqueued");
    zone.host().enqueue(task.clone());
    task
}

/// Schedules the unhandled-rejection check task.
///
/// This is a category of its own: it has no override surface and always
/// reaches the terminal, so a misbehaving schedule hook cannot suppress
/// rejection reporting.
pub(crate) fn dispatch_rejection_check(task: Task) -> Task {
    terminal_schedule(task)
}

pub(crate) fn dispatch_invoke(
    start: &Zone,
    current: &Zone,
    task: &Task,
    args: Option<Value>,
) -> Result<Value, ErrorValue> {
    let mut cursor = Some(start.clone());
    while let Some(zone) = cursor {
        if let Some(hook) = zone.invoke_hook() {
            let forward = InvokeForward {
                next: zone.parent(),
            };
            let target = task.zone_of_execution();
            return hook(&forward, current, &target, task, args);
        }
        cursor = zone.parent();
    }
    terminal_invoke(task, args)
}

fn terminal_invoke(task: &Task, args: Option<Value>) -> Result<Value, ErrorValue> {
    match task.take_callback() {
        Some(callback) => callback(args),
        None => Err(ErrorValue::new(format!(
            "{} has no callback to invoke",
            task.id()
        ))),
    }
}

pub(crate) fn dispatch_handle_error(start: &Zone, current: &Zone, error: &UncaughtError) -> bool {
    let mut cursor = Some(start.clone());
    while let Some(zone) = cursor {
        if let Some(hook) = zone.handle_error_hook() {
            let forward = HandleErrorForward {
                next: zone.parent(),
            };
            return hook(&forward, current, current, error);
        }
        cursor = zone.parent();
    }
    terminal_handle_error(current, error)
}

fn terminal_handle_error(current: &Zone, error: &UncaughtError) -> bool {
    error!(zone = %current.name(), message = %error.message, "uncaught error reached the root handler");
    current.host().report_uncaught(error.clone());
    true
}

pub(crate) fn dispatch_cancel(start: &Zone, current: &Zone, task: &Task) -> Result<(), Error> {
    let mut cursor = Some(start.clone());
    while let Some(zone) = cursor {
        if let Some(hook) = zone.cancel_hook() {
            let forward = CancelForward {
                next: zone.parent(),
            };
            let target = task.zone_of_execution();
            return hook(&forward, current, &target, task);
        }
        cursor = zone.parent();
    }
    terminal_cancel(task)
}

fn terminal_cancel(task: &Task) -> Result<(), Error> {
    task.cancel()?;
    trace!(task = %task.id(), "task canceled");
    Ok(())
}

/// Invokes a scheduled task through the interception pipeline.
///
/// The task moves to `Running`, its execution zone becomes current for
/// the duration of the callback (restored on every exit path), and the
/// task completes even when the callback fails. A callback error is
/// dispatched through the handle-error chain; if no link in the chain
/// claims it, the error surfaces to the invoker.
///
/// # Errors
///
/// Returns an error when the task is not in the `Scheduled` state, or
/// when the callback failed and the handle-error chain declined it.
pub fn invoke_task(task: &Task, args: Option<Value>) -> Result<Value, Error> {
    task.begin_invoke()?;
    let zone = task.zone_of_execution();
    trace!(task = %task.id(), zone = %zone.name(), "invoking task");

    let result = {
        let _zone_guard = ZoneGuard::enter(zone.clone());
        let _task_guard = TaskGuard::enter(task.clone());
        dispatch_invoke(&zone, &zone, task, args)
    };
    task.complete();

    match result {
        Ok(value) => Ok(value),
        Err(thrown) => {
            let report = UncaughtError::from_callback(thrown.clone(), zone.clone(), Some(task.clone()));
            if zone.handle_error(&report) {
                Ok(Value::Unit)
            } else {
                Err(Error::callback_failed(thrown))
            }
        }
    }
}
