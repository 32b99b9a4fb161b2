//! The zone type: an immutable node in a tree of execution contexts.

use core::fmt;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::error::{Error, UncaughtError};
use crate::host::ZoneHost;
use crate::task::Task;
use crate::types::{ErrorValue, Value, ZoneId};
use crate::zone::current::{self, ZoneGuard};
use crate::zone::delegate;
use crate::zone::spec::{CancelHook, HandleErrorHook, InvokeHook, ScheduleHook, ZoneSpec};

static PROCESS_ROOT: OnceLock<Zone> = OnceLock::new();

struct ZoneInner {
    id: ZoneId,
    name: String,
    parent: Option<Zone>,
    properties: HashMap<String, Value>,
    on_schedule_task: Option<ScheduleHook>,
    on_invoke_task: Option<InvokeHook>,
    on_handle_error: Option<HandleErrorHook>,
    on_cancel_task: Option<CancelHook>,
    host: Arc<dyn ZoneHost>,
}

/// A node in a rooted tree of execution contexts.
///
/// A zone carries a diagnostic name, inheritable properties, and optional
/// interception hooks. Zones are immutable after creation: forking never
/// mutates the parent, and a child shadows rather than overwrites. The
/// handle is a cheap `Arc` clone.
#[derive(Clone)]
pub struct Zone {
    inner: Arc<ZoneInner>,
}

impl Zone {
    /// Returns the process-wide root zone, created on first use and
    /// backed by the global flush host. Never torn down.
    #[must_use]
    pub fn root() -> Self {
        PROCESS_ROOT
            .get_or_init(|| Self::root_with_host(crate::host::global()))
            .clone()
    }

    /// Creates a fresh root zone backed by an explicit host.
    ///
    /// Adapters wiring zones to a real event loop, and tests wanting an
    /// isolated manually flushed queue, start here.
    #[must_use]
    pub fn root_with_host(host: Arc<dyn ZoneHost>) -> Self {
        Self {
            inner: Arc::new(ZoneInner {
                id: ZoneId::next(),
                name: "<root>".to_owned(),
                parent: None,
                properties: HashMap::new(),
                on_schedule_task: None,
                on_invoke_task: None,
                on_handle_error: None,
                on_cancel_task: None,
                host,
            }),
        }
    }

    /// Forks a child zone from this one.
    ///
    /// The child's hooks and properties shadow this zone's; values of
    /// unset keys remain visible through walk-up lookup. The parent is
    /// never mutated.
    #[must_use]
    pub fn fork(&self, spec: ZoneSpec) -> Self {
        let name = spec.name.unwrap_or_else(|| "<anonymous>".to_owned());
        let child = Self {
            inner: Arc::new(ZoneInner {
                id: ZoneId::next(),
                name,
                parent: Some(self.clone()),
                properties: spec.properties,
                on_schedule_task: spec.on_schedule_task,
                on_invoke_task: spec.on_invoke_task,
                on_handle_error: spec.on_handle_error,
                on_cancel_task: spec.on_cancel_task,
                host: Arc::clone(&self.inner.host),
            }),
        };
        debug!(parent = %self.inner.name, child = %child.inner.name, id = %child.inner.id, "zone forked");
        child
    }

    /// Returns the diagnostic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the zone identifier.
    #[must_use]
    pub fn id(&self) -> ZoneId {
        self.inner.id
    }

    /// Returns the parent zone, or `None` for a root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.inner.parent.clone()
    }

    /// Returns the zone currently entered on this thread, falling back
    /// to the process root when no zone has been entered.
    #[must_use]
    pub fn current() -> Self {
        current::current_zone().unwrap_or_else(Self::root)
    }

    /// Returns the task currently being invoked on this thread, if any.
    #[must_use]
    pub fn current_task() -> Option<Task> {
        current::current_task()
    }

    /// Looks up `key` walking from this zone to the root.
    ///
    /// `None` means no ancestor defines the key; `Some(Value::Unit)`
    /// means a zone defined it as the absent value. The two are distinct.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.zone_with(key)
            .and_then(|zone| zone.inner.properties.get(key).cloned())
    }

    /// Returns the nearest zone (including this one) defining `key`.
    #[must_use]
    pub fn zone_with(&self, key: &str) -> Option<Self> {
        let mut cursor = Some(self.clone());
        while let Some(zone) = cursor {
            if zone.inner.properties.contains_key(key) {
                return Some(zone);
            }
            cursor = zone.parent();
        }
        None
    }

    /// Runs `f` with this zone as current, restoring the previous
    /// current zone on every exit path, including panics.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = ZoneGuard::enter(self.clone());
        f()
    }

    /// Runs a fallible callback with this zone as current, routing an
    /// `Err` through the handle-error chain.
    ///
    /// Returns `Ok(Value::Unit)` when a hook (or the terminal sink)
    /// claimed the error, and the original `Err` when the chain declined
    /// it.
    ///
    /// # Errors
    ///
    /// Propagates the callback error when no link in the handle-error
    /// chain handled it.
    pub fn run_guarded(
        &self,
        f: impl FnOnce() -> Result<Value, ErrorValue>,
    ) -> Result<Value, ErrorValue> {
        let outcome = {
            let _guard = ZoneGuard::enter(self.clone());
            f()
        };
        match outcome {
            Ok(value) => Ok(value),
            Err(thrown) => {
                let report =
                    UncaughtError::from_callback(thrown.clone(), self.clone(), Self::current_task());
                if self.handle_error(&report) {
                    Ok(Value::Unit)
                } else {
                    Err(thrown)
                }
            }
        }
    }

    /// Schedules a task through the interception pipeline, starting
    /// dispatch at this zone.
    ///
    /// Returns the (possibly transformed) task. When the chain reaches
    /// the terminal handler, the task transitions to `Scheduled` and is
    /// enqueued on the root host; a hook that declines to forward leaves
    /// the task in `Created` and nothing is enqueued.
    pub fn schedule_task(&self, task: Task) -> Task {
        delegate::dispatch_schedule(self, self, task)
    }

    /// Schedules an unhandled-rejection check task.
    ///
    /// Distinct category from ordinary scheduling: no override surface,
    /// terminal-only.
    pub fn schedule_rejection_check(&self, task: Task) -> Task {
        delegate::dispatch_rejection_check(task)
    }

    /// Cancels a scheduled task through the cancel hook chain.
    ///
    /// # Errors
    ///
    /// Returns an error when the task is past the `Scheduled` state.
    pub fn cancel_task(&self, task: &Task) -> Result<(), Error> {
        delegate::dispatch_cancel(self, self, task)
    }

    /// Dispatches an error through the handle-error hook chain.
    ///
    /// Returns true when some link (or the terminal sink) handled it.
    pub fn handle_error(&self, error: &UncaughtError) -> bool {
        delegate::dispatch_handle_error(self, self, error)
    }

    /// Returns true if two handles refer to the same zone node.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn schedule_hook(&self) -> Option<&ScheduleHook> {
        self.inner.on_schedule_task.as_ref()
    }

    pub(crate) fn invoke_hook(&self) -> Option<&InvokeHook> {
        self.inner.on_invoke_task.as_ref()
    }

    pub(crate) fn handle_error_hook(&self) -> Option<&HandleErrorHook> {
        self.inner.on_handle_error.as_ref()
    }

    pub(crate) fn cancel_hook(&self) -> Option<&CancelHook> {
        self.inner.on_cancel_task.as_ref()
    }

    pub(crate) fn host(&self) -> &Arc<dyn ZoneHost> {
        &self.inner.host
    }
}

impl PartialEq for Zone {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Zone {}

impl fmt::Debug for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zone")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field(
                "parent",
                &self.inner.parent.as_ref().map(|p| p.name().to_owned()),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_root;

    #[test]
    fn fork_shadows_without_mutating_parent() {
        let (_, root) = test_root();
        let parent = root.fork(ZoneSpec::named("parent").with_property("color", "blue"));
        let child = parent.fork(ZoneSpec::named("child").with_property("color", "red"));

        assert_eq!(child.get("color"), Some(Value::str("red")));
        assert_eq!(parent.get("color"), Some(Value::str("blue")));
    }

    #[test]
    fn get_walks_to_root_and_distinguishes_unset() {
        let (_, root) = test_root();
        let parent = root.fork(
            ZoneSpec::named("parent")
                .with_property("shared", Value::Int(1))
                .with_property("absent", Value::Unit),
        );
        let child = parent.fork(ZoneSpec::named("child"));

        assert_eq!(child.get("shared"), Some(Value::Int(1)));
        assert_eq!(child.get("absent"), Some(Value::Unit));
        assert_eq!(child.get("missing"), None);
        assert_eq!(child.zone_with("shared"), Some(parent));
        assert_eq!(child.zone_with("missing"), None);
    }

    #[test]
    fn run_sets_and_restores_current() {
        let (_, root) = test_root();
        let zone = root.fork(ZoneSpec::named("worker"));

        let observed = zone.run(Zone::current);
        assert_eq!(observed, zone);
    }

    #[test]
    fn run_restores_current_on_panic() {
        let (_, root) = test_root();
        let zone = root.fork(ZoneSpec::named("panicky"));

        let before = root.run(|| {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                zone.run(|| panic!("boom"));
            }));
            assert!(result.is_err());
            Zone::current()
        });
        assert_eq!(before, root);
    }

    #[test]
    fn run_guarded_routes_errors_to_the_sink() {
        let (host, root) = test_root();
        let result = root.run_guarded(|| Err(crate::types::ErrorValue::new("oops")));
        assert_eq!(result, Ok(Value::Unit));
        let reports = host.take_uncaught_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].error.message(), "oops");
    }

    #[test]
    fn zone_identity_is_by_node() {
        let (_, root) = test_root();
        let a = root.fork(ZoneSpec::named("same"));
        let b = root.fork(ZoneSpec::named("same"));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
