//! The zone-aware deferred value.
//!
//! A [`Promise`] is a state machine for one eventually resolved value:
//! `pending → resolving → {fulfilled | rejected}`. `resolving` is the
//! intermediate state entered when a promise is resolved with another
//! promise; the outer one adopts the inner one's eventual state without
//! ever exposing "fulfilled with a promise".
//!
//! Every continuation runs as its own task record scheduled through the
//! zone that was current when the continuation was registered, never the
//! zone current at resolution time. Rejections that reach settlement with
//! no handler attached are reported exactly once, through a deferred
//! check task with first-check-wins semantics.
//!
//! Settlement is permanent, the result is set exactly once, and reactions
//! fire in registration order. Locks are never held across hook or
//! handler invocations.

mod combinator;

use core::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Error, ErrorKind, UncaughtError};
use crate::task::{Task, TaskCallback, TaskKind};
use crate::types::{ErrorValue, Value};
use crate::zone::Zone;

/// A fulfillment or rejection handler.
///
/// An `Err` return models a thrown error and rejects the chained promise.
pub type Handler = Box<dyn FnOnce(Value) -> Result<Value, Value> + Send>;

/// The externally observable state of a promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromiseStatus {
    /// Not yet resolved.
    Pending,
    /// Resolved with another promise; adopting its eventual state.
    Resolving,
    /// Terminal: settled with a value.
    Fulfilled,
    /// Terminal: settled with a rejection reason.
    Rejected,
}

enum PromiseState {
    Pending,
    Resolving,
    Fulfilled(Value),
    Rejected(Value),
}

impl PromiseState {
    const fn is_settled(&self) -> bool {
        matches!(self, Self::Fulfilled(_) | Self::Rejected(_))
    }
}

struct Reaction {
    on_fulfilled: Option<Handler>,
    on_rejected: Option<Handler>,
    child: Promise,
    zone: Zone,
}

struct PromiseInner {
    state: PromiseState,
    reactions: Vec<Reaction>,
    /// At least one reaction was ever attached; its rejection, if any,
    /// flows downstream instead of going uncaught here.
    handled: bool,
    /// The unhandled check already fired; attaching a handler now does
    /// not retract the report.
    reported: bool,
    /// Zone active at construction (diagnostic).
    zone: Zone,
}

/// A cheaply cloneable handle to one deferred value.
#[derive(Clone)]
pub struct Promise {
    inner: Arc<Mutex<PromiseInner>>,
}

/// The resolution capability handed to a promise executor.
///
/// Cloneable; the first call to [`Resolver::resolve`] or
/// [`Resolver::reject`] wins and every later call is a no-op.
#[derive(Clone)]
pub struct Resolver {
    promise: Promise,
}

impl Resolver {
    /// Resolves the promise with a value.
    ///
    /// A promise value triggers adoption of its eventual state; anything
    /// else fulfills directly. Ignored after settlement.
    pub fn resolve(&self, value: impl Into<Value>) {
        self.promise.resolve_with(value.into(), false);
    }

    /// Rejects the promise with a reason. Ignored after settlement.
    pub fn reject(&self, reason: impl Into<Value>) {
        self.promise.reject_with(reason.into(), false);
    }
}

impl Promise {
    /// Creates a promise and runs `executor` synchronously with its
    /// resolution capability. The current zone becomes the zone of
    /// creation.
    #[must_use]
    pub fn new(executor: impl FnOnce(Resolver)) -> Self {
        let promise = Self::pending_in(Zone::current());
        executor(Resolver {
            promise: promise.clone(),
        });
        promise
    }

    /// Creates a promise resolved with `value`.
    #[must_use]
    pub fn resolved(value: impl Into<Value>) -> Self {
        Self::new(|resolver| resolver.resolve(value))
    }

    /// Creates a promise rejected with `reason`.
    ///
    /// The unhandled-rejection check is scheduled immediately, so a
    /// handler must be attached before the current queue flushes to
    /// suppress the report.
    #[must_use]
    pub fn rejected(reason: impl Into<Value>) -> Self {
        Self::new(|resolver| resolver.reject(reason))
    }

    pub(crate) fn pending_in(zone: Zone) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PromiseInner {
                state: PromiseState::Pending,
                reactions: Vec::new(),
                handled: false,
                reported: false,
                zone,
            })),
        }
    }

    /// Returns the externally observable state.
    #[must_use]
    pub fn status(&self) -> PromiseStatus {
        match self.inner.lock().state {
            PromiseState::Pending => PromiseStatus::Pending,
            PromiseState::Resolving => PromiseStatus::Resolving,
            PromiseState::Fulfilled(_) => PromiseStatus::Fulfilled,
            PromiseState::Rejected(_) => PromiseStatus::Rejected,
        }
    }

    /// Returns the settled value or rejection reason, if any.
    #[must_use]
    pub fn result(&self) -> Option<Value> {
        match &self.inner.lock().state {
            PromiseState::Fulfilled(v) | PromiseState::Rejected(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Returns the zone that was current at construction.
    #[must_use]
    pub fn zone_of_creation(&self) -> Zone {
        self.inner.lock().zone.clone()
    }

    /// Returns true if two handles refer to the same deferred value.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Registers a fulfillment handler; returns the chained promise.
    ///
    /// The handler runs as its own task scheduled through the zone
    /// current right now (registration time). A rejection passes through
    /// to the chained promise unchanged.
    pub fn then<F>(&self, on_fulfilled: F) -> Self
    where
        F: FnOnce(Value) -> Result<Value, Value> + Send + 'static,
    {
        self.register(Some(Box::new(on_fulfilled)), None)
    }

    /// Registers a rejection handler; returns the chained promise.
    ///
    /// A fulfillment passes through to the chained promise unchanged.
    pub fn catch<F>(&self, on_rejected: F) -> Self
    where
        F: FnOnce(Value) -> Result<Value, Value> + Send + 'static,
    {
        self.register(None, Some(Box::new(on_rejected)))
    }

    /// Registers both handlers at once; returns the chained promise.
    pub fn then_catch<F, R>(&self, on_fulfilled: F, on_rejected: R) -> Self
    where
        F: FnOnce(Value) -> Result<Value, Value> + Send + 'static,
        R: FnOnce(Value) -> Result<Value, Value> + Send + 'static,
    {
        self.register(Some(Box::new(on_fulfilled)), Some(Box::new(on_rejected)))
    }

    fn register(&self, on_fulfilled: Option<Handler>, on_rejected: Option<Handler>) -> Self {
        let zone = Zone::current();
        let child = Self::pending_in(zone.clone());
        let mut reaction = Some(Reaction {
            on_fulfilled,
            on_rejected,
            child: child.clone(),
            zone,
        });

        let settled = {
            let mut inner = self.inner.lock();
            inner.handled = true;
            if inner.state.is_settled() {
                true
            } else {
                if let Some(r) = reaction.take() {
                    inner.reactions.push(r);
                }
                false
            }
        };
        if settled {
            if let Some(r) = reaction {
                self.schedule_reaction(r);
            }
        }
        child
    }

    /// Resolves with `value`; `from_adoption` permits the transition out
    /// of the `Resolving` state when an adopted promise settles.
    ///
    /// The state gate runs before the self-cycle check: a resolve call
    /// that would be ignored anyway must stay a no-op even when it
    /// carries the promise itself.
    pub(crate) fn resolve_with(&self, value: Value, from_adoption: bool) {
        enum Decision {
            Fulfill,
            Adopt(Promise),
            Cycle,
        }

        let decision = {
            let mut inner = self.inner.lock();
            let allowed = match inner.state {
                PromiseState::Pending => true,
                PromiseState::Resolving => from_adoption,
                _ => false,
            };
            if !allowed {
                return;
            }
            match &value {
                Value::Promise(target) if Self::ptr_eq(target, self) => Decision::Cycle,
                Value::Promise(target) => {
                    inner.state = PromiseState::Resolving;
                    Decision::Adopt(target.clone())
                }
                _ => Decision::Fulfill,
            }
        };

        match decision {
            Decision::Fulfill => self.settle(PromiseState::Fulfilled(value)),
            Decision::Adopt(target) => self.adopt(&target),
            Decision::Cycle => {
                let reason = Error::new(ErrorKind::ChainCycle)
                    .with_message("a promise cannot be resolved with itself");
                self.reject_with(Value::Error(ErrorValue::new(reason.to_string())), from_adoption);
            }
        }
    }

    /// Rejects with `reason`; `from_adoption` permits the transition out
    /// of the `Resolving` state.
    pub(crate) fn reject_with(&self, reason: Value, from_adoption: bool) {
        {
            let inner = self.inner.lock();
            let allowed = match inner.state {
                PromiseState::Pending => true,
                PromiseState::Resolving => from_adoption,
                _ => false,
            };
            if !allowed {
                return;
            }
        }
        self.settle(PromiseState::Rejected(reason));
    }

    /// Adopts the eventual state of `target` (a thenable).
    fn adopt(&self, target: &Self) {
        let outer_f = self.clone();
        let outer_r = self.clone();
        let _child = target.then_catch(
            move |value| {
                outer_f.resolve_with(value, true);
                Ok(Value::Unit)
            },
            move |reason| {
                outer_r.reject_with(reason, true);
                Ok(Value::Unit)
            },
        );
    }

    /// Commits a terminal state and fires queued reactions in
    /// registration order. Rejection also schedules the unhandled check.
    fn settle(&self, state: PromiseState) {
        debug_assert!(state.is_settled());
        let rejection;
        let reactions = {
            let mut inner = self.inner.lock();
            if inner.state.is_settled() {
                return;
            }
            rejection = match &state {
                PromiseState::Rejected(reason) => Some(reason.clone()),
                _ => None,
            };
            inner.state = state;
            std::mem::take(&mut inner.reactions)
        };

        trace!(
            settled = if rejection.is_some() { "rejected" } else { "fulfilled" },
            reactions = reactions.len(),
            "promise settled"
        );
        for reaction in reactions {
            self.schedule_reaction(reaction);
        }
        if let Some(reason) = rejection {
            self.schedule_unhandled_check(reason);
        }
    }

    /// Schedules one reaction as a task through its registration zone.
    fn schedule_reaction(&self, reaction: Reaction) {
        let outcome = {
            let inner = self.inner.lock();
            match &inner.state {
                PromiseState::Fulfilled(v) => Some((v.clone(), false)),
                PromiseState::Rejected(r) => Some((r.clone(), true)),
                _ => None,
            }
        };
        let Some((value, was_rejected)) = outcome else {
            return;
        };

        let Reaction {
            on_fulfilled,
            on_rejected,
            child,
            zone,
        } = reaction;

        let callback: TaskCallback = Box::new(move |_args| {
            let handler = if was_rejected {
                on_rejected
            } else {
                on_fulfilled
            };
            match handler {
                Some(handler) => match handler(value) {
                    Ok(v) => child.resolve_with(v, false),
                    Err(thrown) => child.reject_with(thrown, false),
                },
                // No matching handler: the original outcome propagates
                // unchanged.
                None if was_rejected => child.reject_with(value, false),
                None => child.resolve_with(value, false),
            }
            Ok(Value::Unit)
        });
        let task = Task::new(TaskKind::Microtask, "Promise.then", zone.clone(), None, callback);
        zone.schedule_task(task);
    }

    /// Schedules the deferred unhandled-rejection check.
    fn schedule_unhandled_check(&self, reason: Value) {
        let zone = Zone::current();
        let task_at_rejection = Zone::current_task();
        let promise = self.clone();
        let report_zone = zone.clone();

        let callback: TaskCallback = Box::new(move |_args| {
            let fire = {
                let mut inner = promise.inner.lock();
                if inner.handled || inner.reported {
                    false
                } else {
                    inner.reported = true;
                    true
                }
            };
            if fire {
                let report =
                    UncaughtError::from_rejection(reason, report_zone.clone(), task_at_rejection);
                report_zone.handle_error(&report);
            }
            Ok(Value::Unit)
        });
        let task = Task::new(
            TaskKind::Microtask,
            "Promise.rejectionCheck",
            zone.clone(),
            None,
            callback,
        );
        zone.schedule_rejection_check(task);
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_root;

    #[test]
    fn plain_resolution_settles_synchronously() {
        let (_, root) = test_root();
        root.run(|| {
            let p = Promise::new(|r| r.resolve("done"));
            assert_eq!(p.status(), PromiseStatus::Fulfilled);
            assert_eq!(p.result(), Some(Value::str("done")));
        });
    }

    #[test]
    fn settlement_is_permanent() {
        let (_, root) = test_root();
        root.run(|| {
            let mut captured = None;
            let p = Promise::new(|r| {
                captured = Some(r);
            });
            let r = captured.expect("executor ran");

            r.resolve("first");
            r.resolve("second");
            r.reject("late");
            assert_eq!(p.status(), PromiseStatus::Fulfilled);
            assert_eq!(p.result(), Some(Value::str("first")));
        });
    }

    #[test]
    fn reject_then_resolve_is_a_no_op() {
        let (host, root) = test_root();
        root.run(|| {
            let mut captured = None;
            let p = Promise::new(|r| captured = Some(r));
            let r = captured.expect("executor ran");

            r.reject("reason");
            r.resolve("too late");
            assert_eq!(p.status(), PromiseStatus::Rejected);
            assert_eq!(p.result(), Some(Value::str("reason")));

            // Keep the rejection from going uncaught in this test.
            let _ = p.catch(|_r| Ok(Value::Unit));
        });
        host.flush().expect("flush");
    }

    #[test]
    fn resolving_with_a_promise_adopts_its_state() {
        let (host, root) = test_root();
        root.run(|| {
            let mut captured = None;
            let inner = Promise::new(|r| captured = Some(r));
            let outer = Promise::new(|r| r.resolve(Value::Promise(inner)));
            assert_eq!(outer.status(), PromiseStatus::Resolving);

            captured.expect("executor ran").resolve("adopted");
            host.flush().expect("flush");
            assert_eq!(outer.status(), PromiseStatus::Fulfilled);
            assert_eq!(outer.result(), Some(Value::str("adopted")));
        });
    }

    #[test]
    fn resolving_with_itself_rejects_with_cycle_error() {
        let (host, root) = test_root();
        root.run(|| {
            let mut captured = None;
            let p = Promise::new(|r| captured = Some(r));
            let r = captured.expect("executor ran");

            r.resolve(Value::Promise(p.clone()));
            assert_eq!(p.status(), PromiseStatus::Rejected);
            let reason = p.result().expect("settled");
            let error = reason.as_error().expect("cycle error");
            assert_eq!(
                error.message(),
                Error::new(ErrorKind::ChainCycle)
                    .with_message("a promise cannot be resolved with itself")
                    .to_string()
            );

            let _ = p.catch(|_r| Ok(Value::Unit));
        });
        host.flush().expect("flush");
    }

    #[test]
    fn resolve_with_self_after_adoption_started_is_a_no_op() {
        let (host, root) = test_root();
        root.run(|| {
            let mut inner_r = None;
            let inner = Promise::new(|r| inner_r = Some(r));
            let mut outer_r = None;
            let outer = Promise::new(|r| outer_r = Some(r));
            let r = outer_r.expect("executor ran");

            r.resolve(Value::Promise(inner));
            assert_eq!(outer.status(), PromiseStatus::Resolving);

            // A second resolve carrying the promise itself is ignored
            // like any other post-resolution call; it must not reject
            // the mid-adoption promise.
            r.resolve(Value::Promise(outer.clone()));
            assert_eq!(outer.status(), PromiseStatus::Resolving);

            inner_r.expect("executor ran").resolve("adopted");
            host.flush().expect("flush");
            assert_eq!(outer.status(), PromiseStatus::Fulfilled);
            assert_eq!(outer.result(), Some(Value::str("adopted")));
        });
    }

    #[test]
    fn reactions_fire_in_registration_order() {
        let (host, root) = test_root();
        let order = Arc::new(Mutex::new(Vec::new()));
        root.run(|| {
            let mut captured = None;
            let p = Promise::new(|r| captured = Some(r));

            for label in ["a", "b", "c"] {
                let order = Arc::clone(&order);
                let _ = p.then(move |_v| {
                    order.lock().push(label);
                    Ok(Value::Unit)
                });
            }
            captured.expect("executor ran").resolve("go");
        });
        host.flush().expect("flush");
        assert_eq!(*order.lock(), vec!["a", "b", "c"]);
    }

    #[test]
    fn registration_zone_not_resolution_zone_schedules_the_reaction() {
        let (host, root) = test_root();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));

        let register_zone = root.fork(
            crate::zone::ZoneSpec::named("register").on_schedule_task({
                let seen = Arc::clone(&seen);
                move |forward, current, _target, task| {
                    seen.lock().push(current.name().to_owned());
                    forward.schedule_task(current, task)
                }
            }),
        );
        let resolve_zone = root.fork(crate::zone::ZoneSpec::named("resolve"));

        let mut captured = None;
        let p = root.run(|| Promise::new(|r| captured = Some(r)));
        register_zone.run(|| {
            let _ = p.then(|v| Ok(v));
        });
        resolve_zone.run(|| captured.expect("executor ran").resolve("x"));

        host.flush().expect("flush");
        assert_eq!(*seen.lock(), vec!["register".to_owned()]);
    }
}
