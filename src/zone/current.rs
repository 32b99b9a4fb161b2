//! The call-stack shadow tracking the current zone and task.
//!
//! "Current" is not an ambient mutable global: it is a thread-local stack
//! mutated only through scoped guards, so the previous entry is restored
//! on every exit path, including panics.

use std::cell::RefCell;

use crate::task::Task;
use crate::zone::Zone;

thread_local! {
    static CURRENT_ZONES: RefCell<Vec<Zone>> = const { RefCell::new(Vec::new()) };
    static CURRENT_TASKS: RefCell<Vec<Task>> = const { RefCell::new(Vec::new()) };
}

/// Scoped entry into a zone; pops the stack on drop.
pub(crate) struct ZoneGuard {
    _priv: (),
}

impl ZoneGuard {
    pub(crate) fn enter(zone: Zone) -> Self {
        CURRENT_ZONES.with(|stack| stack.borrow_mut().push(zone));
        Self { _priv: () }
    }
}

impl Drop for ZoneGuard {
    fn drop(&mut self) {
        CURRENT_ZONES.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Scoped entry into a task invocation; pops the stack on drop.
pub(crate) struct TaskGuard {
    _priv: (),
}

impl TaskGuard {
    pub(crate) fn enter(task: Task) -> Self {
        CURRENT_TASKS.with(|stack| stack.borrow_mut().push(task));
        Self { _priv: () }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        CURRENT_TASKS.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// The innermost entered zone on this thread, if any.
pub(crate) fn current_zone() -> Option<Zone> {
    CURRENT_ZONES.with(|stack| stack.borrow().last().cloned())
}

/// The innermost running task on this thread, if any.
pub(crate) fn current_task() -> Option<Task> {
    CURRENT_TASKS.with(|stack| stack.borrow().last().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_root;
    use crate::zone::ZoneSpec;

    #[test]
    fn guard_restores_previous_zone() {
        let (_, root) = test_root();
        let child = root.fork(ZoneSpec::named("child"));

        let outer = ZoneGuard::enter(root.clone());
        assert_eq!(current_zone(), Some(root.clone()));
        {
            let _inner = ZoneGuard::enter(child.clone());
            assert_eq!(current_zone(), Some(child));
        }
        assert_eq!(current_zone(), Some(root));
        drop(outer);
        assert_eq!(current_zone(), None);
    }

    #[test]
    fn guard_restores_on_panic() {
        let (_, root) = test_root();
        let child = root.fork(ZoneSpec::named("panicky"));

        let _outer = ZoneGuard::enter(root.clone());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _inner = ZoneGuard::enter(child);
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(current_zone(), Some(root));
    }
}
