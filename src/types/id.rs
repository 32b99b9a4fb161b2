//! Identifier types for zones and tasks.
//!
//! These types provide type-safe diagnostic identifiers for the two core
//! entities of the crate: zones and tasks. Identifiers are allocated from
//! process-wide atomic counters and are never reused.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ZONE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for a zone.
///
/// Zones form a tree structure; the identifier is diagnostic only and
/// carries no ordering meaning beyond allocation order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(u64);

impl ZoneId {
    /// Allocates the next zone identifier.
    pub(crate) fn next() -> Self {
        Self(NEXT_ZONE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Creates a zone ID for testing purposes.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZoneId({})", self.0)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Z{}", self.0)
    }
}

/// A unique identifier for a task record.
///
/// Tasks are single units of asynchronous work flowing through the
/// interception pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocates the next task identifier.
    pub(crate) fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Creates a task ID for testing purposes.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_ids_are_unique_and_increasing() {
        let a = ZoneId::next();
        let b = ZoneId::next();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn task_ids_are_unique() {
        let a = TaskId::next();
        let b = TaskId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn display_forms_are_short() {
        assert_eq!(ZoneId::new_for_test(7).to_string(), "Z7");
        assert_eq!(TaskId::new_for_test(42).to_string(), "T42");
    }
}
