//! Zonal: zone-based context propagation and task interception.
//!
//! # Overview
//!
//! Zonal provides a rooted tree of execution contexts ("zones") that can
//! be forked with custom behavior hooks, intercept every asynchronous
//! operation scheduled by code running inside them, and re-associate the
//! originating context with each continuation, so nested asynchronous
//! chains stay observable and controllable by outer tooling.
//!
//! On top of the zone machinery sits a zone-aware deferred value: a
//! [`Promise`] whose continuation scheduling and uncaught-rejection
//! reporting are routed through the active zone's hooks rather than
//! handed directly to a host scheduler.
//!
//! # Core Guarantees
//!
//! - **Explicit context**: "current zone" is a call-stack shadow restored
//!   on every exit path, never an ambient mutable global
//! - **Monotonic task lifecycle**: created → scheduled → running →
//!   completed, with cancellation only before running; re-invoking a
//!   terminal task is a synchronous error
//! - **Chain termination**: every forwarded hook chain reaches a built-in
//!   terminal performing the host-level effect
//! - **One report per rejection**: an unhandled rejection is reported
//!   exactly once, with first-check-wins semantics
//! - **Deterministic testing**: the host is an explicit collaborator; the
//!   bundled [`FlushHost`] is a manually flushed queue
//!
//! # Module Structure
//!
//! - [`types`]: identifiers and the dynamic value model
//! - [`task`]: task records and their state machine
//! - [`zone`]: the context tree, fork specs, and the delegate chain
//! - [`host`]: the host trait and the flushable test queue
//! - [`promise`]: the zone-aware deferred value and its combinators
//! - [`error`]: error types and the uncaught-error report
//! - [`test_utils`]: shared test helpers
//!
//! # Example
//!
//! ```
//! use zonal::{Promise, Value, ZoneSpec};
//! use zonal::test_utils::test_root;
//!
//! let (host, root) = test_root();
//! let zone = root.fork(ZoneSpec::named("app"));
//!
//! let p = zone.run(|| {
//!     Promise::new(|r| r.resolve("ready")).then(|v| {
//!         assert_eq!(v, Value::str("ready"));
//!         Ok(Value::str("done"))
//!     })
//! });
//!
//! host.flush().expect("flush");
//! assert_eq!(p.result(), Some(Value::str("done")));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]

pub mod error;
pub mod host;
pub mod promise;
pub mod task;
pub mod test_utils;
pub mod types;
pub mod zone;

pub use error::{Error, ErrorCategory, ErrorKind, HostError, UncaughtError, UncaughtSnapshot};
pub use host::{FlushHost, HostConfig, ZoneHost};
pub use promise::{Handler, Promise, PromiseStatus, Resolver};
pub use task::{Task, TaskCallback, TaskKind, TaskState};
pub use types::{ErrorValue, TaskId, Value, ZoneId};
pub use zone::{
    invoke_task, CancelForward, CancelHook, HandleErrorForward, HandleErrorHook, InvokeForward,
    InvokeHook, ScheduleForward, ScheduleHook, Zone, ZoneSpec,
};
