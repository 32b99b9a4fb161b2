//! Zones: a rooted tree of execution contexts with interception hooks.
//!
//! A [`Zone`] carries inheritable hooks and properties. Code runs inside
//! a zone via [`Zone::run`]; every asynchronous operation scheduled from
//! inside passes through the zone's delegate chain, and its continuation
//! later executes with the originating zone restored as current.
//!
//! # Module Contents
//!
//! - [`Zone`]: the context node and its fork/run/lookup API
//! - [`ZoneSpec`]: the fork configuration (hooks and properties)
//! - [`delegate`]: hook dispatch, forward handles, and [`invoke_task`]
//! - `current`: the thread-local call-stack shadow (internal)

pub mod delegate;
pub mod spec;
pub mod zone;

pub(crate) mod current;

pub use delegate::{
    invoke_task, CancelForward, HandleErrorForward, InvokeForward, ScheduleForward,
};
pub use spec::{CancelHook, HandleErrorHook, InvokeHook, ScheduleHook, ZoneSpec};
pub use zone::Zone;
