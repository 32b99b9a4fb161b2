//! Core types shared across the crate.
//!
//! This module contains the identifier types and the dynamic value model:
//!
//! - [`ZoneId`], [`TaskId`]: diagnostic identifiers
//! - [`Value`], [`ErrorValue`]: the dynamic value model flowing through
//!   tasks and deferred values

pub mod id;
pub mod value;

pub use id::{TaskId, ZoneId};
pub use value::{ErrorValue, Value};
