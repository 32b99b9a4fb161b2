//! Aggregate combinators over deferred values.
//!
//! Both combinators lift plain inputs to resolved promises before
//! attaching reactions, so settlement order is decided by the task
//! queue in registration order, never by a synchronous shortcut.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::Value;
use crate::zone::Zone;

use super::Promise;

struct AllState {
    slots: Vec<Option<Value>>,
    remaining: usize,
}

impl Promise {
    /// Settles with the ordered list of all inputs' values once every
    /// input fulfills, or rejects with the first rejection reason.
    ///
    /// An empty input list fulfills immediately with an empty list.
    #[must_use]
    pub fn all(inputs: Vec<Value>) -> Self {
        let result = Self::pending_in(Zone::current());
        let count = inputs.len();
        if count == 0 {
            result.resolve_with(Value::List(Vec::new()), false);
            return result;
        }

        let state = Arc::new(Mutex::new(AllState {
            slots: vec![None; count],
            remaining: count,
        }));

        for (index, input) in inputs.into_iter().enumerate() {
            let state = Arc::clone(&state);
            let on_fulfilled_result = result.clone();
            let on_rejected_result = result.clone();
            let _ = Self::lift(input).then_catch(
                move |value| {
                    let finished = {
                        let mut st = state.lock();
                        st.slots[index] = Some(value);
                        st.remaining -= 1;
                        if st.remaining == 0 {
                            let values = st
                                .slots
                                .iter_mut()
                                .map(|slot| slot.take().unwrap_or_default())
                                .collect();
                            Some(Value::List(values))
                        } else {
                            None
                        }
                    };
                    if let Some(list) = finished {
                        on_fulfilled_result.resolve_with(list, false);
                    }
                    Ok(Value::Unit)
                },
                move |reason| {
                    // First rejection wins; later calls are no-ops.
                    on_rejected_result.reject_with(reason, false);
                    Ok(Value::Unit)
                },
            );
        }
        result
    }

    /// Settles with the first input to settle, fulfilled or rejected,
    /// ignoring every later settlement.
    ///
    /// An empty input list never settles.
    #[must_use]
    pub fn race(inputs: Vec<Value>) -> Self {
        let result = Self::pending_in(Zone::current());
        for input in inputs {
            let on_fulfilled_result = result.clone();
            let on_rejected_result = result.clone();
            let _ = Self::lift(input).then_catch(
                move |value| {
                    on_fulfilled_result.resolve_with(value, false);
                    Ok(Value::Unit)
                },
                move |reason| {
                    on_rejected_result.reject_with(reason, false);
                    Ok(Value::Unit)
                },
            );
        }
        result
    }

    /// Lifts a plain value to a resolved promise; passes promise values
    /// through unchanged.
    fn lift(input: Value) -> Self {
        match input {
            Value::Promise(p) => p,
            other => Self::resolved(other),
        }
    }
}
