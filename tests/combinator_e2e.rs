//! Aggregate combinators over mixed promise and plain inputs.

use zonal::test_utils::{init_test_logging, test_root};
use zonal::{Promise, PromiseStatus, Value};

#[test]
fn all_with_mixed_inputs_fulfills_in_input_order() {
    init_test_logging();
    let (host, root) = test_root();

    let combined = root.run(|| {
        Promise::all(vec![
            Value::Promise(Promise::resolved("P1 value")),
            Value::str("v1"),
        ])
    });

    host.flush().expect("flush");
    assert_eq!(combined.status(), PromiseStatus::Fulfilled);
    assert_eq!(
        combined.result(),
        Some(Value::List(vec![Value::str("P1 value"), Value::str("v1")]))
    );
}

#[test]
fn all_rejects_as_soon_as_any_input_rejects() {
    let (host, root) = test_root();

    let combined = root.run(|| {
        let combined = Promise::all(vec![
            Value::Promise(Promise::rejected("rejected value")),
            Value::str("v1"),
        ]);
        let _ = combined.catch(|r| Ok(r));
        combined
    });

    host.flush().expect("flush");
    assert_eq!(combined.status(), PromiseStatus::Rejected);
    assert_eq!(combined.result(), Some(Value::str("rejected value")));
    assert!(host.uncaught_reports().is_empty());
}

#[test]
fn all_waits_for_every_input_before_fulfilling() {
    let (host, root) = test_root();

    let (combined, gate) = root.run(|| {
        let mut captured = None;
        let slow = Promise::new(|r| captured = Some(r));
        let combined = Promise::all(vec![Value::Promise(slow), Value::Int(9)]);
        (combined, captured.expect("executor ran"))
    });

    host.flush().expect("flush");
    assert_eq!(combined.status(), PromiseStatus::Pending);

    root.run(|| gate.resolve("finally"));
    host.flush().expect("flush");
    assert_eq!(
        combined.result(),
        Some(Value::List(vec![Value::str("finally"), Value::Int(9)]))
    );
}

#[test]
fn race_settles_with_the_first_observed_settlement() {
    let (host, root) = test_root();

    let winner = root.run(|| {
        Promise::race(vec![
            Value::Promise(Promise::resolved("fast")),
            Value::str("lifted"),
        ])
    });

    host.flush().expect("flush");
    assert_eq!(winner.status(), PromiseStatus::Fulfilled);
    assert_eq!(winner.result(), Some(Value::str("fast")));
}

#[test]
fn race_rejects_when_the_rejection_is_observed_first() {
    let (host, root) = test_root();

    let winner = root.run(|| {
        let winner = Promise::race(vec![
            Value::Promise(Promise::rejected("r1")),
            Value::str("v1"),
        ]);
        let _ = winner.catch(|r| Ok(r));
        winner
    });

    host.flush().expect("flush");
    assert_eq!(winner.status(), PromiseStatus::Rejected);
    assert_eq!(winner.result(), Some(Value::str("r1")));
    assert!(host.uncaught_reports().is_empty());
}
