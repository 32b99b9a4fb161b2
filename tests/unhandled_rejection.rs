//! Uncaught-rejection reporting: timing, first-check-wins, hook
//! interception, and the report shape.

use std::sync::Arc;

use parking_lot::Mutex;

use zonal::test_utils::{init_test_logging, test_root};
use zonal::{ErrorValue, Promise, Value, ZoneSpec};

#[test]
fn rejection_with_no_handler_is_reported_once() {
    init_test_logging();
    let (host, root) = test_root();

    root.run(|| {
        let _p = Promise::rejected("boom");
    });

    host.flush().expect("flush");
    let reports = host.take_uncaught_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].message, "Uncaught (in promise): boom");
    assert_eq!(reports[0].rejection, Some(Value::str("boom")));

    // The check never re-fires.
    host.flush().expect("flush");
    assert!(host.take_uncaught_reports().is_empty());
}

#[test]
fn report_appends_the_stack_when_the_reason_carries_one() {
    let (host, root) = test_root();

    root.run(|| {
        let reason = Value::Error(ErrorValue::new("exploded").with_stack("at main.rs:1"));
        let _p = Promise::rejected(reason);
    });

    host.flush().expect("flush");
    let reports = host.take_uncaught_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].message,
        "Uncaught (in promise): exploded\nat main.rs:1"
    );
}

#[test]
fn handler_attached_before_the_check_suppresses_the_report() {
    let (host, root) = test_root();

    root.run(|| {
        let p = Promise::rejected("handled");
        let _ = p.catch(|_reason| Ok(Value::Unit));
    });

    host.flush().expect("flush");
    assert!(host.uncaught_reports().is_empty());
}

#[test]
fn handler_attached_after_the_check_does_not_retract_the_report() {
    let (host, root) = test_root();

    let p = root.run(|| Promise::rejected("too late"));
    host.flush().expect("flush");
    assert_eq!(host.uncaught_reports().len(), 1);

    let seen = Arc::new(Mutex::new(None));
    root.run(|| {
        let seen = Arc::clone(&seen);
        let _ = p.catch(move |reason| {
            *seen.lock() = Some(reason);
            Ok(Value::Unit)
        });
    });
    host.flush().expect("flush");

    // The late handler still runs, but the report stands.
    assert_eq!(*seen.lock(), Some(Value::str("too late")));
    assert_eq!(host.uncaught_reports().len(), 1);
}

#[test]
fn fulfillment_only_link_moves_the_report_downstream() {
    let (host, root) = test_root();

    let child = root.run(|| {
        // `then` forwards the rejection to its chained promise; the
        // report belongs to the end of the chain.
        Promise::rejected("passed along").then(|v| Ok(v))
    });

    host.flush().expect("flush");
    let reports = host.take_uncaught_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].rejection, Some(Value::str("passed along")));
    assert_eq!(child.result(), Some(Value::str("passed along")));
}

#[test]
fn handle_error_hook_intercepts_the_report() {
    let (host, root) = test_root();
    let intercepted = Arc::new(Mutex::new(Vec::<String>::new()));

    let zone = root.fork(ZoneSpec::named("interceptor").on_handle_error({
        let intercepted = Arc::clone(&intercepted);
        move |_forward, _current, _target, error| {
            intercepted.lock().push(error.message.clone());
            // Handled here; never forwarded to the host sink.
            true
        }
    }));

    zone.run(|| {
        let _p = Promise::rejected("captured");
    });

    host.flush().expect("flush");
    assert_eq!(*intercepted.lock(), vec!["Uncaught (in promise): captured".to_owned()]);
    assert!(host.uncaught_reports().is_empty());
}

#[test]
fn handle_error_hook_can_observe_and_forward() {
    let (host, root) = test_root();
    let observed = Arc::new(Mutex::new(0usize));

    let zone = root.fork(ZoneSpec::named("observer").on_handle_error({
        let observed = Arc::clone(&observed);
        move |forward, current, _target, error| {
            *observed.lock() += 1;
            forward.handle_error(current, error)
        }
    }));

    zone.run(|| {
        let _p = Promise::rejected("passed through");
    });

    host.flush().expect("flush");
    assert_eq!(*observed.lock(), 1);
    assert_eq!(host.uncaught_reports().len(), 1);
}

#[test]
fn report_carries_the_rejection_zone() {
    let (host, root) = test_root();
    let zone = root.fork(ZoneSpec::named("origin"));

    zone.run(|| {
        let _p = Promise::rejected("where am I");
    });

    host.flush().expect("flush");
    let reports = host.take_uncaught_reports();
    assert_eq!(reports.len(), 1);
    let report_zone = reports[0].zone.as_ref().expect("zone recorded");
    assert_eq!(report_zone.name(), "origin");

    let snapshot = reports[0].snapshot();
    let json = serde_json::to_string(&snapshot).expect("serialize");
    assert!(json.contains("Uncaught (in promise): where am I"));
    assert!(json.contains("origin"));
}
