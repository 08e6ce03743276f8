/// Type-based matching, reached through types or a `message` option.
use std::panic::{self, AssertUnwindSafe};

use pretty_assertions::assert_eq;
use raisin::{
    Capture, CaptureState, ComparatorRegistry, Dispatcher, Expected, ExceptionType, Raises, RaisesOptions,
    builtins::{IndexError, KeyError, LookupError, ValueError},
    raises, raises_with,
};

fn failure_message(f: impl FnOnce()) -> String {
    let payload = panic::catch_unwind(AssertUnwindSafe(f)).expect_err("the assertion should fail");
    payload.downcast_ref::<String>().cloned().unwrap_or_default()
}

#[test]
fn type_accepts_subclasses() {
    let info = raises(ExceptionType::of::<LookupError>())
        .run(|| Err::<(), _>(KeyError::new("missing")))
        .unwrap();
    assert_eq!(info.type_name(), Some("KeyError"));
}

#[test]
fn tuple_of_types_accepts_any_of_them() {
    let expected = || Expected::types([ExceptionType::of::<KeyError>(), ExceptionType::of::<ValueError>()]);
    raises(expected()).run(|| Err::<(), _>(ValueError::new("v"))).unwrap();
    raises(expected()).run(|| Err::<(), _>(KeyError::new("k"))).unwrap();
    let raised = raises(expected()).run(|| Err::<(), _>(IndexError::new("i"))).unwrap_err();
    assert!(raised.downcast_ref::<IndexError>().is_some());
}

#[test]
fn type_not_raised_names_the_class() {
    let message = failure_message(|| {
        let _ = raises(ExceptionType::of::<KeyError>()).run(|| ());
    });
    assert_eq!(message, "DID NOT RAISE <class 'KeyError'>");
}

/// With a `message` option an instance is only checked by type, so values are not compared.
#[test]
fn message_option_falls_back_to_type_matching() {
    raises_with(LookupError::new("expected"), RaisesOptions::new().message("custom"))
        .run(|| Err::<(), _>(IndexError::new("something else")))
        .unwrap();

    let message = failure_message(|| {
        let _ = raises_with(LookupError::new("expected"), RaisesOptions::new().message("custom")).run(|| ());
    });
    assert_eq!(message, "custom");
}

#[test]
fn type_pattern_uses_the_same_search() {
    let err = raises_with(ExceptionType::of::<ValueError>(), RaisesOptions::new().matching(r"^\d+$"))
        .try_run(|| Err::<(), _>(ValueError::new("abc")))
        .unwrap_err();
    assert_eq!(err.to_string(), r"Regex pattern '^\\d+$' does not match 'abc'.");
}

/// A harness drives the capture itself through enter and exit.
#[test]
fn manual_lifecycle_through_dispatcher() {
    let dispatcher = Dispatcher::new(ComparatorRegistry::new());
    let mut capture = dispatcher.raises(IndexError::new("x"));
    assert!(matches!(capture, Raises::Instance(_)));
    let info = capture.enter().unwrap();
    let exit = capture.exit(None);
    assert!(exit.is_err());
    assert_eq!(capture.state(), CaptureState::Failed);
    assert!(!info.is_filled());
}
