#![allow(clippy::unwrap_used, clippy::expect_used)]

use relstore_core::errors::{ExError, ExErrorKind, TupleError};
use relstore_core::logging_facility::test_capture::init_test_capture;
use relstore_core::{log_op_end, log_op_error, log_op_start, log_op_step};
use relstore_core_types::schema::{EVENT_END, EVENT_END_ERROR, EVENT_START};

#[test]
fn test_log_op_start_macro() {
    let capture = init_test_capture();
    let op_name = "test_log_op_start_unique_1";

    log_op_start!(op_name, store_id = "s1");

    let starts = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START)
    });
    assert_eq!(starts, 1);
}

#[test]
fn test_log_op_end_records_duration() {
    let capture = init_test_capture();
    let op_name = "test_log_op_end_unique_2";

    log_op_end!(op_name, duration_ms = 42u64, rows_len = 7usize);

    let events = capture.events();
    let end = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END))
        .expect("end event");
    assert_eq!(end.field("duration_ms"), Some("42"));
    assert_eq!(end.field("rows_len"), Some("7"));
}

#[test]
fn test_log_op_error_flattens_kind_and_code() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_unique_3";

    let err = ExError::new(ExErrorKind::WriteConflictOnDelete).with_store_id("s1");
    log_op_error!(op_name, err, duration_ms = 3u64);

    let events = capture.events();
    let error_event = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END_ERROR))
        .expect("error event");
    assert_eq!(error_event.field("err_code"), Some("ERR_WRITE_CONFLICT_ON_DELETE"));
    assert_eq!(error_event.field("err_kind"), Some("WriteConflictOnDelete"));
}

#[test]
fn test_log_op_error_accepts_domain_error() {
    let capture = init_test_capture();
    let op_name = "test_log_op_error_domain_unique_4";

    let err = TupleError::ExceedsMaxTuplesPerWrite {
        count: 101,
        limit: 100,
    };
    log_op_error!(op_name, err, duration_ms = 1u64);

    let code = capture
        .events()
        .into_iter()
        .find(|e| e.op.as_deref() == Some(op_name))
        .and_then(|e| e.field("err_code").map(str::to_string));
    assert_eq!(code.as_deref(), Some("ERR_INVALID_INPUT"));
}

#[test]
fn test_step_events_are_debug_level() {
    let capture = init_test_capture();
    let op_name = "test_step_unique_5";

    log_op_step!(op_name, "locked", lock_keys_len = 3usize, batches = 1usize);

    let events = capture.events();
    let step = events
        .iter()
        .find(|e| e.op.as_deref() == Some(op_name))
        .expect("step event");
    assert_eq!(step.level, tracing::Level::DEBUG);
    assert_eq!(step.event.as_deref(), Some("locked"));
    assert_eq!(step.field("batches"), Some("1"));
}

#[test]
fn test_single_start_and_end_per_operation() {
    let capture = init_test_capture();
    let op_name = "test_boundary_unique_6";

    log_op_start!(op_name);
    log_op_end!(op_name, duration_ms = 1u64);

    let starts = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_START)
    });
    let ends = capture.count_events(|e| {
        e.op.as_deref() == Some(op_name) && e.event.as_deref() == Some(EVENT_END)
    });
    assert_eq!((starts, ends), (1, 1));
}

#[test]
#[should_panic(expected = "Expected event")]
fn test_assert_event_exists_fails_for_unknown_op() {
    let capture = init_test_capture();
    capture.assert_event_exists("nonexistent_op_truly_unique_999", EVENT_START);
}
