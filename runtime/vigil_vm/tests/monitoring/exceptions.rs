use std::sync::Arc;

use pretty_assertions::assert_eq;
use vigil_monitor::{Callback, Event, EventSet, ToolId};
use vigil_vm::{Exception, ExceptionKind, Value};

use crate::common::{arm, monitoring, run, Recorder};

const EXCEPTION_EVENTS: EventSet = EventSet::RAISE
    .union(EventSet::EXCEPTION_HANDLED)
    .union(EventSet::PY_UNWIND);

#[test]
fn test_handled_exception() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(
        &mon,
        ToolId::DEBUGGER,
        EXCEPTION_EVENTS | EventSet::PY_RETURN,
    );

    assert_eq!(run(&mon, "caught"), Ok(Value::None));
    assert_eq!(
        rec.lines(),
        vec![
            r#"RAISE caught ZeroDivisionError("integer division or modulo by zero")"#,
            r#"EXCEPTION_HANDLED caught ZeroDivisionError("integer division or modulo by zero")"#,
            "PY_RETURN caught None",
        ]
    );
}

#[test]
fn test_unhandled_exception_unwinds() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::DEBUGGER, EXCEPTION_EVENTS | EventSet::PY_RETURN);

    let err = run(&mon, "just_raise").unwrap_err();
    assert_eq!(err.kind, ExceptionKind::Exception);
    assert_eq!(
        rec.lines(),
        vec![
            r#"RAISE just_raise Exception("")"#,
            r#"PY_UNWIND just_raise Exception("")"#,
        ]
    );
}

#[test]
fn test_exception_propagates_through_caller() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::DEBUGGER, EXCEPTION_EVENTS);

    run(&mon, "mixed").unwrap();
    let unwound: Vec<_> = rec
        .records()
        .into_iter()
        .filter(|r| r.detail == r#"Exception("")"#)
        .map(|r| format!("{} {}", r.event, r.code))
        .collect();
    assert_eq!(
        unwound,
        vec![
            "RAISE just_raise",
            "PY_UNWIND just_raise",
            "RAISE mixed",
            "EXCEPTION_HANDLED mixed",
        ]
    );
}

#[test]
fn test_native_failure_reports_c_raise() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::DEBUGGER, EventSet::CALL | EXCEPTION_EVENTS);

    assert_eq!(run(&mon, "c_raise"), Ok(Value::None));
    assert_eq!(
        rec.lines(),
        vec![
            "CALL c_raise len 1",
            "C_RAISE c_raise len 1",
            r#"RAISE c_raise TypeError("object of type 'int' has no len()")"#,
            r#"EXCEPTION_HANDLED c_raise TypeError("object of type 'int' has no len()")"#,
        ]
    );
}

#[test]
fn test_generator_return_reports_stop_iteration() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::DEBUGGER, EventSet::STOP_ITERATION);

    run(&mon, "implicit_stop_iteration").unwrap();
    assert_eq!(
        rec.lines(),
        vec![r#"STOP_ITERATION implicit_stop_iteration StopIteration("2")"#]
    );

    rec.clear();
    run(&mon, "g1").unwrap();
    assert_eq!(rec.lines(), vec![r#"STOP_ITERATION g1 StopIteration("")"#]);
}

fn fault(message: &str) -> Exception {
    Exception::new(ExceptionKind::ValueError, message)
}

#[test]
fn test_raise_callback_fault_replaces_exception() {
    let mon = monitoring();
    arm(&mon, ToolId::DEBUGGER, EventSet::RAISE);
    mon.register_callback(
        ToolId::DEBUGGER,
        Event::Raise,
        Some(Callback::exception(|_| Err(fault("from tool")))),
    )
    .unwrap();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::PROFILER, EventSet::PY_UNWIND);

    let err = run(&mon, "just_raise").unwrap_err();
    assert_eq!(err, fault("from tool"));
    assert_eq!(
        rec.lines(),
        vec![r#"PY_UNWIND just_raise ValueError("from tool")"#]
    );
}

#[test]
fn test_line_callback_fault_is_catchable() {
    let mon = monitoring();
    arm(&mon, ToolId::DEBUGGER, EventSet::LINE);
    mon.register_callback(
        ToolId::DEBUGGER,
        Event::Line,
        Some(Callback::line(|e| {
            if e.line == 602 {
                Err(fault("stop here"))
            } else {
                Ok(vigil_monitor::Action::Continue)
            }
        })),
    )
    .unwrap();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::PROFILER, EventSet::EXCEPTION_HANDLED);

    // The fault is raised at the first statement of the try block.
    assert_eq!(run(&mon, "try_except"), Ok(Value::None));
    assert_eq!(
        rec.lines(),
        vec![r#"EXCEPTION_HANDLED try_except ValueError("stop here")"#]
    );
}

#[test]
fn test_c_raise_fault_escapes_narrow_handler() {
    let mon = monitoring();
    arm(&mon, ToolId::DEBUGGER, EventSet::CALL);
    mon.register_callback(
        ToolId::DEBUGGER,
        Event::CRaise,
        Some(Callback::call(|_| {
            Err(Exception::new(ExceptionKind::KeyError, "replaced"))
        })),
    )
    .unwrap();

    // `except TypeError` does not match the replacement.
    let err = run(&mon, "c_raise").unwrap_err();
    assert_eq!(err.kind, ExceptionKind::KeyError);
}

#[test]
fn test_py_start_fault_unwinds_the_frame() {
    let mon = monitoring();
    arm(&mon, ToolId::DEBUGGER, EventSet::PY_START);
    let target = Arc::new(parking_lot::Mutex::new(String::new()));
    let seen = Arc::clone(&target);
    mon.register_callback(
        ToolId::DEBUGGER,
        Event::PyStart,
        Some(Callback::code(move |e| {
            if e.code.name() == "just_pass" {
                *seen.lock() = e.code.name().to_string();
                return Err(fault("no entry"));
            }
            Ok(vigil_monitor::Action::Continue)
        })),
    )
    .unwrap();

    let err = run(&mon, "nested_call").unwrap_err();
    assert_eq!(err, fault("no entry"));
    assert_eq!(*target.lock(), "just_pass");
}
