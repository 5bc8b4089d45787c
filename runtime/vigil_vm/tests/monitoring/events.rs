use pretty_assertions::assert_eq;
use vigil_monitor::{Event, EventSet, ToolId};
use vigil_vm::Value;

use crate::common::{monitoring, run, Recorder};

#[test]
fn test_py_start_fires_once_per_frame() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::DEBUGGER, EventSet::PY_START);

    run(&mon, "f1").unwrap();
    assert_eq!(rec.count(Event::PyStart), 1);
}

#[test]
fn test_native_calls_report_call_and_c_return() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::PROFILER, EventSet::CALL);

    run(&mon, "f2").unwrap();
    assert_eq!(rec.details(Event::Call), vec!["len []", "sizeof 0"]);
    assert_eq!(rec.details(Event::CReturn), vec!["len []", "sizeof 0"]);
    assert_eq!(rec.count(Event::CRaise), 0);
}

#[test]
fn test_call_argument_is_live() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::PROFILER, EventSet::CALL);

    run(&mon, "c_call").unwrap();
    // append mutates the list between CALL and C_RETURN.
    assert_eq!(
        rec.lines(),
        vec!["CALL c_call append []", "C_RETURN c_call append [2]"]
    );
}

#[test]
fn test_nested_call_sequence() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(
        &mon,
        ToolId::DEBUGGER,
        EventSet::PY_START | EventSet::PY_RETURN | EventSet::CALL | EventSet::LINE,
    );

    assert_eq!(run(&mon, "nested_call"), Ok(Value::None));
    assert_eq!(
        rec.lines(),
        vec![
            "PY_START nested_call",
            "LINE nested_call 1",
            "CALL nested_call just_pass MISSING",
            "PY_START just_pass",
            "LINE just_pass 1",
            "PY_RETURN just_pass None",
            "PY_RETURN nested_call None",
        ]
    );
}

#[test]
fn test_generator_frame_events() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(
        &mon,
        ToolId::DEBUGGER,
        EventSet::FRAME_ENTRY | EventSet::PY_RETURN | EventSet::PY_YIELD,
    );

    run(&mon, "g1").unwrap();
    assert_eq!(
        rec.lines(),
        vec![
            "PY_START g1",
            "PY_START gen",
            "PY_YIELD gen None",
            "PY_RESUME gen",
            "PY_YIELD gen None",
            "PY_RESUME gen",
            "PY_RETURN gen None",
            "PY_RETURN g1 None",
        ]
    );
}

#[test]
fn test_instruction_follows_line() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::DEBUGGER, EventSet::LINE | EventSet::INSTRUCTION);

    run(&mon, "just_pass").unwrap();
    assert_eq!(
        rec.lines(),
        vec![
            "LINE just_pass 1",
            "INSTRUCTION just_pass 0",
            "INSTRUCTION just_pass 2",
        ]
    );
}

#[test]
fn test_frame_events_balance() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(
        &mon,
        ToolId::PROFILER,
        EventSet::FRAME_ENTRY | EventSet::FRAME_EXIT | EventSet::CALL,
    );

    assert_eq!(run(&mon, "mixed"), Ok(Value::None));

    let mut depth = 0_i32;
    for record in rec.records() {
        match record.event {
            Event::PyStart | Event::PyResume => depth += 1,
            Event::PyReturn | Event::PyYield | Event::PyUnwind => depth -= 1,
            _ => {}
        }
        assert!(depth >= 0, "frame exit without entry at {record}");
    }
    assert_eq!(depth, 0);
    assert_eq!(rec.count(Event::PyStart) + rec.count(Event::PyResume), 11);
    assert_eq!(rec.count(Event::PyUnwind), 1);
    assert_eq!(rec.count(Event::Call), 10);
    assert_eq!(rec.count(Event::CReturn), 1);
    assert_eq!(rec.count(Event::CRaise), 1);
}

#[test]
fn test_no_events_without_tools() {
    let mon = monitoring();
    assert_eq!(run(&mon, "mixed"), Ok(Value::None));
    assert_eq!(mon.disabled_count(), 0);
    assert!(mon.all_events().is_empty());
}
