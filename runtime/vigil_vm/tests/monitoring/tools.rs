use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use vigil_monitor::{Action, Callback, Event, EventSet, ToolId, DISABLE};
use vigil_vm::{samples, Exception, ExceptionKind, Value, Vm};

use crate::common::{arm, counter, hits, monitoring, run, Recorder};

#[test]
fn test_tools_are_called_in_slot_order() {
    let mon = monitoring();
    let log = Arc::new(Mutex::new(Vec::new()));
    for tool in [ToolId::PROFILER, ToolId::DEBUGGER] {
        arm(&mon, tool, EventSet::LINE);
        let log = Arc::clone(&log);
        mon.register_callback(
            tool,
            Event::Line,
            Some(Callback::line(move |e| {
                log.lock().push((tool.slot(), e.line - e.code.first_line()));
                Ok(Action::Continue)
            })),
        )
        .unwrap();
    }

    run(&mon, "floop").unwrap();
    assert_eq!(
        *log.lock(),
        vec![(0, 1), (2, 1), (0, 2), (2, 2), (0, 2), (2, 2), (0, 1), (2, 1)]
    );
}

#[test]
fn test_each_tool_sees_only_its_own_events() {
    let mon = monitoring();
    let calls = Recorder::new();
    calls.install(&mon, ToolId::PROFILER, EventSet::CALL);
    let lines = Recorder::new();
    lines.install(&mon, ToolId::COVERAGE, EventSet::LINE);
    // A callback for an event the tool never armed stays silent.
    let (returns, returned) = counter(Event::CReturn);
    mon.register_callback(ToolId::COVERAGE, Event::CReturn, Some(returns))
        .unwrap();

    run(&mon, "f2").unwrap();
    assert_eq!(calls.count(Event::Call), 2);
    assert_eq!(calls.count(Event::Line), 0);
    assert_eq!(lines.details(Event::Line), vec!["1", "2"]);
    assert_eq!(hits(&returned), 0);
}

#[test]
fn test_armed_event_without_callback_is_silent() {
    let mon = monitoring();
    arm(&mon, ToolId::DEBUGGER, EventSet::LINE | EventSet::CALL);
    assert_eq!(run(&mon, "f2"), Ok(Value::None));
    assert!(mon.is_armed(Event::Line));
}

#[test]
fn test_disable_is_per_location_until_restart() {
    let mon = monitoring();
    let rec = Recorder::new();
    arm(&mon, ToolId::COVERAGE, EventSet::LINE);
    mon.register_callback(
        ToolId::COVERAGE,
        Event::Line,
        Some(rec.callback_returning(Event::Line, DISABLE)),
    )
    .unwrap();

    let code = samples::find("floop").unwrap().function().unwrap();
    let mut vm = Vm::new(Arc::clone(&mon));

    vm.call(&code, vec![]).unwrap();
    // The loop body line is reported once, then disabled.
    assert_eq!(rec.details(Event::Line), vec!["1", "2", "1"]);
    assert_eq!(mon.disabled_count(), 3);

    rec.clear();
    vm.call(&code, vec![]).unwrap();
    assert!(rec.records().is_empty());

    mon.restart_events();
    vm.call(&code, vec![]).unwrap();
    assert_eq!(rec.details(Event::Line), vec!["1", "2", "1"]);
}

#[test]
fn test_disable_does_not_affect_other_tools() {
    let mon = monitoring();
    arm(&mon, ToolId::COVERAGE, EventSet::LINE);
    mon.register_callback(
        ToolId::COVERAGE,
        Event::Line,
        Some(Callback::line(|_| Ok(DISABLE))),
    )
    .unwrap();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::DEBUGGER, EventSet::LINE);

    let code = samples::find("floop").unwrap().function().unwrap();
    let mut vm = Vm::new(Arc::clone(&mon));
    vm.call(&code, vec![]).unwrap();
    vm.call(&code, vec![]).unwrap();
    assert_eq!(rec.count(Event::Line), 8);
}

#[test]
fn test_disabled_call_silences_c_return() {
    let mon = monitoring();
    arm(&mon, ToolId::PROFILER, EventSet::CALL);
    mon.register_callback(
        ToolId::PROFILER,
        Event::Call,
        Some(Callback::call(|_| Ok(DISABLE))),
    )
    .unwrap();
    let (returns, returned) = counter(Event::CReturn);
    mon.register_callback(ToolId::PROFILER, Event::CReturn, Some(returns))
        .unwrap();

    run(&mon, "f2").unwrap();
    assert_eq!(hits(&returned), 0);
}

#[test]
fn test_local_events_are_scoped_to_one_code_unit() {
    let mon = monitoring();
    mon.use_tool_id(ToolId::DEBUGGER, "debugger").unwrap();
    let rec = Recorder::new();
    mon.register_callback(ToolId::DEBUGGER, Event::Line, Some(rec.callback(Event::Line)))
        .unwrap();

    let floop = samples::find("floop").unwrap().build().unwrap();
    mon.set_local_events(ToolId::DEBUGGER, floop.id(), EventSet::LINE)
        .unwrap();
    assert_eq!(
        mon.get_local_events(ToolId::DEBUGGER, floop.id()),
        EventSet::LINE
    );

    let mut vm = Vm::new(Arc::clone(&mon));
    vm.call(&Value::Function(floop), vec![]).unwrap();
    run(&mon, "linear").unwrap();
    // A rebuilt floop is a different code unit.
    run(&mon, "floop").unwrap();

    assert_eq!(rec.count(Event::Line), 4);
    assert!(rec.records().iter().all(|r| r.code == "floop"));
}

#[test]
fn test_local_and_global_events_combine() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::DEBUGGER, EventSet::PY_START);
    mon.register_callback(ToolId::DEBUGGER, Event::Line, Some(rec.callback(Event::Line)))
        .unwrap();

    let f1 = samples::find("f1").unwrap().build().unwrap();
    mon.set_local_events(ToolId::DEBUGGER, f1.id(), EventSet::LINE)
        .unwrap();
    Vm::new(Arc::clone(&mon))
        .call(&Value::Function(f1), vec![])
        .unwrap();

    assert_eq!(rec.lines(), vec!["PY_START f1", "LINE f1 1"]);
}

#[test]
fn test_callback_can_disarm_its_own_tool() {
    let mon = monitoring();
    arm(&mon, ToolId::DEBUGGER, EventSet::LINE);
    let (counting, lines) = counter(Event::Line);
    let disarm = {
        let mon = Arc::clone(&mon);
        Callback::line(move |_| {
            mon.set_events(ToolId::DEBUGGER, EventSet::NO_EVENTS)
                .map_err(|e| Exception::new(ExceptionKind::RuntimeError, &e.to_string()))?;
            Ok(Action::Continue)
        })
    };
    mon.register_callback(ToolId::DEBUGGER, Event::Line, Some(disarm))
        .unwrap();
    arm(&mon, ToolId::PROFILER, EventSet::LINE);
    mon.register_callback(ToolId::PROFILER, Event::Line, Some(counting))
        .unwrap();

    run(&mon, "linear").unwrap();
    assert_eq!(mon.get_events(ToolId::DEBUGGER), EventSet::NO_EVENTS);
    assert_eq!(hits(&lines), 5);
}

#[test]
fn test_freeing_a_tool_stops_delivery() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::OPTIMIZER, EventSet::PY_START | EventSet::LINE);
    run(&mon, "f1").unwrap();
    assert_eq!(rec.records().len(), 2);

    mon.free_tool_id(ToolId::OPTIMIZER).unwrap();
    assert!(!mon.is_armed(Event::PyStart));
    rec.clear();
    run(&mon, "f1").unwrap();
    assert!(rec.records().is_empty());
}

#[test]
fn test_version_is_stable_while_running() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::DEBUGGER, EventSet::LINE | EventSet::CALL);
    let before = mon.version();
    run(&mon, "mixed").unwrap();
    assert_eq!(mon.version(), before);
}
