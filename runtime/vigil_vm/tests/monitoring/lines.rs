use pretty_assertions::assert_eq;
use vigil_monitor::{Event, EventSet, ToolId};

use crate::common::{monitoring, run, Recorder};

/// Relative `LINE` numbers reported while running `sample`.
fn lines_of(sample: &str) -> Vec<String> {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::COVERAGE, EventSet::LINE);
    run(&mon, sample).unwrap();
    rec.details(Event::Line)
}

#[test]
fn test_straight_line_code() {
    assert_eq!(lines_of("linear"), vec!["1", "2", "3", "4", "5"]);
}

#[test]
fn test_loop_header_reported_on_entry_and_exit_only() {
    // The backward jump lands mid-line on the loop header.
    assert_eq!(lines_of("floop"), vec!["1", "2", "2", "1"]);
}

#[test]
fn test_if_else_skips_the_untaken_arm() {
    assert_eq!(lines_of("branch"), vec!["1", "2", "3", "6"]);
}

#[test]
fn test_handled_exception_lines() {
    assert_eq!(lines_of("try_except"), vec!["1", "2", "3", "4", "5", "6"]);
}

#[test]
fn test_try_without_exception_lines() {
    assert_eq!(lines_of("try_no_raise"), vec!["1", "2", "3", "6"]);
}

#[test]
fn test_loop_with_branches() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(
        &mon,
        ToolId::DEBUGGER,
        EventSet::LINE | EventSet::JUMP | EventSet::BRANCH,
    );

    run(&mon, "loop_branch").unwrap();
    assert_eq!(
        rec.lines(),
        vec![
            "LINE loop_branch 1",
            "LINE loop_branch 2",
            "BRANCH loop_branch 2->2",
            "LINE loop_branch 3",
            "BRANCH loop_branch 3->6",
            "LINE loop_branch 6",
            "JUMP loop_branch 6->2",
            "BRANCH loop_branch 2->2",
            "LINE loop_branch 3",
            "BRANCH loop_branch 3->4",
            "LINE loop_branch 4",
            "JUMP loop_branch 4->2",
            "BRANCH loop_branch 2->2",
            "LINE loop_branch 2",
        ]
    );
}

#[test]
fn test_branch_not_taken_and_jump() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::DEBUGGER, EventSet::JUMP | EventSet::BRANCH);

    run(&mon, "branch").unwrap();
    assert_eq!(
        rec.lines(),
        vec!["BRANCH branch 1->2", "JUMP branch 3->6"]
    );
}

#[test]
fn test_lines_inside_callee() {
    let mon = monitoring();
    let rec = Recorder::new();
    rec.install(&mon, ToolId::COVERAGE, EventSet::LINE);

    run(&mon, "g1").unwrap();
    // gen: lines 1 and 2, one resumption each; g1 loops twice.
    assert_eq!(
        rec.lines(),
        vec![
            "LINE g1 1",
            "LINE gen 1",
            "LINE g1 2",
            "LINE gen 2",
            "LINE g1 2",
            "LINE g1 1",
        ]
    );
}
