//! Bundled sample programs.
//!
//! Each sample is a zero-argument function built with [`CodeBuilder`]. Line
//! numbers are laid out as if every function lived in one source file, so
//! a recorder can report lines relative to a code unit's first line.

use std::sync::Arc;

use crate::code::{BinOp, BuildError, Code, CodeBuilder, Op};
use crate::natives::{APPEND, LEN, RANGE, SIZEOF};
use crate::value::{ExceptionKind, Value};

/// A named sample program.
pub struct Sample {
    pub name: &'static str,
    pub summary: &'static str,
    build: fn() -> Result<Arc<Code>, BuildError>,
}

impl Sample {
    /// Build a fresh copy of the sample's entry code.
    pub fn build(&self) -> Result<Arc<Code>, BuildError> {
        (self.build)()
    }

    /// The entry point as a callable value.
    pub fn function(&self) -> Result<Value, BuildError> {
        self.build().map(Value::Function)
    }
}

pub const ALL: &[Sample] = &[
    Sample {
        name: "just_pass",
        summary: "returns immediately",
        build: just_pass,
    },
    Sample {
        name: "just_raise",
        summary: "raises Exception and does not catch it",
        build: just_raise,
    },
    Sample {
        name: "just_call",
        summary: "calls the native len([])",
        build: just_call,
    },
    Sample {
        name: "caught",
        summary: "divides by zero inside try/except Exception",
        build: caught,
    },
    Sample {
        name: "nested_call",
        summary: "calls just_pass",
        build: nested_call,
    },
    Sample {
        name: "f1",
        summary: "pass",
        build: f1,
    },
    Sample {
        name: "f2",
        summary: "calls len([]) and sizeof(0)",
        build: f2,
    },
    Sample {
        name: "floop",
        summary: "loops over a two-item tuple",
        build: floop,
    },
    Sample {
        name: "g1",
        summary: "loops over a generator that yields twice",
        build: g1,
    },
    Sample {
        name: "linear",
        summary: "five straight-line statements",
        build: linear,
    },
    Sample {
        name: "branch",
        summary: "if/else on len('true') == 4",
        build: branch,
    },
    Sample {
        name: "try_except",
        summary: "raises KeyError inside try and handles it",
        build: try_except,
    },
    Sample {
        name: "try_no_raise",
        summary: "try block that completes normally",
        build: try_no_raise,
    },
    Sample {
        name: "loop_branch",
        summary: "for a in range(2) with an if/else body",
        build: loop_branch,
    },
    Sample {
        name: "implicit_stop_iteration",
        summary: "loops over a generator that returns a value",
        build: implicit_stop_iteration,
    },
    Sample {
        name: "c_call",
        summary: "calls the native append([], 2)",
        build: c_call,
    },
    Sample {
        name: "c_raise",
        summary: "len(1) raises TypeError, caught by the caller",
        build: c_raise,
    },
    Sample {
        name: "countdown",
        summary: "recurses twenty calls deep",
        build: countdown,
    },
    Sample {
        name: "mixed",
        summary: "calls, generators, native calls and exceptions together",
        build: mixed,
    },
];

pub fn find(name: &str) -> Option<&'static Sample> {
    ALL.iter().find(|sample| sample.name == name)
}

fn return_none(b: &mut CodeBuilder) {
    b.load(Value::None);
    b.emit(Op::Return);
}

/// `local0 = value` on `line`.
fn store(b: &mut CodeBuilder, line: u32, value: i64) {
    b.line(line);
    b.load(Value::Int(value));
    b.emit(Op::StoreLocal(0));
}

/// `callee()` as a statement.
fn call_statement(b: &mut CodeBuilder, line: u32, callee: Arc<Code>) {
    b.line(line);
    b.load(Value::Function(callee));
    b.emit(Op::Call(0));
    b.emit(Op::PopTop);
}

/// `for _ in iterable: pass`, where the iterable is already on the stack.
fn drain_loop(b: &mut CodeBuilder, header: u32, body: u32) -> Result<(), BuildError> {
    let (top, exit) = (b.label(), b.label());
    b.emit(Op::GetIter);
    b.bind(top)?;
    b.emit(Op::ForIter(exit));
    b.emit(Op::StoreLocal(0));
    b.line(body);
    b.emit(Op::Nop);
    b.emit(Op::Jump(top));
    b.bind(exit)?;
    b.line(header);
    return_none(b);
    Ok(())
}

fn just_pass() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("just_pass", 154);
    b.line(155);
    return_none(&mut b);
    b.build()
}

fn just_raise() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("just_raise", 163);
    b.line(164);
    b.load(Value::exception(ExceptionKind::Exception, ""));
    b.emit(Op::Raise);
    b.build()
}

fn just_call() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("just_call", 173);
    b.line(174);
    b.load(Value::Native(LEN));
    b.emit(Op::BuildList(0));
    b.emit(Op::Call(1));
    b.emit(Op::PopTop);
    return_none(&mut b);
    b.build()
}

fn caught() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("caught", 184);
    let (start, end, handler, reraise) = (b.label(), b.label(), b.label(), b.label());
    b.line(185);
    b.emit(Op::Nop);
    b.bind(start)?;
    b.line(186);
    b.load(Value::Int(1));
    b.load(Value::Int(0));
    b.emit(Op::Binary(BinOp::FloorDiv));
    b.emit(Op::PopTop);
    b.bind(end)?;
    return_none(&mut b);
    b.bind(handler)?;
    b.line(187);
    b.emit(Op::MatchException(ExceptionKind::Exception));
    b.emit(Op::PopJumpIfFalse(reraise));
    b.line(188);
    b.emit(Op::PopTop);
    return_none(&mut b);
    b.bind(reraise)?;
    b.line(187);
    b.emit(Op::Raise);
    b.handler(start, end, handler, 0);
    b.build()
}

fn nested_call() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("nested_call", 199);
    call_statement(&mut b, 200, just_pass()?);
    return_none(&mut b);
    b.build()
}

fn f1() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("f1", 13);
    b.line(14);
    return_none(&mut b);
    b.build()
}

fn f2() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("f2", 16);
    b.line(17);
    b.load(Value::Native(LEN));
    b.emit(Op::BuildList(0));
    b.emit(Op::Call(1));
    b.emit(Op::PopTop);
    b.line(18);
    b.load(Value::Native(SIZEOF));
    b.load(Value::Int(0));
    b.emit(Op::Call(1));
    b.emit(Op::PopTop);
    return_none(&mut b);
    b.build()
}

fn floop() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("floop", 20);
    b.line(21);
    b.load(Value::tuple(vec![Value::Int(0), Value::Int(1)]));
    drain_loop(&mut b, 21, 22)?;
    b.build()
}

fn yields_twice() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("gen", 24).generator();
    b.line(25);
    b.load(Value::None);
    b.emit(Op::Yield);
    b.line(26);
    b.load(Value::None);
    b.emit(Op::Yield);
    return_none(&mut b);
    b.build()
}

fn g1() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("g1", 28);
    b.line(29);
    b.load(Value::Function(yields_twice()?));
    b.emit(Op::Call(0));
    drain_loop(&mut b, 29, 30)?;
    b.build()
}

fn linear() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("linear", 580);
    for n in 1..=5 {
        store(&mut b, 580 + n, i64::from(n));
    }
    return_none(&mut b);
    b.build()
}

fn branch() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("branch", 590);
    let (otherwise, after) = (b.label(), b.label());
    b.line(591);
    b.load(Value::Native(LEN));
    b.load(Value::str("true"));
    b.emit(Op::Call(1));
    b.load(Value::Int(4));
    b.emit(Op::Binary(BinOp::Eq));
    b.emit(Op::PopJumpIfFalse(otherwise));
    store(&mut b, 592, 2);
    store(&mut b, 593, 3);
    b.emit(Op::Jump(after));
    b.bind(otherwise)?;
    store(&mut b, 595, 5);
    b.bind(after)?;
    store(&mut b, 596, 6);
    return_none(&mut b);
    b.build()
}

fn try_except() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("try_except", 600);
    let (start, end) = (b.label(), b.label());
    b.line(601);
    b.emit(Op::Nop);
    b.bind(start)?;
    store(&mut b, 602, 2);
    b.line(603);
    b.load(Value::exception(ExceptionKind::KeyError, ""));
    b.emit(Op::Raise);
    b.bind(end)?;
    b.line(604);
    b.emit(Op::PopTop);
    store(&mut b, 605, 5);
    store(&mut b, 606, 6);
    return_none(&mut b);
    b.handler(start, end, end, 0);
    b.build()
}

fn try_no_raise() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("try_no_raise", 610);
    let (start, end, after) = (b.label(), b.label(), b.label());
    b.line(611);
    b.emit(Op::Nop);
    b.bind(start)?;
    store(&mut b, 612, 2);
    store(&mut b, 613, 3);
    b.emit(Op::Jump(after));
    b.bind(end)?;
    b.line(614);
    b.emit(Op::PopTop);
    store(&mut b, 615, 5);
    b.bind(after)?;
    store(&mut b, 616, 6);
    return_none(&mut b);
    b.handler(start, end, end, 0);
    b.build()
}

fn loop_branch() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("loop_branch", 620);
    let (top, otherwise, exit) = (b.label(), b.label(), b.label());
    store(&mut b, 621, 1);
    b.line(622);
    b.load(Value::Native(RANGE));
    b.load(Value::Int(2));
    b.emit(Op::Call(1));
    b.emit(Op::GetIter);
    b.bind(top)?;
    b.emit(Op::ForIter(exit));
    b.emit(Op::StoreLocal(1));
    b.line(623);
    b.emit(Op::LoadLocal(1));
    b.emit(Op::PopJumpIfFalse(otherwise));
    store(&mut b, 624, 4);
    b.emit(Op::Jump(top));
    b.bind(otherwise)?;
    store(&mut b, 626, 6);
    b.emit(Op::Jump(top));
    b.bind(exit)?;
    b.line(622);
    return_none(&mut b);
    b.build()
}

fn returning_gen() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("gen", 645).generator();
    b.line(646);
    b.load(Value::Int(1));
    b.emit(Op::Yield);
    b.line(647);
    b.load(Value::Int(2));
    b.emit(Op::Return);
    b.build()
}

fn implicit_stop_iteration() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("implicit_stop_iteration", 650);
    b.line(651);
    b.load(Value::Function(returning_gen()?));
    b.emit(Op::Call(0));
    drain_loop(&mut b, 651, 652)?;
    b.build()
}

fn c_call() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("c_call", 660);
    store(&mut b, 661, 1);
    b.line(662);
    b.load(Value::Native(APPEND));
    b.emit(Op::BuildList(0));
    b.load(Value::Int(2));
    b.emit(Op::Call(2));
    b.emit(Op::PopTop);
    store(&mut b, 663, 3);
    return_none(&mut b);
    b.build()
}

fn c_raise() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("c_raise", 670);
    let (start, end, handler, reraise) = (b.label(), b.label(), b.label(), b.label());
    b.line(671);
    b.emit(Op::Nop);
    b.bind(start)?;
    b.line(672);
    b.load(Value::Native(LEN));
    b.load(Value::Int(1));
    b.emit(Op::Call(1));
    b.emit(Op::PopTop);
    b.bind(end)?;
    return_none(&mut b);
    b.bind(handler)?;
    b.line(673);
    b.emit(Op::MatchException(ExceptionKind::TypeError));
    b.emit(Op::PopJumpIfFalse(reraise));
    b.line(674);
    b.emit(Op::PopTop);
    return_none(&mut b);
    b.bind(reraise)?;
    b.line(673);
    b.emit(Op::Raise);
    b.handler(start, end, handler, 0);
    b.build()
}

/// `countdown(n, f)`: `f(n - 1, f)` while `0 < n`.
fn countdown_body() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("countdown", 700).params(2);
    let base = b.label();
    b.line(701);
    b.load(Value::Int(0));
    b.emit(Op::LoadLocal(0));
    b.emit(Op::Binary(BinOp::Lt));
    b.emit(Op::PopJumpIfFalse(base));
    b.line(702);
    b.emit(Op::LoadLocal(1));
    b.emit(Op::LoadLocal(0));
    b.load(Value::Int(1));
    b.emit(Op::Binary(BinOp::Sub));
    b.emit(Op::LoadLocal(1));
    b.emit(Op::Call(2));
    b.emit(Op::Return);
    b.bind(base)?;
    b.line(703);
    b.load(Value::Int(0));
    b.emit(Op::Return);
    b.build()
}

fn countdown() -> Result<Arc<Code>, BuildError> {
    let body = Value::Function(countdown_body()?);
    let mut b = CodeBuilder::new("run_countdown", 710);
    b.line(711);
    b.load(body.clone());
    b.load(Value::Int(20));
    b.load(body);
    b.emit(Op::Call(2));
    b.emit(Op::Return);
    b.build()
}

fn mixed() -> Result<Arc<Code>, BuildError> {
    let mut b = CodeBuilder::new("mixed", 680);
    let (start, end, after) = (b.label(), b.label(), b.label());
    call_statement(&mut b, 681, nested_call()?);
    call_statement(&mut b, 682, caught()?);
    call_statement(&mut b, 683, g1()?);
    call_statement(&mut b, 684, just_call()?);
    call_statement(&mut b, 685, c_raise()?);
    b.line(686);
    b.emit(Op::Nop);
    b.bind(start)?;
    call_statement(&mut b, 687, just_raise()?);
    b.emit(Op::Jump(after));
    b.bind(end)?;
    b.line(688);
    b.emit(Op::PopTop);
    b.bind(after)?;
    b.line(689);
    return_none(&mut b);
    b.handler(start, end, end, 0);
    b.build()
}

#[cfg(test)]
mod tests;
