//! Event payload records.
//!
//! One record per [`Shape`]; [`Payload`] is the tagged union the dispatcher
//! routes. Records borrow from the host for the duration of one dispatch.

use std::fmt;

use vigil_events::Shape;

use crate::CodeUnit;

/// The argument slot of a call payload.
///
/// `Missing` is the `MISSING` placeholder: the call had no arguments.
pub enum Arg<'a, V> {
    Missing,
    Value(&'a V),
}

impl<'a, V> Arg<'a, V> {
    /// First argument of `args`, or `Missing`.
    pub fn first_of(args: &'a [V]) -> Self {
        match args.first() {
            Some(value) => Arg::Value(value),
            None => Arg::Missing,
        }
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Arg::Missing)
    }

    #[inline]
    pub fn value(&self) -> Option<&'a V> {
        match *self {
            Arg::Missing => None,
            Arg::Value(value) => Some(value),
        }
    }
}

impl<V> Clone for Arg<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Arg<'_, V> {}

impl<V: fmt::Debug> fmt::Debug for Arg<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Missing => f.write_str("MISSING"),
            Arg::Value(value) => value.fmt(f),
        }
    }
}

/// `PY_START`, `PY_RESUME`, `PY_RETURN`, `PY_YIELD`.
///
/// `value` is the returned or yielded value; `None` for start/resume.
#[derive(Debug)]
pub struct CodeEvent<'a, V> {
    pub code: &'a dyn CodeUnit,
    pub offset: u32,
    pub value: Option<&'a V>,
}

/// `CALL`, `C_RETURN`, `C_RAISE`.
#[derive(Debug)]
pub struct CallEvent<'a, V> {
    pub code: &'a dyn CodeUnit,
    pub offset: u32,
    pub callable: &'a V,
    pub arg: Arg<'a, V>,
}

/// `LINE`.
#[derive(Debug)]
pub struct LineEvent<'a> {
    pub code: &'a dyn CodeUnit,
    pub offset: u32,
    pub line: u32,
}

/// `INSTRUCTION`.
#[derive(Debug)]
pub struct InstructionEvent<'a> {
    pub code: &'a dyn CodeUnit,
    pub offset: u32,
}

/// `RAISE`, `STOP_ITERATION`, `EXCEPTION_HANDLED`, `PY_UNWIND`.
#[derive(Debug)]
pub struct ExceptionEvent<'a, V> {
    pub code: &'a dyn CodeUnit,
    pub offset: u32,
    pub exception: &'a V,
}

/// `JUMP`, `BRANCH`. Offsets are instruction offsets in `code`.
#[derive(Debug)]
pub struct BranchEvent<'a> {
    pub code: &'a dyn CodeUnit,
    pub from: u32,
    pub to: u32,
}

/// A payload of any shape.
#[derive(Debug)]
pub enum Payload<'a, V> {
    Code(CodeEvent<'a, V>),
    Call(CallEvent<'a, V>),
    Line(LineEvent<'a>),
    Instruction(InstructionEvent<'a>),
    Exception(ExceptionEvent<'a, V>),
    Branch(BranchEvent<'a>),
}

impl<'a, V> Payload<'a, V> {
    pub fn shape(&self) -> Shape {
        match self {
            Payload::Code(_) => Shape::Code,
            Payload::Call(_) => Shape::Call,
            Payload::Line(_) => Shape::Line,
            Payload::Instruction(_) => Shape::Instruction,
            Payload::Exception(_) => Shape::Exception,
            Payload::Branch(_) => Shape::Branch,
        }
    }

    /// The code unit the event occurred in.
    pub fn code(&self) -> &'a dyn CodeUnit {
        match self {
            Payload::Code(e) => e.code,
            Payload::Call(e) => e.code,
            Payload::Line(e) => e.code,
            Payload::Instruction(e) => e.code,
            Payload::Exception(e) => e.code,
            Payload::Branch(e) => e.code,
        }
    }

    /// The instruction offset that produced the event (the source offset for
    /// branches). Together with the code unit this is the event's location.
    pub fn offset(&self) -> u32 {
        match self {
            Payload::Code(e) => e.offset,
            Payload::Call(e) => e.offset,
            Payload::Line(e) => e.offset,
            Payload::Instruction(e) => e.offset,
            Payload::Exception(e) => e.offset,
            Payload::Branch(e) => e.from,
        }
    }
}
