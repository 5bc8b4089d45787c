//! Monitorable event kinds.
//!
//! Each [`Event`] owns exactly one bit of an [`EventSet`]. The bit order is
//! fixed so raw masks written by tools stay stable across releases:
//! `PY_START | PY_RESUME | PY_RETURN | PY_YIELD == 15`.
//!
//! Two kinds are *derived*: `C_RETURN` and `C_RAISE` are sub-events of `CALL`.
//! They cannot be armed on their own; arming `CALL` is what makes them fire.
//! That relationship is static metadata here ([`Event::parent`]) rather than
//! conditionals scattered through the registry and the dispatcher.

use std::fmt;
use std::str::FromStr;

use crate::EventSet;

/// A kind of occurrence the dispatcher can report.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Event {
    /// An interpreted frame starts executing.
    PyStart = 0,
    /// A suspended frame (generator) resumes.
    PyResume = 1,
    /// An interpreted frame returns.
    PyReturn = 2,
    /// A generator frame yields.
    PyYield = 3,
    /// Any call, interpreted or native.
    Call = 4,
    /// Execution reaches a new source line.
    Line = 5,
    /// A single instruction is about to execute.
    Instruction = 6,
    /// Unconditional control transfer.
    Jump = 7,
    /// Conditional control transfer, taken or not.
    Branch = 8,
    /// Implicit end of an iteration protocol.
    StopIteration = 9,
    /// An exception starts propagating in a frame.
    Raise = 10,
    /// A handler caught the exception.
    ExceptionHandled = 11,
    /// An exception leaves an interpreted frame.
    PyUnwind = 12,
    /// A native callee returned (derived from `CALL`).
    CReturn = 13,
    /// A native callee failed (derived from `CALL`).
    CRaise = 14,
}

/// The payload record family an event is delivered with.
///
/// Callbacks are registered per shape, so a callback written for `LINE`
/// can never be handed a `CALL` payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// `(code, offset, value?)`: frame start/resume/return/yield.
    Code,
    /// `(code, offset, callable, arg-or-MISSING)`.
    Call,
    /// `(code, offset, line)`.
    Line,
    /// `(code, offset)`.
    Instruction,
    /// `(code, offset, exception)`.
    Exception,
    /// `(code, from, to)`.
    Branch,
}

impl Shape {
    /// Lower-case name used in diagnostics and the CLI.
    pub const fn name(self) -> &'static str {
        match self {
            Shape::Code => "code",
            Shape::Call => "call",
            Shape::Line => "line",
            Shape::Instruction => "instruction",
            Shape::Exception => "exception",
            Shape::Branch => "branch",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Event {
    /// Number of event kinds.
    pub const COUNT: usize = 15;

    /// All events, in bit order.
    pub const ALL: [Event; Event::COUNT] = [
        Event::PyStart,
        Event::PyResume,
        Event::PyReturn,
        Event::PyYield,
        Event::Call,
        Event::Line,
        Event::Instruction,
        Event::Jump,
        Event::Branch,
        Event::StopIteration,
        Event::Raise,
        Event::ExceptionHandled,
        Event::PyUnwind,
        Event::CReturn,
        Event::CRaise,
    ];

    /// Position of this event's bit.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The single-event set for this kind.
    #[inline]
    pub const fn bit(self) -> EventSet {
        EventSet::from_bits_truncate(1 << (self as u32))
    }

    /// Canonical upper-case name (`"PY_START"`, `"C_RETURN"`, ...).
    pub const fn name(self) -> &'static str {
        match self {
            Event::PyStart => "PY_START",
            Event::PyResume => "PY_RESUME",
            Event::PyReturn => "PY_RETURN",
            Event::PyYield => "PY_YIELD",
            Event::Call => "CALL",
            Event::Line => "LINE",
            Event::Instruction => "INSTRUCTION",
            Event::Jump => "JUMP",
            Event::Branch => "BRANCH",
            Event::StopIteration => "STOP_ITERATION",
            Event::Raise => "RAISE",
            Event::ExceptionHandled => "EXCEPTION_HANDLED",
            Event::PyUnwind => "PY_UNWIND",
            Event::CReturn => "C_RETURN",
            Event::CRaise => "C_RAISE",
        }
    }

    /// The payload shape this event is delivered with.
    pub const fn shape(self) -> Shape {
        match self {
            Event::PyStart | Event::PyResume | Event::PyReturn | Event::PyYield => Shape::Code,
            Event::Call | Event::CReturn | Event::CRaise => Shape::Call,
            Event::Line => Shape::Line,
            Event::Instruction => Shape::Instruction,
            Event::Jump | Event::Branch => Shape::Branch,
            Event::StopIteration
            | Event::Raise
            | Event::ExceptionHandled
            | Event::PyUnwind => Shape::Exception,
        }
    }

    /// The event whose arming governs delivery of this one, if derived.
    #[inline]
    pub const fn parent(self) -> Option<Event> {
        match self {
            Event::CReturn | Event::CRaise => Some(Event::Call),
            _ => None,
        }
    }

    /// Whether this event can only be delivered through its parent.
    #[inline]
    pub const fn is_derived(self) -> bool {
        self.parent().is_some()
    }

    /// The event whose bit must be armed for this one to be delivered.
    ///
    /// Identity for ordinary events, the parent for derived ones.
    #[inline]
    pub const fn gate(self) -> Event {
        match self.parent() {
            Some(parent) => parent,
            None => self,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error when parsing an event name fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown event '{0}'")]
pub struct UnknownEvent(pub String);

impl FromStr for Event {
    type Err = UnknownEvent;

    /// Parses the canonical name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Event::ALL
            .iter()
            .copied()
            .find(|event| event.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

#[cfg(test)]
mod tests;
