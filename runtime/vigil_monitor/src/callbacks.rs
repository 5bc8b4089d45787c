//! Typed callbacks and the per-(tool, event) callback table.
//!
//! A [`Callback`] is resolved to one payload [`Shape`] when it is built, and
//! registration rejects a callback whose shape does not match the event. The
//! dispatcher therefore never decides arity at call time.
//!
//! Callbacks are `Arc`'d closures: the table hands out clones so dispatch can
//! run them with no lock held.

use std::fmt;
use std::sync::Arc;

use vigil_events::{Event, Shape, ToolId};

use crate::payload::{
    BranchEvent, CallEvent, CodeEvent, ExceptionEvent, InstructionEvent, LineEvent, Payload,
};
use crate::Host;

/// What a callback asks of the dispatcher.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Action {
    /// Keep delivering.
    #[default]
    Continue,
    /// Stop delivering this event to this tool at this location until
    /// `restart_events`.
    Disable,
}

/// The `DISABLE` sentinel.
pub const DISABLE: Action = Action::Disable;

/// A callback's result: an [`Action`], or a fault raised into the host.
pub type Outcome<H> = Result<Action, <H as Host>::Fault>;

type CodeFn<H> = dyn Fn(&CodeEvent<'_, <H as Host>::Value>) -> Outcome<H> + Send + Sync;
type CallFn<H> = dyn Fn(&CallEvent<'_, <H as Host>::Value>) -> Outcome<H> + Send + Sync;
type LineFn<H> = dyn Fn(&LineEvent<'_>) -> Outcome<H> + Send + Sync;
type InstructionFn<H> = dyn Fn(&InstructionEvent<'_>) -> Outcome<H> + Send + Sync;
type ExceptionFn<H> = dyn Fn(&ExceptionEvent<'_, <H as Host>::Value>) -> Outcome<H> + Send + Sync;
type BranchFn<H> = dyn Fn(&BranchEvent<'_>) -> Outcome<H> + Send + Sync;

/// A callback bound to one payload shape.
pub enum Callback<H: Host> {
    Code(Arc<CodeFn<H>>),
    Call(Arc<CallFn<H>>),
    Line(Arc<LineFn<H>>),
    Instruction(Arc<InstructionFn<H>>),
    Exception(Arc<ExceptionFn<H>>),
    Branch(Arc<BranchFn<H>>),
}

impl<H: Host> Callback<H> {
    /// For `PY_START`, `PY_RESUME`, `PY_RETURN`, `PY_YIELD`.
    pub fn code(
        f: impl Fn(&CodeEvent<'_, H::Value>) -> Outcome<H> + Send + Sync + 'static,
    ) -> Self {
        Callback::Code(Arc::new(f))
    }

    /// For `CALL`, `C_RETURN`, `C_RAISE`.
    pub fn call(
        f: impl Fn(&CallEvent<'_, H::Value>) -> Outcome<H> + Send + Sync + 'static,
    ) -> Self {
        Callback::Call(Arc::new(f))
    }

    /// For `LINE`.
    pub fn line(f: impl Fn(&LineEvent<'_>) -> Outcome<H> + Send + Sync + 'static) -> Self {
        Callback::Line(Arc::new(f))
    }

    /// For `INSTRUCTION`.
    pub fn instruction(
        f: impl Fn(&InstructionEvent<'_>) -> Outcome<H> + Send + Sync + 'static,
    ) -> Self {
        Callback::Instruction(Arc::new(f))
    }

    /// For `RAISE`, `STOP_ITERATION`, `EXCEPTION_HANDLED`, `PY_UNWIND`.
    pub fn exception(
        f: impl Fn(&ExceptionEvent<'_, H::Value>) -> Outcome<H> + Send + Sync + 'static,
    ) -> Self {
        Callback::Exception(Arc::new(f))
    }

    /// For `JUMP`, `BRANCH`.
    pub fn branch(f: impl Fn(&BranchEvent<'_>) -> Outcome<H> + Send + Sync + 'static) -> Self {
        Callback::Branch(Arc::new(f))
    }

    pub fn shape(&self) -> Shape {
        match self {
            Callback::Code(_) => Shape::Code,
            Callback::Call(_) => Shape::Call,
            Callback::Line(_) => Shape::Line,
            Callback::Instruction(_) => Shape::Instruction,
            Callback::Exception(_) => Shape::Exception,
            Callback::Branch(_) => Shape::Branch,
        }
    }

    /// Whether both handles point at the same closure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Callback::Code(a), Callback::Code(b)) => Arc::ptr_eq(a, b),
            (Callback::Call(a), Callback::Call(b)) => Arc::ptr_eq(a, b),
            (Callback::Line(a), Callback::Line(b)) => Arc::ptr_eq(a, b),
            (Callback::Instruction(a), Callback::Instruction(b)) => Arc::ptr_eq(a, b),
            (Callback::Exception(a), Callback::Exception(b)) => Arc::ptr_eq(a, b),
            (Callback::Branch(a), Callback::Branch(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Run the callback on a payload of its own shape.
    ///
    /// Shapes are checked at registration, so a mismatch here is a host bug;
    /// it is skipped rather than delivered with the wrong record.
    pub(crate) fn invoke(&self, payload: &Payload<'_, H::Value>) -> Outcome<H> {
        match (self, payload) {
            (Callback::Code(f), Payload::Code(e)) => f(e),
            (Callback::Call(f), Payload::Call(e)) => f(e),
            (Callback::Line(f), Payload::Line(e)) => f(e),
            (Callback::Instruction(f), Payload::Instruction(e)) => f(e),
            (Callback::Exception(f), Payload::Exception(e)) => f(e),
            (Callback::Branch(f), Payload::Branch(e)) => f(e),
            _ => {
                tracing::error!(
                    callback = %self.shape(),
                    payload = %payload.shape(),
                    "payload shape does not match callback; skipped"
                );
                Ok(Action::Continue)
            }
        }
    }
}

impl<H: Host> Clone for Callback<H> {
    fn clone(&self) -> Self {
        match self {
            Callback::Code(f) => Callback::Code(Arc::clone(f)),
            Callback::Call(f) => Callback::Call(Arc::clone(f)),
            Callback::Line(f) => Callback::Line(Arc::clone(f)),
            Callback::Instruction(f) => Callback::Instruction(Arc::clone(f)),
            Callback::Exception(f) => Callback::Exception(Arc::clone(f)),
            Callback::Branch(f) => Callback::Branch(Arc::clone(f)),
        }
    }
}

impl<H: Host> fmt::Debug for Callback<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback::{}", self.shape())
    }
}

/// One callback slot per (tool, event).
pub(crate) struct CallbackTable<H: Host> {
    slots: [[Option<Callback<H>>; Event::COUNT]; ToolId::COUNT],
}

impl<H: Host> CallbackTable<H> {
    pub(crate) fn new() -> Self {
        CallbackTable {
            slots: std::array::from_fn(|_| std::array::from_fn(|_| None)),
        }
    }

    #[inline]
    pub(crate) fn get(&self, tool: ToolId, event: Event) -> Option<&Callback<H>> {
        self.slots[tool.index()][event.index()].as_ref()
    }

    /// Store `callback` (or clear with `None`), returning the previous one.
    pub(crate) fn swap(
        &mut self,
        tool: ToolId,
        event: Event,
        callback: Option<Callback<H>>,
    ) -> Option<Callback<H>> {
        std::mem::replace(&mut self.slots[tool.index()][event.index()], callback)
    }

    /// Drop every callback the tool registered.
    pub(crate) fn clear_tool(&mut self, tool: ToolId) {
        for slot in &mut self.slots[tool.index()] {
            *slot = None;
        }
    }

    /// Events the tool has a callback for.
    pub(crate) fn registered(&self, tool: ToolId) -> impl Iterator<Item = Event> + '_ {
        Event::ALL
            .into_iter()
            .filter(move |event| self.get(tool, *event).is_some())
    }
}
