//! Code units: instructions, line table, exception handlers.
//!
//! Instruction `i` sits at byte offset `2 * i`, the offset events report.
//! A *line start* is the first instruction emitted after
//! [`CodeBuilder::line`]; `LINE` events fire only there.

use std::fmt;
use std::sync::Arc;

use vigil_monitor::{CodeId, CodeUnit};

use crate::value::{ExceptionKind, Value};

/// A jump target, resolved when the code is built.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label(u32);

/// Binary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    FloorDiv,
    Lt,
    Eq,
}

/// One instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Nop,
    LoadConst(u32),
    LoadLocal(u32),
    StoreLocal(u32),
    PopTop,
    /// Pop `n` values into a new list.
    BuildList(u32),
    Binary(BinOp),
    /// Pop `argc` arguments, then the callable.
    Call(u32),
    Return,
    Yield,
    /// Raise the exception on top of the stack.
    Raise,
    Jump(Label),
    PopJumpIfFalse(Label),
    GetIter,
    /// Push the iterator's next item, or pop it and jump when exhausted.
    ForIter(Label),
    /// Push whether the exception on top of the stack is an instance of the
    /// class, leaving the exception in place.
    MatchException(ExceptionKind),
}

impl Op {
    fn target(self) -> Option<Label> {
        match self {
            Op::Jump(label) | Op::PopJumpIfFalse(label) | Op::ForIter(label) => Some(label),
            _ => None,
        }
    }

    /// Control never falls through to the next instruction.
    fn is_terminator(self) -> bool {
        matches!(self, Op::Return | Op::Raise | Op::Jump(_))
    }
}

/// Instructions `start..end` are covered by a handler at `target`, entered
/// with the value stack cut to `depth`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Handler {
    pub start: usize,
    pub end: usize,
    pub target: usize,
    pub depth: usize,
}

/// A compiled function body.
pub struct Code {
    id: CodeId,
    name: String,
    first_line: u32,
    params: usize,
    locals: usize,
    generator: bool,
    ops: Vec<Op>,
    lines: Vec<Option<u32>>,
    line_starts: Vec<bool>,
    labels: Vec<usize>,
    handlers: Vec<Handler>,
    consts: Vec<Value>,
}

impl Code {
    #[inline]
    pub fn id(&self) -> CodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> usize {
        self.params
    }

    pub fn locals(&self) -> usize {
        self.locals
    }

    /// Calling the code returns a generator instead of running it.
    pub fn is_generator(&self) -> bool {
        self.generator
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    #[inline]
    pub fn op(&self, index: usize) -> Option<Op> {
        self.ops.get(index).copied()
    }

    pub fn line(&self, index: usize) -> Option<u32> {
        self.lines.get(index).copied().flatten()
    }

    pub fn is_line_start(&self, index: usize) -> bool {
        self.line_starts.get(index).copied().unwrap_or(false)
    }

    /// Instruction index a label was bound to, if the label is this code's.
    pub fn target(&self, label: Label) -> Option<usize> {
        self.labels.get(label.0 as usize).copied()
    }

    pub fn constant(&self, index: u32) -> Option<&Value> {
        self.consts.get(index as usize)
    }

    /// Innermost handler covering instruction `index`.
    pub fn handler_for(&self, index: usize) -> Option<Handler> {
        self.handlers
            .iter()
            .rev()
            .find(|h| h.start <= index && index < h.end)
            .copied()
    }
}

impl CodeUnit for Code {
    fn id(&self) -> CodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn first_line(&self) -> u32 {
        self.first_line
    }

    fn line_at(&self, offset: u32) -> Option<u32> {
        self.line((offset / 2) as usize)
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<code {} {}>", self.name, self.id)
    }
}

/// Byte offset of instruction `index`.
#[inline]
pub fn offset_of(index: usize) -> u32 {
    u32::try_from(index * 2).unwrap_or(u32::MAX)
}

/// Error building a code unit.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("code '{0}' has no instructions")]
    Empty(String),

    #[error("code '{name}': label {label:?} is never bound")]
    UnboundLabel { name: String, label: Label },

    #[error("code '{name}': label {label:?} was made by another builder")]
    ForeignLabel { name: String, label: Label },

    #[error("code '{name}': label {label:?} is bound twice")]
    ReboundLabel { name: String, label: Label },

    #[error("code '{name}': execution can run past the last instruction")]
    MissingTerminator { name: String },

    #[error("code '{name}': yield outside a generator")]
    YieldOutsideGenerator { name: String },

    #[error("code '{name}': handler range {start}..{end} is empty or covers its own target")]
    BadHandler {
        name: String,
        start: usize,
        end: usize,
    },

    #[error("code '{name}' is too large ({len} instructions)")]
    TooLarge { name: String, len: usize },
}

#[derive(Debug)]
struct PendingHandler {
    start: Label,
    end: Label,
    target: Label,
    depth: usize,
}

/// Builds a [`Code`].
///
/// ```text
/// let mut b = CodeBuilder::new("f", 13);
/// b.line(14);
/// let none = b.constant(Value::None);
/// b.emit(Op::LoadConst(none));
/// b.emit(Op::Return);
/// let code = b.build()?;
/// ```
#[derive(Debug)]
pub struct CodeBuilder {
    name: String,
    first_line: u32,
    params: usize,
    locals: usize,
    generator: bool,
    ops: Vec<Op>,
    lines: Vec<Option<u32>>,
    line_starts: Vec<bool>,
    current_line: Option<u32>,
    pending_line_start: bool,
    labels: Vec<Option<usize>>,
    handlers: Vec<PendingHandler>,
    consts: Vec<Value>,
}

/// Largest instruction count whose offsets fit in `u32`.
const MAX_OPS: usize = (u32::MAX / 2) as usize;

impl CodeBuilder {
    pub fn new(name: impl Into<String>, first_line: u32) -> Self {
        CodeBuilder {
            name: name.into(),
            first_line,
            params: 0,
            locals: 0,
            generator: false,
            ops: Vec::new(),
            lines: Vec::new(),
            line_starts: Vec::new(),
            current_line: None,
            pending_line_start: false,
            labels: Vec::new(),
            handlers: Vec::new(),
            consts: Vec::new(),
        }
    }

    /// Number of positional parameters; they occupy the first locals.
    #[must_use]
    pub fn params(mut self, params: usize) -> Self {
        self.params = params;
        self.locals = self.locals.max(params);
        self
    }

    #[must_use]
    pub fn generator(mut self) -> Self {
        self.generator = true;
        self
    }

    /// Following instructions belong to `line`; the next one starts it.
    pub fn line(&mut self, line: u32) -> &mut Self {
        self.current_line = Some(line);
        self.pending_line_start = true;
        self
    }

    pub fn constant(&mut self, value: Value) -> u32 {
        let index = u32::try_from(self.consts.len()).unwrap_or(u32::MAX);
        self.consts.push(value);
        index
    }

    pub fn label(&mut self) -> Label {
        let label = Label(u32::try_from(self.labels.len()).unwrap_or(u32::MAX));
        self.labels.push(None);
        label
    }

    /// Bind `label` to the next instruction.
    pub fn bind(&mut self, label: Label) -> Result<&mut Self, BuildError> {
        let Some(slot) = self.labels.get_mut(label.0 as usize) else {
            return Err(BuildError::ForeignLabel {
                name: self.name.clone(),
                label,
            });
        };
        if slot.is_some() {
            return Err(BuildError::ReboundLabel {
                name: self.name.clone(),
                label,
            });
        }
        *slot = Some(self.ops.len());
        Ok(self)
    }

    pub fn emit(&mut self, op: Op) -> &mut Self {
        if let Op::LoadLocal(slot) | Op::StoreLocal(slot) = op {
            self.locals = self.locals.max(slot as usize + 1);
        }
        self.ops.push(op);
        self.lines.push(self.current_line);
        self.line_starts
            .push(self.pending_line_start && self.current_line.is_some());
        self.pending_line_start = false;
        self
    }

    /// `LoadConst` of a fresh constant.
    pub fn load(&mut self, value: Value) -> &mut Self {
        let index = self.constant(value);
        self.emit(Op::LoadConst(index))
    }

    /// Cover instructions from `start` up to `end` with a handler at `target`.
    pub fn handler(&mut self, start: Label, end: Label, target: Label, depth: usize) -> &mut Self {
        self.handlers.push(PendingHandler {
            start,
            end,
            target,
            depth,
        });
        self
    }

    pub fn build(self) -> Result<Arc<Code>, BuildError> {
        let name = self.name;
        let Some(last) = self.ops.last().copied() else {
            return Err(BuildError::Empty(name));
        };
        if self.ops.len() > MAX_OPS {
            return Err(BuildError::TooLarge {
                name,
                len: self.ops.len(),
            });
        }

        let mut labels = Vec::with_capacity(self.labels.len());
        for (i, slot) in self.labels.iter().enumerate() {
            match slot {
                Some(index) => labels.push(*index),
                None => {
                    return Err(BuildError::UnboundLabel {
                        name,
                        label: Label(u32::try_from(i).unwrap_or(u32::MAX)),
                    })
                }
            }
        }

        let resolve = |label: Label| labels.get(label.0 as usize).copied();

        // A jump to one past the end runs off the code.
        let len = self.ops.len();
        let mut jumps_past_end = false;
        for label in self.ops.iter().filter_map(|op| op.target()) {
            match resolve(label) {
                Some(to) => jumps_past_end |= to >= len,
                None => return Err(BuildError::ForeignLabel { name, label }),
            }
        }
        if !last.is_terminator() || jumps_past_end {
            return Err(BuildError::MissingTerminator { name });
        }
        if !self.generator && self.ops.contains(&Op::Yield) {
            return Err(BuildError::YieldOutsideGenerator { name });
        }

        let mut handlers = Vec::with_capacity(self.handlers.len());
        for pending in &self.handlers {
            let (Some(start), Some(end), Some(target)) = (
                resolve(pending.start),
                resolve(pending.end),
                resolve(pending.target),
            ) else {
                let label = [pending.start, pending.end, pending.target]
                    .into_iter()
                    .find(|label| resolve(*label).is_none())
                    .unwrap_or(pending.start);
                return Err(BuildError::ForeignLabel { name, label });
            };
            let handler = Handler {
                start,
                end,
                target,
                depth: pending.depth,
            };
            let covers_target = handler.start <= handler.target && handler.target < handler.end;
            if handler.start >= handler.end || covers_target || handler.target >= len {
                return Err(BuildError::BadHandler {
                    name,
                    start: handler.start,
                    end: handler.end,
                });
            }
            handlers.push(handler);
        }

        Ok(Arc::new(Code {
            id: CodeId::fresh(),
            name,
            first_line: self.first_line,
            params: self.params,
            locals: self.locals,
            generator: self.generator,
            ops: self.ops,
            lines: self.lines,
            line_starts: self.line_starts,
            labels,
            handlers,
            consts: self.consts,
        }))
    }
}
