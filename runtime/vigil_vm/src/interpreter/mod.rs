//! The bytecode loop.
//!
//! Each interpreted call runs [`Vm::execute`] on its own [`Frame`],
//! recursing on the native stack (guarded by `stacker` and
//! [`Limits::max_depth`]). Generators keep their suspended frame in the
//! generator object and re-enter `execute` on every resumption.
//!
//! # Events
//!
//! The loop reports every monitorable occurrence through the shared
//! [`Monitoring`]. Before each instruction it reports `LINE` (at a line start
//! whose line differs from the previous instruction's, or which was reached
//! by a jump) and then `INSTRUCTION`.
//!
//! A callback fault is an exception raised at the instruction being
//! executed. Faults from `RAISE` and `PY_UNWIND` callbacks replace the
//! exception already in flight.

mod events;
mod ops;

use std::sync::Arc;

use vigil_monitor::{Arg, Event, Host, Monitoring};

use crate::code::{offset_of, Code, Label, Op};
use crate::stack::ensure_sufficient_stack;
use crate::value::{Exception, ExceptionKind, Generator, Value};
use crate::Limits;

/// The interpreter's [`Host`] binding: payloads carry [`Value`]s and
/// callbacks fault with [`Exception`]s.
pub struct VmHost;

impl Host for VmHost {
    type Value = Value;
    type Fault = Exception;
}

/// An activation record.
pub(crate) struct Frame {
    pub(crate) code: Arc<Code>,
    pc: usize,
    locals: Vec<Value>,
    stack: Vec<Value>,
    /// Line of the last executed instruction that had one.
    last_line: Option<u32>,
    /// The current instruction was reached by a jump, branch or handler.
    jumped: bool,
    started: bool,
}

impl Frame {
    pub(crate) fn new(code: Arc<Code>, args: Vec<Value>) -> Result<Self, Exception> {
        if args.len() != code.params() {
            return Err(Exception::type_error(&format!(
                "{}() takes {} positional argument(s) but {} were given",
                code.name(),
                code.params(),
                args.len()
            )));
        }
        let mut locals = args;
        locals.resize(code.locals(), Value::None);
        Ok(Frame {
            code,
            pc: 0,
            locals,
            stack: Vec::new(),
            last_line: None,
            jumped: false,
            started: false,
        })
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Result<Value, Exception> {
        self.stack.pop().ok_or_else(stack_underflow)
    }

    fn peek(&self) -> Result<&Value, Exception> {
        self.stack.last().ok_or_else(stack_underflow)
    }

    /// Pop `n` values, oldest first.
    fn pop_n(&mut self, n: u32) -> Result<Vec<Value>, Exception> {
        let n = n as usize;
        if n > self.stack.len() {
            return Err(stack_underflow());
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn goto(&mut self, index: usize, jumped: bool) {
        self.pc = index;
        self.jumped = jumped;
    }
}

fn stack_underflow() -> Exception {
    Exception::new(ExceptionKind::RuntimeError, "value stack underflow")
}

fn jump_target(code: &Code, label: Label) -> Result<usize, Exception> {
    code.target(label).ok_or_else(|| {
        Exception::new(ExceptionKind::RuntimeError, "jump to an unknown label")
    })
}

/// How an `execute` run left its frame.
enum Exit {
    Return(Value),
    Yield(Value),
}

/// The reference interpreter.
pub struct Vm {
    monitoring: Arc<Monitoring<VmHost>>,
    limits: Limits,
    depth: usize,
}

impl Vm {
    pub fn new(monitoring: Arc<Monitoring<VmHost>>) -> Self {
        Self::with_limits(monitoring, Limits::default())
    }

    pub fn with_limits(monitoring: Arc<Monitoring<VmHost>>, limits: Limits) -> Self {
        Vm {
            monitoring,
            limits,
            depth: 0,
        }
    }

    pub fn monitoring(&self) -> &Arc<Monitoring<VmHost>> {
        &self.monitoring
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Call `callable` from the host.
    ///
    /// There is no calling code unit, so no `CALL` event is reported; events
    /// inside the callee are.
    ///
    /// # Errors
    /// The exception the call raised and did not handle.
    pub fn call(&mut self, callable: &Value, args: Vec<Value>) -> Result<Value, Exception> {
        match callable {
            Value::Function(code) => self.call_function(code, args),
            Value::Native(native) => (native.func)(&args),
            other => Err(not_callable(other)),
        }
    }

    fn call_function(&mut self, code: &Arc<Code>, args: Vec<Value>) -> Result<Value, Exception> {
        let mut frame = Frame::new(Arc::clone(code), args)?;
        if code.is_generator() {
            return Ok(Value::Generator(Arc::new(Generator::new(frame))));
        }
        match self.run(&mut frame)? {
            Exit::Return(value) => Ok(value),
            Exit::Yield(_) => Err(Exception::new(
                ExceptionKind::RuntimeError,
                "yield from a non-generator frame",
            )),
        }
    }

    /// Run `frame` one level deeper.
    fn run(&mut self, frame: &mut Frame) -> Result<Exit, Exception> {
        if self.depth >= self.limits.max_depth {
            tracing::debug!(depth = self.depth, code = frame.code.name(), "recursion limit hit");
            return Err(Exception::new(
                ExceptionKind::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }
        self.depth += 1;
        let exit = ensure_sufficient_stack(|| self.execute(frame));
        self.depth -= 1;
        exit
    }

    #[tracing::instrument(level = "trace", skip_all, fields(code = frame.code.name()))]
    fn execute(&mut self, frame: &mut Frame) -> Result<Exit, Exception> {
        let entry = if frame.started {
            Event::PyResume
        } else {
            Event::PyStart
        };
        frame.started = true;
        let code = Arc::clone(&frame.code);
        let mut pending = self
            .code_event(entry, &code, offset_of(frame.pc), None)
            .err();

        loop {
            if let Some(exception) = pending.take() {
                self.unwind(frame, exception)?;
            }
            match self.step(frame) {
                Ok(Some(exit)) => return Ok(exit),
                Ok(None) => {}
                Err(exception) => pending = Some(exception),
            }
        }
    }

    /// Route `exception` raised at the current instruction: into this
    /// frame's handler, or out of the frame.
    fn unwind(&self, frame: &mut Frame, mut exception: Exception) -> Result<(), Exception> {
        let code = Arc::clone(&frame.code);
        loop {
            let offset = offset_of(frame.pc);
            if let Err(fault) = self.exception_event(Event::Raise, &code, offset, &exception) {
                exception = fault;
            }

            let Some(handler) = code.handler_for(frame.pc) else {
                if let Err(fault) = self.exception_event(Event::PyUnwind, &code, offset, &exception)
                {
                    exception = fault;
                }
                tracing::trace!(code = code.name(), offset, %exception, "frame unwound");
                return Err(exception);
            };

            frame.stack.truncate(handler.depth);
            frame.goto(handler.target, true);
            let handled = self.exception_event(
                Event::ExceptionHandled,
                &code,
                offset_of(handler.target),
                &exception,
            );
            frame.push(Value::Exception(exception));
            match handled {
                Ok(()) => return Ok(()),
                Err(fault) => exception = fault,
            }
        }
    }

    /// `LINE` and `INSTRUCTION` for the instruction at `pc`.
    fn prelude(&self, frame: &mut Frame, code: &Code, pc: usize) -> Result<(), Exception> {
        let jumped = std::mem::take(&mut frame.jumped);
        let offset = offset_of(pc);
        if let Some(line) = code.line(pc) {
            let new_line = code.is_line_start(pc) && (jumped || frame.last_line != Some(line));
            frame.last_line = Some(line);
            if new_line {
                self.line_event(code, offset, line)?;
            }
        }
        self.instruction_event(code, offset)
    }

    /// Execute one instruction. `Some` when the frame returns or yields.
    fn step(&mut self, frame: &mut Frame) -> Result<Option<Exit>, Exception> {
        let code = Arc::clone(&frame.code);
        let pc = frame.pc;
        let offset = offset_of(pc);
        let op = code.op(pc).ok_or_else(|| {
            Exception::new(ExceptionKind::RuntimeError, "instruction pointer out of range")
        })?;
        self.prelude(frame, &code, pc)?;

        match op {
            Op::Nop => {}
            Op::LoadConst(index) => {
                let value = code.constant(index).cloned().ok_or_else(|| {
                    Exception::new(ExceptionKind::RuntimeError, "no such constant")
                })?;
                frame.push(value);
            }
            Op::LoadLocal(slot) => {
                let value = frame.locals.get(slot as usize).cloned().ok_or_else(|| {
                    Exception::new(ExceptionKind::RuntimeError, "no such local")
                })?;
                frame.push(value);
            }
            Op::StoreLocal(slot) => {
                let value = frame.pop()?;
                let local = frame.locals.get_mut(slot as usize).ok_or_else(|| {
                    Exception::new(ExceptionKind::RuntimeError, "no such local")
                })?;
                *local = value;
            }
            Op::PopTop => {
                frame.pop()?;
            }
            Op::BuildList(n) => {
                let items = frame.pop_n(n)?;
                frame.push(Value::list(items));
            }
            Op::Binary(op) => {
                let rhs = frame.pop()?;
                let lhs = frame.pop()?;
                frame.push(ops::binary(op, &lhs, &rhs)?);
            }
            Op::Call(argc) => {
                let args = frame.pop_n(argc)?;
                let callable = frame.pop()?;
                let result = self.call_at(&code, offset, &callable, args)?;
                frame.push(result);
            }
            Op::Return => {
                let value = frame.pop()?;
                self.code_event(Event::PyReturn, &code, offset, Some(&value))?;
                return Ok(Some(Exit::Return(value)));
            }
            Op::Yield => {
                let value = frame.pop()?;
                self.code_event(Event::PyYield, &code, offset, Some(&value))?;
                frame.goto(pc + 1, false);
                return Ok(Some(Exit::Yield(value)));
            }
            Op::Raise => {
                return Err(match frame.pop()? {
                    Value::Exception(exception) => exception,
                    other => Exception::type_error(&format!(
                        "exceptions must derive from BaseException, not '{}'",
                        other.type_name()
                    )),
                });
            }
            Op::Jump(label) => {
                let to = jump_target(&code, label)?;
                self.branch_event(Event::Jump, &code, pc, to)?;
                frame.goto(to, true);
                return Ok(None);
            }
            Op::PopJumpIfFalse(label) => {
                let taken = !frame.pop()?.is_truthy();
                let to = if taken { jump_target(&code, label)? } else { pc + 1 };
                self.branch_event(Event::Branch, &code, pc, to)?;
                frame.goto(to, taken);
                return Ok(None);
            }
            Op::GetIter => {
                let value = frame.pop()?;
                frame.push(ops::iterate(value)?);
            }
            Op::ForIter(label) => {
                self.for_iter(frame, &code, pc, jump_target(&code, label)?)?;
                return Ok(None);
            }
            Op::MatchException(class) => {
                let matched = match frame.peek()? {
                    Value::Exception(exception) => exception.kind.is_a(class),
                    other => {
                        return Err(Exception::type_error(&format!(
                            "'{}' is not an exception",
                            other.type_name()
                        )))
                    }
                };
                frame.push(Value::Bool(matched));
            }
        }

        frame.goto(pc + 1, false);
        Ok(None)
    }

    /// `CALL` from `code`, then the call itself, then `C_RETURN`/`C_RAISE`
    /// for anything that is not interpreted.
    fn call_at(
        &mut self,
        code: &Code,
        offset: u32,
        callable: &Value,
        args: Vec<Value>,
    ) -> Result<Value, Exception> {
        self.call_event(Event::Call, code, offset, callable, Arg::first_of(&args))?;
        if let Value::Function(callee) = callable {
            return self.call_function(callee, args);
        }

        let result = match callable {
            Value::Native(native) => (native.func)(&args),
            other => Err(not_callable(other)),
        };
        match result {
            Ok(value) => {
                self.call_event(Event::CReturn, code, offset, callable, Arg::first_of(&args))?;
                Ok(value)
            }
            Err(exception) => {
                let fault =
                    self.call_event(Event::CRaise, code, offset, callable, Arg::first_of(&args));
                Err(fault.err().unwrap_or(exception))
            }
        }
    }

    /// Advance the iterator on top of the stack; on exhaustion pop it and
    /// continue at `exit`. Both outcomes are reported as `BRANCH`.
    fn for_iter(
        &mut self,
        frame: &mut Frame,
        code: &Code,
        pc: usize,
        exit: usize,
    ) -> Result<(), Exception> {
        let iterator = frame.peek()?.clone();
        let next = match &iterator {
            Value::Iterator(state) => state.lock().next_value(),
            Value::Generator(generator) => self.resume(generator, code, pc)?,
            other => {
                return Err(Exception::type_error(&format!(
                    "'{}' object is not an iterator",
                    other.type_name()
                )))
            }
        };

        match next {
            Some(item) => {
                frame.push(item);
                self.branch_event(Event::Branch, code, pc, pc + 1)?;
                frame.goto(pc + 1, false);
            }
            None => {
                frame.pop()?;
                self.branch_event(Event::Branch, code, pc, exit)?;
                frame.goto(exit, true);
            }
        }
        Ok(())
    }

    /// Resume `generator` for the `ForIter` at `pc` in `code`. `None` when it
    /// is exhausted; a generator that returns here reports
    /// `STOP_ITERATION` in `code`.
    fn resume(
        &mut self,
        generator: &Generator,
        code: &Code,
        pc: usize,
    ) -> Result<Option<Value>, Exception> {
        let Some(mut slot) = generator.frame.try_lock() else {
            return Err(Exception::new(
                ExceptionKind::ValueError,
                "generator already executing",
            ));
        };
        let Some(frame) = slot.as_mut() else {
            return Ok(None);
        };

        match self.run(frame) {
            Ok(Exit::Yield(value)) => Ok(Some(value)),
            Ok(Exit::Return(value)) => {
                *slot = None;
                drop(slot);
                let message = match value {
                    Value::None => String::new(),
                    other => format!("{other:?}"),
                };
                let stop = Exception::new(ExceptionKind::StopIteration, &message);
                self.exception_event(Event::StopIteration, code, offset_of(pc), &stop)?;
                Ok(None)
            }
            Err(exception) => {
                *slot = None;
                Err(exception)
            }
        }
    }
}

fn not_callable(value: &Value) -> Exception {
    Exception::type_error(&format!(
        "'{}' object is not callable",
        value.type_name()
    ))
}
