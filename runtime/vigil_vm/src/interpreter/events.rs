//! Payload construction. Each helper checks the armed-event union first, so
//! unmonitored programs never build a payload.

use vigil_monitor::{
    Arg, BranchEvent, CallEvent, CodeEvent, Event, ExceptionEvent, InstructionEvent, LineEvent,
    Payload,
};

use super::Vm;
use crate::code::{offset_of, Code};
use crate::value::{Exception, Value};

impl Vm {
    pub(super) fn code_event(
        &self,
        event: Event,
        code: &Code,
        offset: u32,
        value: Option<&Value>,
    ) -> Result<(), Exception> {
        if !self.monitoring.is_armed(event) {
            return Ok(());
        }
        self.monitoring.fire(
            event,
            &Payload::Code(CodeEvent {
                code,
                offset,
                value,
            }),
        )
    }

    pub(super) fn call_event(
        &self,
        event: Event,
        code: &Code,
        offset: u32,
        callable: &Value,
        arg: Arg<'_, Value>,
    ) -> Result<(), Exception> {
        if !self.monitoring.is_armed(event) {
            return Ok(());
        }
        self.monitoring.fire(
            event,
            &Payload::Call(CallEvent {
                code,
                offset,
                callable,
                arg,
            }),
        )
    }

    pub(super) fn line_event(&self, code: &Code, offset: u32, line: u32) -> Result<(), Exception> {
        if !self.monitoring.is_armed(Event::Line) {
            return Ok(());
        }
        self.monitoring
            .fire(Event::Line, &Payload::Line(LineEvent { code, offset, line }))
    }

    pub(super) fn instruction_event(&self, code: &Code, offset: u32) -> Result<(), Exception> {
        if !self.monitoring.is_armed(Event::Instruction) {
            return Ok(());
        }
        self.monitoring.fire(
            Event::Instruction,
            &Payload::Instruction(InstructionEvent { code, offset }),
        )
    }

    pub(super) fn exception_event(
        &self,
        event: Event,
        code: &Code,
        offset: u32,
        exception: &Exception,
    ) -> Result<(), Exception> {
        if !self.monitoring.is_armed(event) {
            return Ok(());
        }
        let exception = Value::Exception(exception.clone());
        self.monitoring.fire(
            event,
            &Payload::Exception(ExceptionEvent {
                code,
                offset,
                exception: &exception,
            }),
        )
    }

    /// `JUMP` or `BRANCH` from instruction `from` to instruction `to`.
    pub(super) fn branch_event(
        &self,
        event: Event,
        code: &Code,
        from: usize,
        to: usize,
    ) -> Result<(), Exception> {
        if !self.monitoring.is_armed(event) {
            return Ok(());
        }
        self.monitoring.fire(
            event,
            &Payload::Branch(BranchEvent {
                code,
                from: offset_of(from),
                to: offset_of(to),
            }),
        )
    }
}
