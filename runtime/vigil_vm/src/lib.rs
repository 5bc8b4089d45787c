//! Vigil VM - a small stack-based interpreter instrumented with
//! [`vigil_monitor`].
//!
//! The interpreter exists to drive the instrumentation core end to end: it
//! reports frame entry and exit, calls, lines, instructions, branches and
//! exceptions exactly where a production runtime would. Programs are built
//! directly as bytecode with [`CodeBuilder`]; [`samples`] bundles the ones the
//! CLI and the tests run.

mod code;
mod interpreter;
mod limits;
pub mod natives;
pub mod samples;
mod stack;
mod value;

pub use code::{offset_of, BinOp, BuildError, Code, CodeBuilder, Handler, Label, Op};
pub use interpreter::{Vm, VmHost};
pub use limits::Limits;
pub use value::{Exception, ExceptionKind, Generator, IterState, Native, NativeFn, Value};

/// The monitoring state type the interpreter reports to.
pub type Monitoring = vigil_monitor::Monitoring<VmHost>;
