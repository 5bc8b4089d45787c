//! Vigil Monitor - the instrumentation core.
//!
//! A [`Monitoring`] instance is the process-wide instrumentation state of one
//! host runtime, injected into the host rather than reached through globals.
//! It owns four tables behind a single reader-friendly lock:
//!
//! - tool slots (`tools`): who owns which of the [`ToolId::COUNT`] slots
//! - callbacks (`callbacks`): one typed [`Callback`] per (tool, event)
//! - event sets (`event_sets`): global and per-code masks per tool
//! - the disabled-set (`dispatch`): (tool, event, location) triples a
//!   callback switched off by returning [`DISABLE`]
//!
//! # Dispatch
//!
//! The host calls [`Monitoring::fire`] at every monitorable occurrence after
//! checking [`Monitoring::is_armed`], a single relaxed atomic load. When no
//! tool arms an event the host never builds a payload.
//!
//! Callbacks run synchronously on the host's thread, in ascending tool order,
//! with no lock held. A callback fault is returned to the host unchanged.

mod callbacks;
mod dispatch;
mod errors;
mod event_sets;
mod host;
mod payload;
mod state;
mod tools;

#[cfg(test)]
mod test_support;

pub use callbacks::{Action, Callback, Outcome, DISABLE};
pub use errors::MonitorError;
pub use host::{CodeId, CodeUnit, Host};
pub use payload::{
    Arg, BranchEvent, CallEvent, CodeEvent, ExceptionEvent, InstructionEvent, LineEvent, Payload,
};
pub use state::{AllEvents, Monitoring};

pub use vigil_events::{
    Event, EventSet, InvalidToolId, Shape, ToolId, ToolSet, UnknownEvent, UnknownEventBits,
};
