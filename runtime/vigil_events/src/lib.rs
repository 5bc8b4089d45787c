//! Vigil Events - the vocabulary shared by the instrumentation core and its hosts.
//!
//! This crate has no runtime state. It defines:
//! - [`Event`]: the closed set of monitorable event kinds, with static metadata
//!   (bit, canonical name, payload [`Shape`], derived parent)
//! - [`EventSet`]: a bitmask of events, the unit tools arm
//! - [`ToolId`] / [`ToolSet`]: validated tool slots and sets of them
//!
//! Everything here is `Copy` and cheap to pass by value.

mod event;
mod event_set;
mod tool;

pub use event::{Event, Shape, UnknownEvent};
pub use event_set::{EventSet, UnknownEventBits};
pub use tool::{InvalidToolId, ToolId, ToolSet};
