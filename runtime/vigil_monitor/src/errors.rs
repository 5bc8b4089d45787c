//! Registry errors.
//!
//! Every registry operation validates fully before touching state, so an
//! `Err` means nothing changed.

use vigil_events::{Event, EventSet, InvalidToolId, Shape, ToolId, UnknownEvent, UnknownEventBits};

/// Error from a tool, callback, or event-set operation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    /// The integer does not name a tool slot.
    #[error(transparent)]
    InvalidTool(#[from] InvalidToolId),

    /// `use_tool_id` on a claimed slot.
    #[error("tool {tool} is already in use by '{owner}'")]
    ToolInUse { tool: ToolId, owner: String },

    /// Operation on a slot nobody claimed.
    #[error("tool {tool} is not in use")]
    ToolNotInUse { tool: ToolId },

    /// A raw mask carries bits that name no event.
    #[error(transparent)]
    UnknownEventBits(#[from] UnknownEventBits),

    /// An event name that does not parse.
    #[error(transparent)]
    UnknownEvent(#[from] UnknownEvent),

    /// `C_RETURN` or `C_RAISE` without `CALL`.
    #[error("cannot set C_RETURN or C_RAISE events independently (got {events})")]
    DerivedWithoutCall { events: EventSet },

    /// A callback registered for an event delivered with another payload shape.
    #[error("{event} is delivered with {expected} payloads, not {found}")]
    ShapeMismatch {
        event: Event,
        expected: Shape,
        found: Shape,
    },
}
