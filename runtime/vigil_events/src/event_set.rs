//! Event sets: the bitmask tools arm.
//!
//! # Derived bits
//!
//! `C_RETURN` and `C_RAISE` exist as bits so tools can name them, but a stored
//! mask never keeps them: arming `CALL` is what enables their delivery.
//! [`EventSet::arms_derived_without_parent`] is the validation rule,
//! [`EventSet::normalized`] the storage rule.

use std::fmt;

use bitflags::bitflags;

use crate::Event;

bitflags! {
    /// A set of [`Event`]s, one bit per kind.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct EventSet: u32 {
        const PY_START = 1 << 0;
        const PY_RESUME = 1 << 1;
        const PY_RETURN = 1 << 2;
        const PY_YIELD = 1 << 3;
        const CALL = 1 << 4;
        const LINE = 1 << 5;
        const INSTRUCTION = 1 << 6;
        const JUMP = 1 << 7;
        const BRANCH = 1 << 8;
        const STOP_ITERATION = 1 << 9;
        const RAISE = 1 << 10;
        const EXCEPTION_HANDLED = 1 << 11;
        const PY_UNWIND = 1 << 12;
        const C_RETURN = 1 << 13;
        const C_RAISE = 1 << 14;
    }
}

/// Error when a raw mask carries bits that name no event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid event set 0x{bits:x}: bits 0x{unknown:x} name no event")]
pub struct UnknownEventBits {
    /// The raw mask as given.
    pub bits: u32,
    /// The offending bits.
    pub unknown: u32,
}

impl EventSet {
    /// The empty set.
    pub const NO_EVENTS: Self = Self::empty();

    /// Bits that may only be delivered through `CALL`.
    pub const DERIVED: Self = Self::C_RETURN.union(Self::C_RAISE);

    /// Frame-boundary events reported as the interpreter enters a frame.
    pub const FRAME_ENTRY: Self = Self::PY_START.union(Self::PY_RESUME);

    /// Frame-boundary events reported as the interpreter leaves a frame.
    pub const FRAME_EXIT: Self = Self::PY_RETURN
        .union(Self::PY_YIELD)
        .union(Self::PY_UNWIND);

    /// Whether `event` is in the set.
    #[inline]
    pub const fn has(self, event: Event) -> bool {
        self.contains(event.bit())
    }

    /// Whether the set names a derived bit without its `CALL` parent.
    #[inline]
    pub const fn arms_derived_without_parent(self) -> bool {
        self.intersects(Self::DERIVED) && !self.contains(Self::CALL)
    }

    /// The set as stored: derived bits removed (they ride on `CALL`).
    #[inline]
    #[must_use]
    pub const fn normalized(self) -> Self {
        self.difference(Self::DERIVED)
    }

    /// The set as delivered: derived bits added when `CALL` is present.
    #[inline]
    #[must_use]
    pub const fn with_derived(self) -> Self {
        if self.contains(Self::CALL) {
            self.union(Self::DERIVED)
        } else {
            self
        }
    }

    /// Iterate over the events in the set, in bit order.
    pub fn events(self) -> impl Iterator<Item = Event> {
        Event::ALL.into_iter().filter(move |event| self.has(*event))
    }
}

impl From<Event> for EventSet {
    fn from(event: Event) -> Self {
        event.bit()
    }
}

impl FromIterator<Event> for EventSet {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        iter.into_iter()
            .fold(EventSet::empty(), |set, event| set | event.bit())
    }
}

impl TryFrom<u32> for EventSet {
    type Error = UnknownEventBits;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        EventSet::from_bits(bits).ok_or(UnknownEventBits {
            bits,
            unknown: bits & !EventSet::all().bits(),
        })
    }
}

impl fmt::Display for EventSet {
    /// `NO_EVENTS`, or event names joined with `" | "`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NO_EVENTS");
        }
        let mut first = true;
        for event in self.events() {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(event.name())?;
            first = false;
        }
        Ok(())
    }
}
