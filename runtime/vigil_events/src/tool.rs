//! Tool slots.
//!
//! A tool is an independent observer (debugger, coverage tracker, profiler)
//! attached under one of a small, fixed number of slots. Slot order is the
//! only ordering the dispatcher guarantees between tools.

use std::fmt;

/// Error when an integer does not name a tool slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid tool {0} (must be between 0 and {max})", max = ToolId::COUNT - 1)]
pub struct InvalidToolId(pub u32);

/// A validated tool slot in `0..ToolId::COUNT`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToolId(u8);

impl ToolId {
    /// Number of tool slots.
    pub const COUNT: usize = 6;

    /// Slot conventionally claimed by debuggers.
    pub const DEBUGGER: ToolId = ToolId(0);
    /// Slot conventionally claimed by coverage tools.
    pub const COVERAGE: ToolId = ToolId(1);
    /// Slot conventionally claimed by profilers.
    pub const PROFILER: ToolId = ToolId(2);
    /// Slot conventionally claimed by optimizers.
    pub const OPTIMIZER: ToolId = ToolId(5);

    /// Every slot, ascending.
    pub const ALL: [ToolId; ToolId::COUNT] = [
        ToolId(0),
        ToolId(1),
        ToolId(2),
        ToolId(3),
        ToolId(4),
        ToolId(5),
    ];

    /// Create a tool id, or `None` if `slot` is out of range.
    #[inline]
    pub const fn new(slot: u8) -> Option<ToolId> {
        if (slot as usize) < Self::COUNT {
            Some(ToolId(slot))
        } else {
            None
        }
    }

    /// The slot number.
    #[inline]
    pub const fn slot(self) -> u8 {
        self.0
    }

    /// The slot as an index into per-tool tables.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// `1 << slot`, the tool's bit in a [`ToolSet`].
    #[inline]
    pub const fn bit(self) -> u8 {
        1 << self.0
    }
}

impl TryFrom<u32> for ToolId {
    type Error = InvalidToolId;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(ToolId::new)
            .ok_or(InvalidToolId(value))
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A set of tools, stored as `1 << slot` bits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ToolSet(u8);

impl ToolSet {
    /// No tools.
    pub const EMPTY: ToolSet = ToolSet(0);

    /// Build from raw bits, ignoring bits above the last slot.
    #[inline]
    pub const fn from_bits_truncate(bits: u8) -> ToolSet {
        ToolSet(bits & ((1 << ToolId::COUNT) - 1))
    }

    /// The raw bits (`OR` of `1 << slot`).
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, tool: ToolId) -> bool {
        self.0 & tool.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, tool: ToolId) {
        self.0 |= tool.bit();
    }

    #[inline]
    pub fn remove(&mut self, tool: ToolId) {
        self.0 &= !tool.bit();
    }

    #[inline]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Tools in ascending slot order.
    pub fn iter(self) -> impl Iterator<Item = ToolId> {
        ToolId::ALL.into_iter().filter(move |tool| self.contains(*tool))
    }
}

impl FromIterator<ToolId> for ToolSet {
    fn from_iter<I: IntoIterator<Item = ToolId>>(iter: I) -> Self {
        let mut set = ToolSet::EMPTY;
        for tool in iter {
            set.insert(tool);
        }
        set
    }
}

impl fmt::Display for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, tool) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{tool}")?;
        }
        f.write_str("}")
    }
}
