//! What the core needs to know about the instrumented runtime.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Identity of a compiled code unit (a function body) for as long as it is
/// loaded. Keys local event sets and the disabled-set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeId(u32);

static NEXT_CODE_ID: AtomicU32 = AtomicU32::new(0);

impl CodeId {
    /// Wrap a host-assigned identity.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        CodeId(raw)
    }

    /// Allocate a process-unique identity.
    pub fn fresh() -> Self {
        CodeId(NEXT_CODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code#{}", self.0)
    }
}

/// A compiled code unit as callbacks see it.
pub trait CodeUnit: Send + Sync {
    /// Stable identity for local event sets.
    fn id(&self) -> CodeId;

    /// Function name.
    fn name(&self) -> &str;

    /// Line of the definition.
    fn first_line(&self) -> u32;

    /// Source line of the instruction at `offset`, if any.
    fn line_at(&self, offset: u32) -> Option<u32>;
}

impl fmt::Debug for dyn CodeUnit + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<code {} {}>", self.name(), self.id())
    }
}

/// The instrumented runtime's types.
///
/// `Value` is what payloads carry (callables, arguments, return values,
/// exceptions). `Fault` is what a callback raises into the running program.
pub trait Host: 'static {
    type Value: fmt::Debug + 'static;
    type Fault: 'static;
}
