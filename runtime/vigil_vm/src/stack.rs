//! Native stack for nested interpreted calls.
//!
//! Every interpreted call (`CALL`, a generator resume, a host `Vm::call`)
//! re-enters `Vm::execute`, so call depth is native recursion. A frame of
//! `execute` + `step` + `call_at` plus a callback dispatch with its `SmallVec`
//! snapshot stays well under [`FRAME_BYTES`].

/// Upper bound on the native stack one interpreted call level uses.
const FRAME_BYTES: usize = 16 * 1024;

/// Grow before entering a frame when less than this remains: room for the
/// frame itself plus a monitoring callback running inside it.
const RED_ZONE: usize = 4 * FRAME_BYTES;

/// Each new segment holds this many nested calls.
const FRAMES_PER_SEGMENT: usize = 128;

/// Run `f`, which enters one interpreted frame, on a stack with room for it.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, FRAMES_PER_SEGMENT * FRAME_BYTES, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
