//! Event delivery, the disabled-set, and restart.
//!
//! `fire` snapshots the eligible (tool, callback) pairs under the read lock
//! and runs them with no lock held. If a callback changes registrations
//! (the version moves), each remaining tool is re-checked before it runs, so
//! a tool freed or disarmed mid-dispatch is not called again.

use std::sync::atomic::Ordering;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use vigil_events::{Event, ToolId};

use crate::callbacks::{Action, Callback};
use crate::payload::Payload;
use crate::state::Tables;
use crate::{CodeId, Host, Monitoring};

/// A (tool, event) switched off at one instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct Disabled {
    tool: ToolId,
    event: Event,
    code: CodeId,
    offset: u32,
}

/// Locations where a callback returned [`Action::Disable`].
#[derive(Default)]
pub(crate) struct DisabledSet {
    entries: FxHashSet<Disabled>,
}

impl DisabledSet {
    /// Record a disable. Returns `false` if it was already recorded.
    pub(crate) fn insert(&mut self, tool: ToolId, event: Event, code: CodeId, offset: u32) -> bool {
        self.entries.insert(Disabled {
            tool,
            event,
            code,
            offset,
        })
    }

    /// Whether `event` is off for `tool` at the location. A derived event
    /// is also off wherever its parent is.
    pub(crate) fn contains(&self, tool: ToolId, event: Event, code: CodeId, offset: u32) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let hit = |event| {
            self.entries.contains(&Disabled {
                tool,
                event,
                code,
                offset,
            })
        };
        hit(event) || event.parent().is_some_and(hit)
    }

    /// Drop the tool's entries, returning how many there were.
    pub(crate) fn clear_tool(&mut self, tool: ToolId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.tool != tool);
        before - self.entries.len()
    }

    pub(crate) fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

type Targets<H> = SmallVec<[(ToolId, Callback<H>); ToolId::COUNT]>;

impl<H: Host> Tables<H> {
    /// The callback `tool` gets for `event` at the location, if it is
    /// eligible there.
    fn target(&self, tool: ToolId, event: Event, code: CodeId, offset: u32) -> Option<&Callback<H>> {
        let callback = self.callbacks.get(tool, event)?;
        let armed = self.events.effective(tool, code).has(event)
            && !self.disabled.contains(tool, event, code, offset);
        armed.then_some(callback)
    }

    /// Eligible tools in ascending slot order.
    fn targets(&self, event: Event, code: CodeId, offset: u32) -> Targets<H> {
        ToolId::ALL
            .into_iter()
            .filter_map(|tool| {
                self.target(tool, event, code, offset)
                    .map(|callback| (tool, callback.clone()))
            })
            .collect()
    }
}

impl<H: Host> Monitoring<H> {
    /// Whether any tool arms `event` anywhere. Hosts check this before
    /// building a payload.
    #[inline]
    pub fn is_armed(&self, event: Event) -> bool {
        self.armed.load(Ordering::Relaxed) & event.bit().bits() != 0
    }

    /// Deliver `event` to every eligible tool in ascending slot order.
    ///
    /// # Errors
    /// The first callback fault. Later tools are not called.
    pub fn fire(&self, event: Event, payload: &Payload<'_, H::Value>) -> Result<(), H::Fault> {
        if !self.is_armed(event) {
            return Ok(());
        }
        debug_assert_eq!(payload.shape(), event.shape());

        let code = payload.code().id();
        let offset = payload.offset();
        let (targets, version) = {
            let tables = self.tables.read();
            (tables.targets(event, code, offset), self.version())
        };

        for (tool, callback) in targets {
            let callback = if self.version() == version {
                callback
            } else {
                match self.tables.read().target(tool, event, code, offset) {
                    Some(current) => current.clone(),
                    None => continue,
                }
            };
            if callback.invoke(payload)? == Action::Disable {
                self.disable(tool, event, code, offset);
            }
        }
        Ok(())
    }

    fn disable(&self, tool: ToolId, event: Event, code: CodeId, offset: u32) {
        let mut tables = self.tables.write();
        if tables.disabled.insert(tool, event, code, offset) {
            self.version.fetch_add(1, Ordering::AcqRel);
            tracing::trace!(%tool, %event, %code, offset, "event disabled at location");
        }
    }

    /// Re-enable every location any callback disabled.
    pub fn restart_events(&self) {
        let mut tables = self.tables.write();
        let cleared = tables.disabled.clear();
        self.version.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(cleared, "events restarted");
    }

    /// Number of disabled (tool, event, location) entries.
    pub fn disabled_count(&self) -> usize {
        self.tables.read().disabled.len()
    }
}
