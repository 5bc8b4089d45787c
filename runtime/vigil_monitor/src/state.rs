//! The injected instrumentation context and its registry operations.
//!
//! Every mutation goes through [`Monitoring::mutate`]: validate and apply
//! under the write lock, then republish the armed-event union and bump the
//! version. A failed operation leaves all tables untouched.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use parking_lot::RwLock;
use vigil_events::{Event, EventSet, ToolId, ToolSet};

use crate::callbacks::{Callback, CallbackTable};
use crate::dispatch::DisabledSet;
use crate::event_sets::EventSets;
use crate::tools::ToolTable;
use crate::{CodeId, Host, MonitorError};

/// For each armed event, the tools arming it.
pub type AllEvents = BTreeMap<Event, ToolSet>;

/// All registry tables, guarded together.
pub(crate) struct Tables<H: Host> {
    pub(crate) tools: ToolTable,
    pub(crate) callbacks: CallbackTable<H>,
    pub(crate) events: EventSets,
    pub(crate) disabled: DisabledSet,
}

/// Instrumentation state of one host runtime.
///
/// Share it as `Arc<Monitoring<H>>` between the host and the tools.
pub struct Monitoring<H: Host> {
    pub(crate) tables: RwLock<Tables<H>>,
    /// `armed()` of the tables, republished after every mutation.
    pub(crate) armed: AtomicU32,
    pub(crate) version: AtomicU64,
}

impl<H: Host> Default for Monitoring<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host> Monitoring<H> {
    /// Fresh state: no tools, nothing armed.
    pub fn new() -> Self {
        Monitoring {
            tables: RwLock::new(Tables {
                tools: ToolTable::default(),
                callbacks: CallbackTable::new(),
                events: EventSets::default(),
                disabled: DisabledSet::default(),
            }),
            armed: AtomicU32::new(0),
            version: AtomicU64::new(0),
        }
    }

    /// Apply `op` under the write lock. On success, publish the new armed
    /// union and bump the version.
    pub(crate) fn mutate<R>(
        &self,
        op: impl FnOnce(&mut Tables<H>) -> Result<R, MonitorError>,
    ) -> Result<R, MonitorError> {
        let mut tables = self.tables.write();
        let out = op(&mut tables)?;
        self.armed
            .store(tables.events.armed().bits(), Ordering::Release);
        self.version.fetch_add(1, Ordering::AcqRel);
        Ok(out)
    }

    /// Instrumentation version. Changes whenever tools, callbacks, event
    /// sets, or the disabled-set change.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    // Tools

    /// Claim `tool` under `name`.
    ///
    /// # Errors
    /// `ToolInUse` if another tool holds the slot.
    pub fn use_tool_id(&self, tool: ToolId, name: impl Into<String>) -> Result<(), MonitorError> {
        let name = name.into();
        self.mutate(|t| t.tools.claim(tool, name.clone()))?;
        tracing::debug!(%tool, name = %name, "tool claimed");
        Ok(())
    }

    /// Release `tool`, dropping its event sets, callbacks and disabled
    /// locations. Releasing the last claimed tool drops every per-code table.
    ///
    /// # Errors
    /// `ToolNotInUse` if nobody holds the slot.
    pub fn free_tool_id(&self, tool: ToolId) -> Result<(), MonitorError> {
        let name = self.mutate(|t| {
            let name = t.tools.release(tool)?;
            t.clear_tool(tool);
            if t.tools.claimed().is_empty() {
                t.events.clear_local();
                t.disabled.clear();
            }
            Ok(name)
        })?;
        tracing::debug!(%tool, name = %name, "tool freed");
        Ok(())
    }

    /// Drop `tool`'s event sets, callbacks and disabled locations while
    /// keeping the slot claimed.
    ///
    /// # Errors
    /// `ToolNotInUse` if nobody holds the slot.
    pub fn clear_tool_id(&self, tool: ToolId) -> Result<(), MonitorError> {
        self.mutate(|t| {
            t.tools.require(tool)?;
            t.clear_tool(tool);
            Ok(())
        })?;
        tracing::debug!(%tool, "tool cleared");
        Ok(())
    }

    /// Name `tool` was claimed under, if in use.
    pub fn get_tool(&self, tool: ToolId) -> Option<String> {
        self.tables.read().tools.name(tool).map(str::to_owned)
    }

    // Callbacks

    /// Install `callback` for (`tool`, `event`), or remove with `None`.
    /// Returns the callback previously installed.
    ///
    /// # Errors
    /// - `ShapeMismatch` if the callback's shape is not the event's.
    /// - `ToolNotInUse` when installing on an unclaimed slot.
    pub fn register_callback(
        &self,
        tool: ToolId,
        event: Event,
        callback: Option<Callback<H>>,
    ) -> Result<Option<Callback<H>>, MonitorError> {
        if let Some(cb) = &callback {
            if cb.shape() != event.shape() {
                return Err(MonitorError::ShapeMismatch {
                    event,
                    expected: event.shape(),
                    found: cb.shape(),
                });
            }
        }
        let installing = callback.is_some();
        let previous = self.mutate(|t| {
            if installing {
                t.tools.require(tool)?;
            }
            Ok(t.callbacks.swap(tool, event, callback))
        })?;
        tracing::debug!(%tool, %event, installing, "callback registered");
        Ok(previous)
    }

    // Event sets

    /// The tool's global mask; empty for an unclaimed slot.
    pub fn get_events(&self, tool: ToolId) -> EventSet {
        self.tables.read().events.global(tool)
    }

    /// Replace the tool's global mask.
    ///
    /// # Errors
    /// `ToolNotInUse` or `DerivedWithoutCall`.
    pub fn set_events(&self, tool: ToolId, events: EventSet) -> Result<(), MonitorError> {
        validate(events)?;
        self.mutate(|t| {
            t.tools.require(tool)?;
            t.events.set_global(tool, events);
            Ok(())
        })?;
        tracing::debug!(%tool, %events, "global events set");
        Ok(())
    }

    /// [`Monitoring::set_events`] from a raw mask.
    ///
    /// # Errors
    /// Also `UnknownEventBits` if the mask names no event.
    pub fn set_events_raw(&self, tool: ToolId, bits: u32) -> Result<(), MonitorError> {
        self.set_events(tool, EventSet::try_from(bits)?)
    }

    /// The tool's mask in `code`; empty when never set.
    pub fn get_local_events(&self, tool: ToolId, code: CodeId) -> EventSet {
        self.tables.read().events.local(tool, code)
    }

    /// Replace the tool's mask in `code`. `NO_EVENTS` removes it.
    ///
    /// # Errors
    /// `ToolNotInUse` or `DerivedWithoutCall`.
    pub fn set_local_events(
        &self,
        tool: ToolId,
        code: CodeId,
        events: EventSet,
    ) -> Result<(), MonitorError> {
        validate(events)?;
        self.mutate(|t| {
            t.tools.require(tool)?;
            t.events.set_local(tool, code, events);
            Ok(())
        })?;
        tracing::debug!(%tool, %code, %events, "local events set");
        Ok(())
    }

    /// Every armed event with the tools arming it, globally or locally.
    pub fn all_events(&self) -> AllEvents {
        self.tables.read().events.by_event()
    }
}

impl<H: Host> Tables<H> {
    fn clear_tool(&mut self, tool: ToolId) {
        let callbacks = self.callbacks.registered(tool).count();
        self.callbacks.clear_tool(tool);
        self.events.clear_tool(tool);
        let disabled = self.disabled.clear_tool(tool);
        tracing::trace!(%tool, callbacks, disabled, "tool state dropped");
    }
}

fn validate(events: EventSet) -> Result<(), MonitorError> {
    if events.arms_derived_without_parent() {
        return Err(MonitorError::DerivedWithoutCall { events });
    }
    Ok(())
}
