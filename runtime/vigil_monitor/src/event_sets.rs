//! Global and per-code event sets.
//!
//! Masks are stored normalized (no derived bits). A tool's effective mask in
//! a code unit is its global mask joined with its local mask there.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use vigil_events::{Event, EventSet, ToolId, ToolSet};

use crate::CodeId;

type PerTool = [EventSet; ToolId::COUNT];

#[derive(Default)]
pub(crate) struct EventSets {
    global: PerTool,
    local: FxHashMap<CodeId, PerTool>,
}

impl EventSets {
    #[inline]
    pub(crate) fn global(&self, tool: ToolId) -> EventSet {
        self.global[tool.index()]
    }

    pub(crate) fn set_global(&mut self, tool: ToolId, events: EventSet) {
        self.global[tool.index()] = events.normalized();
    }

    pub(crate) fn local(&self, tool: ToolId, code: CodeId) -> EventSet {
        self.local
            .get(&code)
            .map_or(EventSet::NO_EVENTS, |masks| masks[tool.index()])
    }

    /// Store a local mask, dropping the code's entry once every tool's mask
    /// there is empty.
    pub(crate) fn set_local(&mut self, tool: ToolId, code: CodeId, events: EventSet) {
        let events = events.normalized();
        if events.is_empty() {
            if let Some(masks) = self.local.get_mut(&code) {
                masks[tool.index()] = EventSet::NO_EVENTS;
                if masks.iter().all(|mask| mask.is_empty()) {
                    self.local.remove(&code);
                }
            }
            return;
        }
        self.local
            .entry(code)
            .or_insert([EventSet::NO_EVENTS; ToolId::COUNT])[tool.index()] = events;
    }

    /// `global | local(code)`, with derived bits added when `CALL` is armed.
    #[inline]
    pub(crate) fn effective(&self, tool: ToolId, code: CodeId) -> EventSet {
        (self.global(tool) | self.local(tool, code)).with_derived()
    }

    /// Zero the tool's global mask and every local mask it set.
    pub(crate) fn clear_tool(&mut self, tool: ToolId) {
        self.global[tool.index()] = EventSet::NO_EVENTS;
        self.local.retain(|_, masks| {
            masks[tool.index()] = EventSet::NO_EVENTS;
            masks.iter().any(|mask| !mask.is_empty())
        });
    }

    /// Drop every per-code table.
    pub(crate) fn clear_local(&mut self) {
        self.local = FxHashMap::default();
    }

    /// Number of code units with a local mask.
    pub(crate) fn local_codes(&self) -> usize {
        self.local.len()
    }

    /// Everything any tool arms anywhere, derived bits included.
    pub(crate) fn armed(&self) -> EventSet {
        let global = self.global.iter().copied().fold(EventSet::NO_EVENTS, |a, b| a | b);
        self.local
            .values()
            .flatten()
            .copied()
            .fold(global, |a, b| a | b)
            .with_derived()
    }

    /// The tools arming each event, globally or in some code unit.
    pub(crate) fn by_event(&self) -> BTreeMap<Event, ToolSet> {
        let mut out: BTreeMap<Event, ToolSet> = BTreeMap::new();
        for tool in ToolId::ALL {
            let local = self
                .local
                .values()
                .fold(EventSet::NO_EVENTS, |acc, masks| acc | masks[tool.index()]);
            for event in (self.global(tool) | local).events() {
                out.entry(event).or_default().insert(tool);
            }
        }
        out
    }
}
