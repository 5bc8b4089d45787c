//! Tool slot ownership.

use vigil_events::{ToolId, ToolSet};

use crate::MonitorError;

/// Names of the tools currently holding each slot.
#[derive(Default)]
pub(crate) struct ToolTable {
    owners: [Option<String>; ToolId::COUNT],
}

impl ToolTable {
    /// Claim `tool` for `name`.
    pub(crate) fn claim(&mut self, tool: ToolId, name: String) -> Result<(), MonitorError> {
        let slot = &mut self.owners[tool.index()];
        if let Some(owner) = slot {
            return Err(MonitorError::ToolInUse {
                tool,
                owner: owner.clone(),
            });
        }
        *slot = Some(name);
        Ok(())
    }

    /// Release `tool`, returning the name it was claimed under.
    pub(crate) fn release(&mut self, tool: ToolId) -> Result<String, MonitorError> {
        self.owners[tool.index()]
            .take()
            .ok_or(MonitorError::ToolNotInUse { tool })
    }

    #[inline]
    pub(crate) fn name(&self, tool: ToolId) -> Option<&str> {
        self.owners[tool.index()].as_deref()
    }

    #[inline]
    pub(crate) fn in_use(&self, tool: ToolId) -> bool {
        self.owners[tool.index()].is_some()
    }

    /// Fail with `ToolNotInUse` unless `tool` is claimed.
    pub(crate) fn require(&self, tool: ToolId) -> Result<(), MonitorError> {
        if self.in_use(tool) {
            Ok(())
        } else {
            Err(MonitorError::ToolNotInUse { tool })
        }
    }

    /// Every claimed slot.
    pub(crate) fn claimed(&self) -> ToolSet {
        ToolId::ALL
            .into_iter()
            .filter(|tool| self.in_use(*tool))
            .collect()
    }
}
