use crate::pathgate::CommandClass;
use crate::tool::types::{DangerLevel, ToolMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Allowed,
    NeedsApproval,
    Denied,
}

/// Backs the session's default `approveCommand`/tool-gate decision: given
/// the session's `ToolMode`, decide whether a command or a restricted tool
/// needs the user in the loop at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionMatrix {
    mode: ToolMode,
}

impl PermissionMatrix {
    #[must_use]
    pub fn new(mode: ToolMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ToolMode) {
        self.mode = mode;
    }

    #[must_use]
    pub fn check_command_permission(&self, class: CommandClass) -> PermissionStatus {
        match (self.mode, class) {
            (ToolMode::Read, _) => PermissionStatus::Denied,
            (ToolMode::Agi, _) => PermissionStatus::Allowed,
            (ToolMode::Write, CommandClass::Auto) => PermissionStatus::Allowed,
            (ToolMode::Write, CommandClass::Prompt { .. }) => PermissionStatus::NeedsApproval,
        }
    }

    #[must_use]
    pub fn check_tool_permission(&self, danger: DangerLevel) -> PermissionStatus {
        match (self.mode, danger) {
            (ToolMode::Read, DangerLevel::Safe) => PermissionStatus::Allowed,
            (ToolMode::Read, DangerLevel::Restricted) => PermissionStatus::Denied,
            (ToolMode::Agi, _) => PermissionStatus::Allowed,
            (ToolMode::Write, DangerLevel::Safe) => PermissionStatus::Allowed,
            (ToolMode::Write, DangerLevel::Restricted) => PermissionStatus::NeedsApproval,
        }
    }
}
