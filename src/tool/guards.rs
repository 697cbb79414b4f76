//! Per-turn `ToolGuards`: policy guards expressed as data consulted by the
//! dispatch pipeline, not as wrappers constructed around individual tools
//! (see SPEC_FULL.md §9, "Nested tool wrappers for policy guards").

use std::sync::Mutex;

/// A single guarded tool and its unmet-prerequisite behavior.
#[derive(Debug, Clone)]
pub struct GuardRule {
    pub tool: String,
    pub requires_skill_loaded: bool,
    pub requires_prior_tool: Option<String>,
}

#[derive(Default)]
struct GuardState {
    called: Vec<String>,
    skill_loaded: bool,
}

#[derive(Default)]
pub struct ToolGuards {
    rules: Vec<GuardRule>,
    state: Mutex<GuardState>,
}

impl ToolGuards {
    pub fn new(rules: Vec<GuardRule>) -> Self {
        Self {
            rules,
            state: Mutex::new(GuardState::default()),
        }
    }

    /// Called by the `skill` tool on every successful load, so
    /// skill-loaded-first guards unlock for the rest of the turn.
    pub fn mark_skill_loaded(&self) {
        self.state.lock().unwrap().skill_loaded = true;
    }

    pub fn record_call(&self, name: &str) {
        self.state.lock().unwrap().called.push(name.to_string());
        if name == "skill" {
            self.mark_skill_loaded();
        }
    }

    /// `Some(reason)` if `name`'s guard prerequisite hasn't fired yet.
    pub fn check(&self, name: &str) -> Option<String> {
        let rule = self.rules.iter().find(|r| r.tool == name)?;
        let state = self.state.lock().unwrap();
        if rule.requires_skill_loaded && !state.skill_loaded {
            return Some(format!("{name} requires a skill to be loaded first"));
        }
        if let Some(prior) = &rule.requires_prior_tool {
            if !state.called.iter().any(|c| c == prior) {
                return Some(format!("{name} requires {prior} to run first"));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_until_skill_loaded() {
        let guards = ToolGuards::new(vec![GuardRule {
            tool: "write".into(),
            requires_skill_loaded: true,
            requires_prior_tool: None,
        }]);
        assert!(guards.check("write").is_some());
        guards.record_call("skill");
        assert!(guards.check("write").is_none());
    }

    #[test]
    fn denies_until_prior_tool_called() {
        let guards = ToolGuards::new(vec![GuardRule {
            tool: "edit".into(),
            requires_skill_loaded: false,
            requires_prior_tool: Some("read".into()),
        }]);
        assert!(guards.check("edit").is_some());
        guards.record_call("read");
        assert!(guards.check("edit").is_none());
    }

    #[test]
    fn unguarded_tool_always_allowed() {
        let guards = ToolGuards::default();
        assert!(guards.check("bash").is_none());
    }
}
