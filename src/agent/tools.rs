//! Per-turn tool set construction: the full catalog by default, or the
//! restricted subset a `spawnAgent` call is allowed (§4.2).

use crate::agent::context::AgentType;
use crate::provider::ToolDefinition;
use crate::tool::{ToolMode, ToolRuntime, full_catalog};

/// Tool names allowed for each `spawnAgent` sub-agent type.
pub fn allowed_tool_names(agent_type: AgentType) -> Option<&'static [&'static str]> {
    match agent_type {
        AgentType::Root => None,
        AgentType::Explore => Some(&["read", "glob", "grep", "bash"]),
        AgentType::Research => Some(&["read", "webSearch", "webFetch"]),
        AgentType::General => Some(&[
            "read", "write", "edit", "glob", "grep", "webSearch", "webFetch", "notebookEdit", "skill", "memory",
        ]),
    }
}

/// Build the `ToolRuntime` for a turn: the full catalog for the root turn,
/// or the type's restricted subset for a sub-agent.
pub fn build_runtime(mode: ToolMode, agent_type: AgentType) -> ToolRuntime {
    let mut runtime = full_catalog(mode);
    if let Some(names) = allowed_tool_names(agent_type) {
        runtime.restrict_to(names);
    }
    runtime
}

/// Provider-facing tool definitions for every tool currently registered in
/// `runtime`, used to populate `GenerateRequest.tools`.
pub fn tool_definitions(runtime: &ToolRuntime) -> Vec<ToolDefinition> {
    runtime
        .list_tools()
        .into_iter()
        .map(|tool| ToolDefinition {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_agent_gets_the_full_catalog() {
        assert!(allowed_tool_names(AgentType::Root).is_none());
    }

    #[test]
    fn explore_agent_is_restricted_to_read_only_tools() {
        let names = allowed_tool_names(AgentType::Explore).unwrap();
        assert!(names.contains(&"read"));
        assert!(!names.contains(&"write"));
    }

    #[test]
    fn build_runtime_restricts_registered_tools() {
        let runtime = build_runtime(ToolMode::Write, AgentType::Explore);
        let names: Vec<&str> = runtime.list_tools().iter().map(|t| t.name()).collect();
        assert!(names.contains(&"read"));
        assert!(!names.contains(&"write"));
        assert!(!names.contains(&"spawnAgent"));
    }
}
