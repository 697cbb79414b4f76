pub mod builtin;
pub mod guards;
pub mod permissions;
pub mod types;

pub use guards::ToolGuards;
pub use permissions::{PermissionMatrix, PermissionStatus};
pub use types::*;

use crate::error::ToolError;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Exposes the fixed tool catalog to the turn driver and runs the dispatch
/// pipeline from the spec: validate, log, check cancellation, check guards,
/// execute, log, return. Owned exclusively by one `TurnContext`.
pub struct ToolRuntime {
    tools: HashMap<String, Box<dyn Tool>>,
    permissions: RwLock<PermissionMatrix>,
    guards: ToolGuards,
}

impl ToolRuntime {
    pub fn new(mode: ToolMode) -> Self {
        Self {
            tools: HashMap::new(),
            permissions: RwLock::new(PermissionMatrix::new(mode)),
            guards: ToolGuards::default(),
        }
    }

    pub fn with_guards(mut self, guards: ToolGuards) -> Self {
        self.guards = guards;
        self
    }

    pub fn register_tool(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn list_tools(&self) -> Vec<&dyn Tool> {
        self.tools.values().map(|t| t.as_ref()).collect()
    }

    pub async fn set_tool_mode(&self, mode: ToolMode) {
        self.permissions.write().await.set_mode(mode);
    }

    pub async fn tool_mode(&self) -> ToolMode {
        self.permissions.read().await.mode()
    }

    /// Restrict the catalog to exactly `names` (used to build a sub-agent's
    /// tool subset). Unknown names are ignored.
    pub fn restrict_to(&mut self, names: &[&str]) {
        self.tools.retain(|name, _| names.contains(&name.as_str()));
    }

    /// The dispatch pipeline from spec §4.2: every tool call goes through
    /// this, never `Tool::execute` directly.
    pub async fn call(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(format!("tool not found: {name}")))?;

        info!(tool = name, args = %safe_args(&args), "tool>");

        if ctx.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        // `bash` owns its own approval flow (classifies the command and
        // calls ctx.approve_command itself); every other restricted tool
        // is only gated by the session's coarse ToolMode, not by a
        // per-call approval prompt — PathGate/NotFound/Validation failures
        // inside the tool are the only other way it can fail.
        if name != "bash" {
            let status = {
                let perms = self.permissions.read().await;
                perms.check_tool_permission(tool.danger_level())
            };
            if status == PermissionStatus::Denied {
                return Err(ToolError::PolicyDenied(format!(
                    "{name} is not permitted in the current tool mode"
                )));
            }
        }

        if let Some(reason) = self.guards.check(name) {
            return Err(ToolError::PolicyDenied(reason));
        }

        let result = tool.execute(args, ctx).await;

        match &result {
            Ok(r) => debug!(tool = name, error = r.is_error, "tool<"),
            Err(e) => debug!(tool = name, kind = e.kind(), "tool<"),
        }

        if result.is_ok() {
            self.guards.record_call(name);
        }

        result
    }
}

fn safe_args(args: &serde_json::Value) -> String {
    let rendered = args.to_string();
    if rendered.len() > 200 {
        format!("{}…", &rendered[..200])
    } else {
        rendered
    }
}

/// Build a runtime carrying the full, unrestricted tool catalog.
pub fn full_catalog(mode: ToolMode) -> ToolRuntime {
    let mut rt = ToolRuntime::new(mode);
    rt.register_tool(Box::new(builtin::BashTool));
    rt.register_tool(Box::new(builtin::ReadTool));
    rt.register_tool(Box::new(builtin::WriteTool));
    rt.register_tool(Box::new(builtin::EditTool));
    rt.register_tool(Box::new(builtin::GlobTool));
    rt.register_tool(Box::new(builtin::GrepTool));
    rt.register_tool(Box::new(builtin::WebSearchTool::new()));
    rt.register_tool(Box::new(builtin::WebFetchTool::new()));
    rt.register_tool(Box::new(builtin::AskTool));
    rt.register_tool(Box::new(builtin::TodoWriteTool));
    rt.register_tool(Box::new(builtin::NotebookEditTool));
    rt.register_tool(Box::new(builtin::SkillTool));
    rt.register_tool(Box::new(builtin::MemoryTool));
    rt.register_tool(Box::new(builtin::SpawnAgentTool));
    rt
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct MockTool {
        name: String,
        danger: DangerLevel,
    }

    #[async_trait]
    impl Tool for MockTool {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            "mock"
        }
        fn parameters(&self) -> serde_json::Value {
            json!({})
        }
        fn danger_level(&self) -> DangerLevel {
            self.danger
        }
        async fn execute(
            &self,
            _: serde_json::Value,
            _: &ToolContext,
        ) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::ok("ok"))
        }
    }

    fn test_ctx() -> ToolContext {
        use crate::config::AgentConfig;
        use crate::pathgate::PathGate;
        use std::sync::Arc;
        use tokio_util::sync::CancellationToken;

        let dir = std::env::temp_dir();
        ToolContext {
            working_dir: dir.clone(),
            session_id: "test".into(),
            gate: Arc::new(PathGate::new(dir.clone(), vec![dir.clone()], vec![dir])),
            config: Arc::new(AgentConfig::for_tests()),
            abort_signal: CancellationToken::new(),
            spawn_depth: 0,
            auto_approve: false,
            approve_command: std::sync::Arc::new(|_| Box::pin(async { ApprovalDecision::Approved })),
            ask_user: std::sync::Arc::new(|_| Box::pin(async { Default::default() })),
            update_todos: std::sync::Arc::new(|_| {}),
            spawn_agent: std::sync::Arc::new(|_, _| {
                Box::pin(async { Err(ToolError::PolicyDenied("spawnAgent unavailable in this test context".into())) })
            }),
        }
    }

    #[tokio::test]
    async fn read_mode_denies_restricted_non_bash_tool() {
        let mut rt = ToolRuntime::new(ToolMode::Read);
        rt.register_tool(Box::new(MockTool {
            name: "mutate".into(),
            danger: DangerLevel::Restricted,
        }));
        let err = rt.call("mutate", json!({}), &test_ctx()).await.unwrap_err();
        assert_eq!(err.kind(), "PolicyDenied");
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let rt = ToolRuntime::new(ToolMode::Write);
        let err = rt.call("nope", json!({}), &test_ctx()).await.unwrap_err();
        assert_eq!(err.kind(), "NotFound");
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let mut rt = ToolRuntime::new(ToolMode::Write);
        rt.register_tool(Box::new(MockTool {
            name: "mutate".into(),
            danger: DangerLevel::Safe,
        }));
        let ctx = test_ctx();
        ctx.abort_signal.cancel();
        let err = rt.call("mutate", json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.kind(), "Cancelled");
    }
}
