use crate::error::ToolError;
use crate::tool::{DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::json;

pub struct SpawnAgentTool;

#[async_trait]
impl Tool for SpawnAgentTool {
    fn name(&self) -> &str {
        "spawnAgent"
    }

    fn description(&self) -> &str {
        "Run a task with a focused sub-agent restricted to a subset of tools"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "task": {"type": "string"},
                "agentType": {"type": "string", "enum": ["explore", "research", "general"]}
            },
            "required": ["task", "agentType"]
        })
    }

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Restricted
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let task = args.get("task").and_then(|v| v.as_str()).ok_or_else(|| {
            ToolError::ValidationError("task is required".into())
        })?;
        let agent_type = args
            .get("agentType")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("agentType is required".into()))?;

        let text = (ctx.spawn_agent)(task.to_string(), agent_type.to_string()).await?;
        Ok(ToolResult::ok(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::pathgate::PathGate;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn ctx_with_spawn(
        spawn_agent: Arc<dyn Fn(String, String) -> futures::future::BoxFuture<'static, Result<String, ToolError>> + Send + Sync>,
    ) -> ToolContext {
        let dir = std::env::temp_dir();
        ToolContext {
            working_dir: dir.clone(),
            session_id: "t".into(),
            gate: Arc::new(PathGate::new(dir.clone(), vec![dir.clone()], vec![dir])),
            config: Arc::new(AgentConfig::for_tests()),
            abort_signal: CancellationToken::new(),
            spawn_depth: 0,
            auto_approve: false,
            approve_command: Arc::new(|_| Box::pin(async { crate::tool::ApprovalDecision::Approved })),
            ask_user: Arc::new(|_| Box::pin(async { Default::default() })),
            update_todos: Arc::new(|_| {}),
            spawn_agent,
        }
    }

    #[tokio::test]
    async fn delegates_to_spawn_agent_callback() {
        let ctx = ctx_with_spawn(Arc::new(|task, agent_type| {
            Box::pin(async move { Ok(format!("ran {agent_type}: {task}")) })
        }));
        let result =
            SpawnAgentTool.execute(json!({"task": "find bugs", "agentType": "explore"}), &ctx).await.unwrap();
        assert_eq!(result.content, "ran explore: find bugs");
    }

    #[tokio::test]
    async fn propagates_depth_denial() {
        let ctx = ctx_with_spawn(Arc::new(|_, _| {
            Box::pin(async { Err(ToolError::PolicyDenied("spawnAgent recursion depth exceeded".into())) })
        }));
        let err =
            SpawnAgentTool.execute(json!({"task": "x", "agentType": "general"}), &ctx).await.unwrap_err();
        assert_eq!(err.kind(), "PolicyDenied");
    }

    #[tokio::test]
    async fn missing_task_is_rejected() {
        let ctx = ctx_with_spawn(Arc::new(|_, _| Box::pin(async { Ok(String::new()) })));
        let err = SpawnAgentTool.execute(json!({"agentType": "general"}), &ctx).await.unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }
}
