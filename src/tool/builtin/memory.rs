use crate::error::ToolError;
use crate::memory;
use crate::tool::{DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::json;

pub struct MemoryTool;

#[async_trait]
impl Tool for MemoryTool {
    fn name(&self) -> &str {
        "memory"
    }

    fn description(&self) -> &str {
        "Read, write, or search markdown notes in the session's memory directories"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["read", "write", "search"]},
                "key": {"type": "string"},
                "content": {"type": "string"},
                "query": {"type": "string"}
            },
            "required": ["action"]
        })
    }

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Restricted
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let action = args
            .get("action")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("action is required".into()))?;
        let key = args.get("key").and_then(|v| v.as_str());

        match action {
            "read" => match key {
                None | Some("hot") | Some("AGENT.md") => {
                    let content = memory::read_hot(&ctx.config.project_agent_dir, &ctx.config.user_agent_dir).await?;
                    Ok(ToolResult::ok(content))
                }
                Some(key) => {
                    let content = memory::read(&ctx.config.memory_dirs, key).await?;
                    Ok(ToolResult::ok(content))
                }
            },
            "write" => {
                let key = key.ok_or_else(|| ToolError::ValidationError("key is required for write".into()))?;
                let content = args
                    .get("content")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| ToolError::ValidationError("content is required for write".into()))?;
                memory::write(&ctx.config.memory_dirs, key, content).await?;
                Ok(ToolResult::ok(format!("Wrote memory entry: {key}")))
            }
            "search" => {
                let query = args
                    .get("query")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| ToolError::ValidationError("query is required for search".into()))?;
                let results = memory::search(&ctx.config.memory_dirs, query).await?;
                if results.is_empty() {
                    Ok(ToolResult::ok("No memory found."))
                } else {
                    Ok(ToolResult::ok_with_metadata(
                        results.join("\n"),
                        json!({"matchCount": results.len()}),
                    ))
                }
            }
            other => Err(ToolError::ValidationError(format!("unknown action: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::pathgate::PathGate;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn ctx_for(dir: &std::path::Path) -> ToolContext {
        let mut config = AgentConfig::for_tests();
        config.project_agent_dir = dir.join("project");
        config.user_agent_dir = dir.join("user");
        config.memory_dirs = vec![dir.join("project").join("memory"), dir.join("user").join("memory")];
        std::fs::create_dir_all(&config.project_agent_dir).unwrap();
        std::fs::create_dir_all(&config.user_agent_dir).unwrap();
        std::fs::create_dir_all(config.memory_dirs[0].clone()).unwrap();
        ToolContext {
            working_dir: dir.to_path_buf(),
            session_id: "t".into(),
            gate: Arc::new(PathGate::new(dir.to_path_buf(), vec![dir.to_path_buf()], vec![dir.to_path_buf()])),
            config: Arc::new(config),
            abort_signal: CancellationToken::new(),
            spawn_depth: 0,
            auto_approve: false,
            approve_command: Arc::new(|_| Box::pin(async { crate::tool::ApprovalDecision::Approved })),
            ask_user: Arc::new(|_| Box::pin(async { Default::default() })),
            update_todos: Arc::new(|_| {}),
            spawn_agent: Arc::new(|_, _| Box::pin(async { Err(crate::error::ToolError::PolicyDenied("spawnAgent unavailable in this test context".into())) })),
        }
    }

    #[tokio::test]
    async fn read_with_no_key_returns_project_agent_md() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_for(dir.path());
        std::fs::write(ctx.config.project_agent_dir.join("AGENT.md"), "hello project").unwrap();
        let result = MemoryTool.execute(json!({"action": "read"}), &ctx).await.unwrap();
        assert_eq!(result.content, "hello project");
    }

    #[tokio::test]
    async fn write_then_read_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_for(dir.path());
        MemoryTool
            .execute(json!({"action": "write", "key": "plan", "content": "notes here"}), &ctx)
            .await
            .unwrap();
        let result = MemoryTool.execute(json!({"action": "read", "key": "plan"}), &ctx).await.unwrap();
        assert_eq!(result.content, "notes here");
    }

    #[tokio::test]
    async fn search_with_no_matches_returns_literal_message() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_for(dir.path());
        let result = MemoryTool.execute(json!({"action": "search", "query": "nope"}), &ctx).await.unwrap();
        assert_eq!(result.content, "No memory found.");
    }

    #[tokio::test]
    async fn unknown_action_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_for(dir.path());
        let err = MemoryTool.execute(json!({"action": "delete"}), &ctx).await.unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }
}
