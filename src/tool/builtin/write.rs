use crate::error::ToolError;
use crate::tool::{DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::json;

pub struct WriteTool;

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        "write"
    }

    fn description(&self) -> &str {
        "Write content to a file, creating it (and any missing parent directories) if it doesn't exist"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "filePath": {"type": "string", "description": "Path to the file to write"},
                "content": {"type": "string", "description": "Content to write"}
            },
            "required": ["filePath", "content"]
        })
    }

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Restricted
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let file_path = args
            .get("filePath")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("filePath is required".into()))?;
        let content = args
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("content is required".into()))?;

        let resolved = ctx.gate.resolve(file_path, &ctx.working_dir)?;
        ctx.gate.assert_write_allowed(&resolved)?;

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::Upstream(format!("failed to create parent directories: {e}")))?;
        }

        tokio::fs::write(&resolved, content)
            .await
            .map_err(|e| ToolError::Upstream(format!("failed to write file: {e}")))?;

        Ok(ToolResult::ok(format!("Wrote {} chars to {}", content.len(), resolved.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::pathgate::PathGate;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn ctx_for(dir: std::path::PathBuf) -> ToolContext {
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
            spawn_agent: Arc::new(|_, _| Box::pin(async { Err(crate::error::ToolError::PolicyDenied("spawnAgent unavailable in this test context".into())) })),
        }
    }

    #[tokio::test]
    async fn writes_new_file_and_reports_char_count() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_for(dir.path().to_path_buf());
        let result = WriteTool.execute(json!({"filePath": "new.txt", "content": "hello"}), &ctx).await.unwrap();
        assert_eq!(result.content, format!("Wrote 5 chars to {}", dir.path().join("new.txt").display()));
        assert_eq!(std::fs::read_to_string(dir.path().join("new.txt")).unwrap(), "hello");
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_for(dir.path().to_path_buf());
        WriteTool.execute(json!({"filePath": "a/b/c.txt", "content": "x"}), &ctx).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a/b/c.txt")).unwrap(), "x");
    }

    #[tokio::test]
    async fn overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f.txt"), "old").unwrap();
        let ctx = ctx_for(dir.path().to_path_buf());
        WriteTool.execute(json!({"filePath": "f.txt", "content": "new content"}), &ctx).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("f.txt")).unwrap(), "new content");
    }
}
