use crate::error::ToolError;
use crate::tool::{DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::json;

pub struct EditTool;

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        "edit"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing exact text. Use for surgical edits instead of rewriting entire files."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "filePath": {"type": "string", "description": "Path to the file to modify"},
                "oldString": {"type": "string", "description": "The exact text to replace"},
                "newString": {"type": "string", "description": "The replacement text"},
                "replaceAll": {"type": "boolean", "description": "Replace all occurrences (default: false)"}
            },
            "required": ["filePath", "oldString", "newString"]
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
        let old_string = args
            .get("oldString")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("oldString is required".into()))?;
        let new_string = args
            .get("newString")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("newString is required".into()))?;
        let replace_all = args.get("replaceAll").and_then(serde_json::Value::as_bool).unwrap_or(false);

        if old_string.is_empty() {
            return Err(ToolError::ValidationError(
                "oldString cannot be empty; use the write tool to create new files".into(),
            ));
        }
        if old_string == new_string {
            return Err(ToolError::ValidationError("oldString and newString must differ".into()));
        }

        let resolved = ctx.gate.resolve(file_path, &ctx.working_dir)?;
        ctx.gate.assert_write_allowed(&resolved)?;

        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|_| ToolError::NotFound(format!("file not found: {file_path}")))?;

        let count = content.matches(old_string).count();
        if count == 0 {
            let preview: String = old_string.chars().take(100).collect();
            return Err(ToolError::NotFound(format!("text not found in file: \"{preview}\"")));
        }
        if count > 1 && !replace_all {
            return Err(ToolError::ValidationError(format!(
                "found {count} times; use replaceAll or provide more surrounding context for uniqueness"
            )));
        }

        let new_content = if replace_all {
            content.replace(old_string, new_string)
        } else {
            content.replacen(old_string, new_string, 1)
        };

        tokio::fs::write(&resolved, &new_content)
            .await
            .map_err(|e| ToolError::Upstream(format!("failed to write file: {e}")))?;

        Ok(ToolResult::ok("Edit applied."))
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

    fn test_context(dir: &TempDir) -> ToolContext {
        let root = dir.path().to_path_buf();
        ToolContext {
            working_dir: root.clone(),
            session_id: "test".into(),
            gate: Arc::new(PathGate::new(root.clone(), vec![root.clone()], vec![root])),
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
    async fn simple_replacement() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("test.txt"), "Hello world").unwrap();
        let ctx = test_context(&dir);
        let result = EditTool
            .execute(json!({"filePath": "test.txt", "oldString": "world", "newString": "Rust"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result.content, "Edit applied.");
        assert_eq!(std::fs::read_to_string(dir.path().join("test.txt")).unwrap(), "Hello Rust");
    }

    #[tokio::test]
    async fn old_equals_new_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("test.txt"), "Hello world").unwrap();
        let ctx = test_context(&dir);
        let err = EditTool
            .execute(json!({"filePath": "test.txt", "oldString": "world", "newString": "world"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }

    #[tokio::test]
    async fn missing_text_is_not_found() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("test.txt"), "Hello world").unwrap();
        let ctx = test_context(&dir);
        let err = EditTool
            .execute(json!({"filePath": "test.txt", "oldString": "nope", "newString": "x"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NotFound");
    }

    #[tokio::test]
    async fn multiple_occurrences_message_contains_count() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("test.txt"), "foo bar foo baz foo").unwrap();
        let ctx = test_context(&dir);
        let err = EditTool
            .execute(json!({"filePath": "test.txt", "oldString": "foo", "newString": "qux"}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("3 times"));
    }

    #[tokio::test]
    async fn replace_all_replaces_every_occurrence() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("test.txt"), "foo bar foo baz foo").unwrap();
        let ctx = test_context(&dir);
        EditTool
            .execute(
                json!({"filePath": "test.txt", "oldString": "foo", "newString": "qux", "replaceAll": true}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("test.txt")).unwrap(), "qux bar qux baz qux");
    }

    #[tokio::test]
    async fn multiline_old_string_is_supported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("test.txt"), "line1\nline2\nline3\n").unwrap();
        let ctx = test_context(&dir);
        EditTool
            .execute(json!({"filePath": "test.txt", "oldString": "line1\nline2", "newString": "new1\nnew2"}), &ctx)
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("test.txt")).unwrap(), "new1\nnew2\nline3\n");
    }
}
