use crate::error::ToolError;
use crate::session::{TodoItem, TodoStatus};
use crate::tool::{DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::json;

pub struct TodoWriteTool;

#[async_trait]
impl Tool for TodoWriteTool {
    fn name(&self) -> &str {
        "todoWrite"
    }

    fn description(&self) -> &str {
        "Overwrite the session's todo list"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "content": {"type": "string"},
                            "status": {"type": "string", "enum": ["pending", "in_progress", "completed"]},
                            "activeForm": {"type": "string"}
                        },
                        "required": ["content", "status", "activeForm"]
                    }
                }
            },
            "required": ["todos"]
        })
    }

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Safe
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let todos_arg = args.get("todos").ok_or_else(|| ToolError::ValidationError("todos is required".into()))?;
        let todos: Vec<TodoItem> = serde_json::from_value(todos_arg.clone())
            .map_err(|e| ToolError::ValidationError(format!("invalid todos: {e}")))?;

        let summary = todos
            .iter()
            .map(|t| {
                let status = match t.status {
                    TodoStatus::Pending => "pending",
                    TodoStatus::InProgress => "in_progress",
                    TodoStatus::Completed => "completed",
                };
                format!("[{status}] {}", t.content)
            })
            .collect::<Vec<_>>()
            .join("\n");

        (ctx.update_todos)(todos);

        Ok(ToolResult::ok(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::pathgate::PathGate;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn overwrites_and_summarizes() {
        let dir = PathBuf::from(".");
        let captured: Arc<Mutex<Option<Vec<TodoItem>>>> = Arc::new(Mutex::new(None));
        let captured_clone = captured.clone();
        let ctx = ToolContext {
            working_dir: dir.clone(),
            session_id: "t".into(),
            gate: Arc::new(PathGate::new(dir.clone(), vec![dir.clone()], vec![dir])),
            config: Arc::new(AgentConfig::for_tests()),
            abort_signal: CancellationToken::new(),
            spawn_depth: 0,
            auto_approve: false,
            approve_command: Arc::new(|_| Box::pin(async { crate::tool::ApprovalDecision::Approved })),
            ask_user: Arc::new(|_| Box::pin(async { Default::default() })),
            update_todos: Arc::new(move |todos| {
                *captured_clone.lock().unwrap() = Some(todos);
            }),
            spawn_agent: Arc::new(|_, _| {
                Box::pin(async { Err(ToolError::PolicyDenied("spawnAgent unavailable in this test context".into())) })
            }),
        };

        let result = TodoWriteTool
            .execute(
                json!({"todos": [{"content": "write tests", "status": "in_progress", "activeForm": "Writing tests"}]}),
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(result.content, "[in_progress] write tests");
        assert!(captured.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn invalid_status_is_rejected() {
        let dir = PathBuf::from(".");
        let ctx = ToolContext {
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
            spawn_agent: Arc::new(|_, _| {
                Box::pin(async { Err(ToolError::PolicyDenied("spawnAgent unavailable in this test context".into())) })
            }),
        };
        let err = TodoWriteTool
            .execute(json!({"todos": [{"content": "x", "status": "bogus", "activeForm": "X"}]}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }
}
