use crate::error::ToolError;
use crate::tool::{AskQuestion, DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::json;

pub struct AskTool;

#[async_trait]
impl Tool for AskTool {
    fn name(&self) -> &str {
        "ask"
    }

    fn description(&self) -> &str {
        "Ask the user a clarifying question and wait for their answer"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "question": {"type": "string", "description": "A single question to ask"},
                "questions": {
                    "type": "array",
                    "description": "A sequence of structured questions, each with optional options",
                    "items": {
                        "type": "object",
                        "properties": {
                            "question": {"type": "string"},
                            "options": {"type": "array", "items": {"type": "string"}}
                        },
                        "required": ["question"]
                    }
                }
            }
        })
    }

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Safe
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        if ctx.auto_approve {
            return Err(ToolError::PolicyDenied("ask is not available to sub-agents".into()));
        }

        let questions = if let Some(question) = args.get("question").and_then(|v| v.as_str()) {
            if question.trim().is_empty() {
                return Err(ToolError::ValidationError("question must not be empty".into()));
            }
            vec![AskQuestion { question: question.to_string(), options: Vec::new() }]
        } else if let Some(list) = args.get("questions") {
            let parsed: Vec<AskQuestion> = serde_json::from_value(list.clone())
                .map_err(|e| ToolError::ValidationError(format!("invalid questions: {e}")))?;
            if parsed.is_empty() {
                return Err(ToolError::ValidationError("questions must not be empty".into()));
            }
            parsed
        } else {
            return Err(ToolError::ValidationError("either question or questions is required".into()));
        };

        let answers = (ctx.ask_user)(questions.clone()).await;

        Ok(ToolResult::ok(
            serde_json::to_string(&json!({
                "answers": answers,
                "questions": questions.iter().map(|q| &q.question).collect::<Vec<_>>(),
            }))
            .map_err(|e| ToolError::Upstream(e.to_string()))?,
        ))
    }
}
