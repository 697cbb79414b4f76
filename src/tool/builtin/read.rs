use crate::error::ToolError;
use crate::tool::{DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use serde_json::json;

/// Physical lines longer than this are truncated with an `…` suffix.
const MAX_LINE_CHARS: usize = 2000;

pub struct ReadTool;

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "read"
    }

    fn description(&self) -> &str {
        "Read a file from the filesystem, returning numbered lines"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "filePath": {"type": "string", "description": "Path to the file to read"},
                "offset": {"type": "integer", "description": "1-based line number to start from"},
                "limit": {"type": "integer", "description": "Maximum number of lines to return"}
            },
            "required": ["filePath"]
        })
    }

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Safe
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let file_path = args
            .get("filePath")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("filePath is required".into()))?;
        let offset = args.get("offset").and_then(serde_json::Value::as_u64).unwrap_or(1).max(1) as usize;
        let limit = args.get("limit").and_then(serde_json::Value::as_u64).unwrap_or(2000) as usize;

        let resolved = ctx.gate.resolve(file_path, &ctx.working_dir)?;
        ctx.gate.assert_read_allowed(&resolved)?;

        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::NotFound(format!("failed to read {}: {e}", resolved.display())))?;

        if content.is_empty() {
            return Ok(ToolResult::ok("1\t"));
        }

        let mut out = String::new();
        for (i, line) in content.lines().enumerate().skip(offset - 1).take(limit) {
            let mut line = line.to_string();
            if line.chars().count() > MAX_LINE_CHARS {
                line = line.chars().take(MAX_LINE_CHARS).collect::<String>() + "…";
            }
            out.push_str(&(i + 1).to_string());
            out.push('\t');
            out.push_str(&line);
            out.push('\n');
        }

        Ok(ToolResult::ok(out))
    }
}
