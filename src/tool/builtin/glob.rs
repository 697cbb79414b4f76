use crate::error::ToolError;
use crate::tool::{DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use globset::Glob;
use ignore::WalkBuilder;
use serde_json::json;
use std::path::Path;

pub struct GlobTool;

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Find files matching a glob pattern (e.g., 'src/**/*.rs')"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string", "description": "The glob pattern to search for"},
                "cwd": {"type": "string", "description": "Directory to search from (default: working directory)"},
                "maxResults": {"type": "integer", "description": "Maximum number of matches to return"}
            },
            "required": ["pattern"]
        })
    }

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Safe
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let pattern = args
            .get("pattern")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("pattern is required".into()))?;
        let max_results = args.get("maxResults").and_then(serde_json::Value::as_u64).map(|n| n as usize);

        if Path::new(pattern).is_absolute() {
            return Err(ToolError::PolicyDenied("absolute glob patterns are not allowed".into()));
        }
        if pattern.split('/').any(|segment| segment == "..") {
            return Err(ToolError::PolicyDenied("glob patterns may not escape the search root with '..'".into()));
        }

        let cwd_arg = args.get("cwd").and_then(|v| v.as_str());
        let search_root = match cwd_arg {
            Some(cwd) => {
                let resolved = ctx.gate.resolve(cwd, &ctx.working_dir)?;
                ctx.gate.assert_read_allowed(&resolved)?;
                resolved
            }
            None => ctx.working_dir.clone(),
        };

        // Brace expansion is treated as a literal character, not an
        // expansion syntax: `literal_separator` keeps '/' special while
        // `{`/`}` stay ordinary glob bytes through the default parser.
        let glob = Glob::new(pattern).map_err(|e| ToolError::ValidationError(format!("invalid glob pattern: {e}")))?;
        let matcher = glob.compile_matcher();

        let gate = ctx.gate.clone();
        let root = search_root.clone();
        let mut paths = tokio::task::spawn_blocking(move || {
            let walker = WalkBuilder::new(&root).hidden(true).git_ignore(true).git_global(true).git_exclude(true).build();

            let mut paths = Vec::new();
            for entry in walker.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let Ok(rel_path) = path.strip_prefix(&root) else { continue };
                if !matcher.is_match(rel_path) {
                    continue;
                }
                let Ok(canonical) = path.canonicalize() else { continue };
                if gate.assert_read_allowed(&canonical).is_err() {
                    continue;
                }
                paths.push(rel_path.to_string_lossy().into_owned());
            }
            paths.sort();
            paths
        })
        .await
        .map_err(|e| ToolError::Upstream(e.to_string()))?;

        let total = paths.len();
        let mut truncated = false;
        if let Some(max) = max_results {
            if paths.len() > max {
                paths.truncate(max);
                truncated = true;
            }
        }

        let mut content = paths.join("\n");
        if truncated {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str(&format!("truncated to {} matches", paths.len()));
        }

        Ok(ToolResult {
            content,
            is_error: false,
            metadata: Some(json!({"count": total})),
        })
    }
}
