use crate::error::ToolError;
use crate::tool::{DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use globset::Glob;
use grep_regex::RegexMatcherBuilder;
use grep_searcher::sinks::UTF8;
use grep_searcher::SearcherBuilder;
use ignore::WalkBuilder;
use serde_json::json;
use std::path::Path;

pub struct GrepTool;

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search file contents for a regex pattern"
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string", "description": "The regex pattern to search for"},
                "path": {"type": "string", "description": "Directory or file to search (default: working directory)"},
                "caseSensitive": {"type": "boolean", "description": "Case-sensitive matching (default: true)"},
                "fileGlob": {"type": "string", "description": "Only search files matching this glob"},
                "contextLines": {"type": "integer", "description": "Lines of context to include around each match"}
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
            .ok_or_else(|| ToolError::ValidationError("pattern is required".into()))?
            .to_string();
        let case_sensitive = args.get("caseSensitive").and_then(serde_json::Value::as_bool).unwrap_or(true);
        let context_lines = args.get("contextLines").and_then(serde_json::Value::as_u64).unwrap_or(0) as usize;
        let file_glob = args.get("fileGlob").and_then(|v| v.as_str()).map(str::to_string);

        let path_arg = args.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let resolved = ctx.gate.resolve(path_arg, &ctx.working_dir)?;
        ctx.gate.assert_read_allowed(&resolved)?;

        let glob_matcher = file_glob
            .map(|g| Glob::new(&g).map(|glob| glob.compile_matcher()))
            .transpose()
            .map_err(|e| ToolError::ValidationError(format!("invalid fileGlob: {e}")))?;

        let matcher = RegexMatcherBuilder::new()
            .case_insensitive(!case_sensitive)
            .build(&pattern)
            .map_err(|e| ToolError::ValidationError(format!("invalid pattern: {e}")))?;

        let working_dir = ctx.working_dir.clone();
        let results = tokio::task::spawn_blocking(move || {
            search_tree(&resolved, &matcher, glob_matcher.as_ref(), context_lines, &working_dir)
        })
        .await
        .map_err(|e| ToolError::Upstream(e.to_string()))?;

        Ok(ToolResult {
            content: if results.is_empty() { "No matches found.".to_string() } else { results.join("\n") },
            is_error: false,
            metadata: Some(json!({"matchCount": results.len()})),
        })
    }
}

fn search_tree(
    root: &Path,
    matcher: &grep_regex::RegexMatcher,
    glob_matcher: Option<&globset::GlobMatcher>,
    context_lines: usize,
    working_dir: &Path,
) -> Vec<String> {
    let mut results = Vec::new();
    let mut searcher = SearcherBuilder::new()
        .before_context(context_lines)
        .after_context(context_lines)
        .build();

    let walker = WalkBuilder::new(root).hidden(true).git_ignore(true).git_global(true).git_exclude(true).build();
    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(glob) = glob_matcher {
            let rel = path.strip_prefix(root).unwrap_or(path);
            if !glob.is_match(rel) {
                continue;
            }
        }
        let display_path = path.strip_prefix(working_dir).unwrap_or(path);
        let sink_path = display_path.display().to_string();
        let sink_results = &mut results;
        let _ = searcher.search_path(
            matcher,
            path,
            UTF8(|lnum, line| {
                sink_results.push(format!("{sink_path}:{lnum}:{}", line.trim_end_matches('\n')));
                Ok(true)
            }),
        );
    }
    results
}
