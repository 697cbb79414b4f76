use crate::error::ToolError;
use crate::tool::{DangerLevel, Tool, ToolContext, ToolResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const SEARCH_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

pub struct WebSearchTool {
    client: Client,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSearchTool {
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder().timeout(Duration::from_secs(15)).build().expect("failed to build HTTP client");
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

fn format_results(results: &[BraveResult]) -> String {
    results
        .iter()
        .map(|r| format!("{}\n{}\n{}", r.title, r.url, r.description))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "webSearch"
    }

    fn description(&self) -> &str {
        "Search the web. Returns title/URL/snippet lines for each result."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search query"},
                "maxResults": {"type": "integer", "description": "Maximum number of results to return (default: 8)"}
            },
            "required": ["query"]
        })
    }

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Restricted
    }

    async fn execute(&self, args: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::ValidationError("query is required".into()))?;
        if query.trim().is_empty() {
            return Err(ToolError::ValidationError("query must not be empty".into()));
        }
        let max_results = args.get("maxResults").and_then(serde_json::Value::as_u64).map_or(8, |v| v.clamp(1, 20));

        let Some(api_key) = ctx.config.web_search_api_key() else {
            return Ok(ToolResult::ok("webSearch disabled: no search provider is configured."));
        };

        let response = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[("q", query), ("count", &max_results.to_string())])
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ToolError::Upstream(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Upstream(format!("HTTP {}", status.as_u16())));
        }

        let parsed: BraveResponse =
            response.json().await.map_err(|e| ToolError::Upstream(format!("malformed search response: {e}")))?;
        let results = parsed.web.map(|w| w.results).unwrap_or_default();

        Ok(ToolResult {
            content: if results.is_empty() { "No results found.".to_string() } else { format_results(&results) },
            is_error: false,
            metadata: Some(json!({"resultCount": results.len()})),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::pathgate::PathGate;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    fn ctx_with_config(config: AgentConfig) -> ToolContext {
        let dir = PathBuf::from(".");
        ToolContext {
            working_dir: dir.clone(),
            session_id: "t".into(),
            gate: Arc::new(PathGate::new(dir.clone(), vec![dir.clone()], vec![dir])),
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
    async fn empty_query_is_rejected() {
        let ctx = ctx_with_config(AgentConfig::for_tests());
        let err = WebSearchTool::new().execute(json!({"query": "   "}), &ctx).await.unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
    }

    #[tokio::test]
    async fn no_provider_configured_returns_disabled_message() {
        let ctx = ctx_with_config(AgentConfig::for_tests());
        let result = WebSearchTool::new().execute(json!({"query": "rust async"}), &ctx).await.unwrap();
        assert!(result.content.starts_with("webSearch disabled"));
    }

    #[test]
    fn formats_title_url_snippet() {
        let results = vec![BraveResult { title: "Rust".into(), url: "https://rust-lang.org".into(), description: "A language".into() }];
        let formatted = format_results(&results);
        assert_eq!(formatted, "Rust\nhttps://rust-lang.org\nA language");
    }
}
