use crate::config::AgentConfig;
use crate::error::ToolError;
use crate::pathgate::PathGate;
use crate::session::TodoItem;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Decision returned by the session's `approveCommand` callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Denied,
}

/// One clarifying question routed through `ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskQuestion {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Everything a single tool invocation needs to run: the sandbox, the
/// cancellation handle, and the callbacks that route back to the session
/// (`approveCommand`, `askUser`, `updateTodos`). Built once per turn and
/// shared by every tool call within it.
#[derive(Clone)]
pub struct ToolContext {
    pub working_dir: PathBuf,
    pub session_id: String,
    pub gate: Arc<PathGate>,
    pub config: Arc<AgentConfig>,
    pub abort_signal: CancellationToken,
    /// 0 at the root turn; incremented by `spawnAgent`. Enforces the
    /// maximum recursion depth of 2.
    pub spawn_depth: u8,
    /// Sub-agents auto-approve `Auto`-classified commands and fail any
    /// attempt to call `askUser`.
    pub auto_approve: bool,
    pub approve_command: Arc<dyn Fn(String) -> BoxFuture<'static, ApprovalDecision> + Send + Sync>,
    pub ask_user:
        Arc<dyn Fn(Vec<AskQuestion>) -> BoxFuture<'static, HashMap<String, String>> + Send + Sync>,
    pub update_todos: Arc<dyn Fn(Vec<TodoItem>) + Send + Sync>,
    /// Recursive `spawnAgent` entry point, installed by the turn driver.
    /// Takes `(task, agentType)`; returns the sub-agent's final text.
    pub spawn_agent: Arc<dyn Fn(String, String) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync>,
}

impl fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolContext")
            .field("working_dir", &self.working_dir)
            .field("session_id", &self.session_id)
            .field("spawn_depth", &self.spawn_depth)
            .field("auto_approve", &self.auto_approve)
            .finish_non_exhaustive()
    }
}

impl ToolContext {
    pub fn is_cancelled(&self) -> bool {
        self.abort_signal.is_cancelled()
    }
}

#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
    pub metadata: Option<serde_json::Value>,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            metadata: None,
        }
    }

    pub fn ok_with_metadata(content: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            metadata: Some(metadata),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> serde_json::Value;

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError>;

    fn danger_level(&self) -> DangerLevel {
        DangerLevel::Restricted
    }
}

/// Classification of tools based on their potential impact. `bash` is
/// classified per-invocation by the command gate instead; every other
/// tool has a fixed level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DangerLevel {
    Safe,
    Restricted,
}

/// The active execution mode of the agent, matching `ToolMode` in the
/// permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ToolMode {
    /// Only safe tools (read-only) are allowed.
    Read,
    /// Standard interactive mode: restricted tools and non-auto commands
    /// need approval.
    #[default]
    Write,
    /// Full autonomy, no prompts.
    Agi,
}
