//! `spawnAgent` (spec §4.2): a recursive, depth-limited model call with a
//! restricted tool subset. Exposed to the tool runtime as a closure field
//! on `ToolContext` (`spawn_agent`) so the `tool` module never needs to
//! depend on the turn driver.

use crate::agent::context::{AgentType, LogFn};
use crate::agent::{TurnContext, TurnDriver, TurnOutcome};
use crate::config::AgentConfig;
use crate::error::ToolError;
use crate::provider::{ContentBlock, Message, ModelAdapter, Role};
use crate::tool::{ApprovalDecision, AskQuestion, ToolMode};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const MAX_SPAWN_DEPTH: u8 = 2;
pub const MAX_TASK_CHARS: usize = 20_000;

fn parse_agent_type(raw: &str) -> Result<AgentType, ToolError> {
    match raw {
        "explore" => Ok(AgentType::Explore),
        "research" => Ok(AgentType::Research),
        "general" => Ok(AgentType::General),
        other => Err(ToolError::ValidationError(format!("unknown agentType: {other}"))),
    }
}

const SUB_AGENT_SYSTEM_PROMPT: &str = "You are a focused sub-agent spawned to complete one task. \
Use only the tools available to you. Report your findings or result as plain text; there is no \
further conversation after your final answer.";

/// Build the `ToolContext.spawn_agent` closure for a turn at `spawn_depth`,
/// capturing everything a recursive `TurnDriver::run_turn` needs.
#[allow(clippy::too_many_arguments)]
pub fn make_spawn_agent_fn(
    session_id: String,
    config: Arc<AgentConfig>,
    cancellation: CancellationToken,
    spawn_depth: u8,
    log: LogFn,
    approve_command: Arc<dyn Fn(String) -> BoxFuture<'static, ApprovalDecision> + Send + Sync>,
    ask_user: Arc<dyn Fn(Vec<AskQuestion>) -> BoxFuture<'static, HashMap<String, String>> + Send + Sync>,
    update_todos: Arc<dyn Fn(Vec<crate::session::TodoItem>) + Send + Sync>,
    adapter: Arc<dyn ModelAdapter>,
    mode: ToolMode,
) -> Arc<dyn Fn(String, String) -> BoxFuture<'static, Result<String, ToolError>> + Send + Sync> {
    Arc::new(move |task, agent_type_raw| {
        let session_id = session_id.clone();
        let config = config.clone();
        let cancellation = cancellation.clone();
        let log = log.clone();
        let approve_command = approve_command.clone();
        let ask_user = ask_user.clone();
        let update_todos = update_todos.clone();
        let adapter = adapter.clone();

        Box::pin(async move {
            if spawn_depth >= MAX_SPAWN_DEPTH {
                return Err(ToolError::PolicyDenied(format!(
                    "spawnAgent recursion depth exceeded (max {MAX_SPAWN_DEPTH})"
                )));
            }
            if task.chars().count() > MAX_TASK_CHARS {
                return Err(ToolError::ValidationError(format!(
                    "task exceeds the {MAX_TASK_CHARS} character limit"
                )));
            }
            let agent_type = parse_agent_type(&agent_type_raw)?;

            let model = config
                .sub_agent_model()
                .map(str::to_string)
                .unwrap_or_else(|| config.model.clone().unwrap_or_default());
            let mut sub_config = (*config).clone();
            sub_config.model = Some(model);

            let mut sub_ctx = TurnContext::build(
                session_id,
                Arc::new(sub_config),
                SUB_AGENT_SYSTEM_PROMPT.to_string(),
                vec![Message { role: Role::User, content: Arc::new(vec![ContentBlock::Text { text: task }]) }],
                cancellation,
                log,
                approve_command,
                ask_user,
                update_todos,
            )
            .await;
            sub_ctx.spawn_depth = spawn_depth + 1;
            sub_ctx.agent_type = agent_type;

            match TurnDriver::run_turn(&mut sub_ctx, adapter, mode).await {
                TurnOutcome::Finished { text } => Ok(text),
                TurnOutcome::Stopped => Err(ToolError::Cancelled),
                TurnOutcome::Error { message } => Err(ToolError::Upstream(message)),
            }
        })
    })
}
