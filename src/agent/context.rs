//! `TurnContext`: everything a single user-visible turn needs, built once
//! by the session server and handed to `TurnDriver::run_turn`.

use crate::config::AgentConfig;
use crate::provider::Message;
use crate::skill;
use crate::tool::{ApprovalDecision, AskQuestion};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Harness-flow policy, only meaningful when a harness drives the turn
/// (e.g. an evaluation suite). Absent in ordinary interactive use.
#[derive(Debug, Clone, Default)]
pub struct HarnessPolicy {
    /// Every name here must appear among the tool calls traced this turn.
    pub required_tool_calls: Vec<String>,
    /// The first tool call that isn't `todoWrite` must match this name.
    pub required_first_non_todo_tool_call: Option<String>,
    /// If set, final text lacking this substring triggers one extra,
    /// tool-less model step to synthesize a compliant final answer.
    pub terminator_sentinel: Option<String>,
}

pub type LogFn = Arc<dyn Fn(crate::agent::AgentEvent) + Send + Sync>;
pub type ApproveCommandFn = Arc<dyn Fn(String) -> BoxFuture<'static, ApprovalDecision> + Send + Sync>;
pub type AskUserFn = Arc<dyn Fn(Vec<AskQuestion>) -> BoxFuture<'static, HashMap<String, String>> + Send + Sync>;
pub type UpdateTodosFn = Arc<dyn Fn(Vec<crate::session::TodoItem>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentType {
    Root,
    Explore,
    Research,
    General,
}

/// Lives for exactly one user-visible turn. Owns its step counter
/// exclusively; a cancellation observed mid-turn is never replayed onto a
/// later turn built from the same session.
pub struct TurnContext {
    pub session_id: String,
    pub config: Arc<AgentConfig>,
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub max_steps: u32,
    pub cancellation: CancellationToken,
    pub log: LogFn,
    pub approve_command: ApproveCommandFn,
    pub ask_user: AskUserFn,
    pub update_todos: UpdateTodosFn,
    /// name + description, loaded fresh at turn construction (skill file
    /// contents themselves are never cached — only this summary list is
    /// held for the duration of the turn).
    pub discovered_skills: Vec<(String, String)>,
    pub harness: HarnessPolicy,
    /// 0 at the root turn; incremented by `spawnAgent`.
    pub spawn_depth: u8,
    pub agent_type: AgentType,
}

impl TurnContext {
    /// Loads the discovered-skills summary from `config.skills_dirs` (name
    /// plus front-matter description, falling back to an empty
    /// description when a skill carries none or fails to parse).
    #[allow(clippy::too_many_arguments)]
    pub async fn build(
        session_id: String,
        config: Arc<AgentConfig>,
        system_prompt: String,
        messages: Vec<Message>,
        cancellation: CancellationToken,
        log: LogFn,
        approve_command: ApproveCommandFn,
        ask_user: AskUserFn,
        update_todos: UpdateTodosFn,
    ) -> Self {
        let names = skill::list(&config.skills_dirs).await;
        let mut discovered_skills = Vec::with_capacity(names.len());
        for name in names {
            let description = skill::resolve(&config.skills_dirs, &name)
                .await
                .and_then(|content| skill::parse_front_matter(&content).0)
                .and_then(|meta| meta.description)
                .unwrap_or_default();
            discovered_skills.push((name, description));
        }

        Self {
            session_id,
            system_prompt,
            messages,
            max_steps: 100,
            cancellation,
            log,
            approve_command,
            ask_user,
            update_todos,
            discovered_skills,
            harness: HarnessPolicy::default(),
            spawn_depth: 0,
            agent_type: AgentType::Root,
            config,
        }
    }
}
