//! The Turn Driver (spec §4.3): runs one user turn through a `ModelAdapter`,
//! dispatching the model's tool calls through the `ToolRuntime` until it
//! produces a final response or a terminal condition fires.

pub mod context;
mod events;
pub mod prompt;
mod retry;
pub mod subagent;
pub mod tools;

pub use context::{AgentType, HarnessPolicy, TurnContext};
pub use events::AgentEvent;

use crate::error::ToolError;
use crate::pathgate::PathGate;
use crate::provider::{ContentBlock, GenerateRequest, Message, ModelAdapter, ModelError, Role, StepResult};
use crate::tool::{ToolContext, ToolMode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Minimum gap enforced between successive model steps (§4.3 step 3a).
const MIN_STEP_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Finished { text: String },
    Stopped,
    Error { message: String },
}

struct TracedToolCall {
    name: String,
}

pub struct TurnDriver;

impl TurnDriver {
    /// Run a complete turn: build the tool set, loop model steps through
    /// the tool runtime, and enforce the turn's harness policy at the end.
    pub async fn run_turn(ctx: &mut TurnContext, adapter: Arc<dyn ModelAdapter>, mode: ToolMode) -> TurnOutcome {
        (ctx.log)(AgentEvent::Started);

        let runtime = Arc::new(tools::build_runtime(mode, ctx.agent_type));
        let tool_defs = Arc::new(tools::tool_definitions(&runtime));

        let gate = Arc::new(PathGate::new(
            ctx.config.working_directory.clone(),
            ctx.config.allowed_read_roots(),
            ctx.config.allowed_write_roots(),
        ));
        let spawn_agent = subagent::make_spawn_agent_fn(
            ctx.session_id.clone(),
            ctx.config.clone(),
            ctx.cancellation.clone(),
            ctx.spawn_depth,
            ctx.log.clone(),
            ctx.approve_command.clone(),
            ctx.ask_user.clone(),
            ctx.update_todos.clone(),
            adapter.clone(),
            mode,
        );
        let tool_ctx = ToolContext {
            working_dir: ctx.config.working_directory.clone(),
            session_id: ctx.session_id.clone(),
            gate,
            config: ctx.config.clone(),
            abort_signal: ctx.cancellation.clone(),
            spawn_depth: ctx.spawn_depth,
            auto_approve: ctx.agent_type != AgentType::Root,
            approve_command: ctx.approve_command.clone(),
            ask_user: ctx.ask_user.clone(),
            update_todos: ctx.update_todos.clone(),
            spawn_agent,
        };

        let mut traced_calls: Vec<TracedToolCall> = Vec::new();
        let mut last_step_at: Option<Instant> = None;
        let model = ctx.config.model.clone().unwrap_or_default();

        for _step in 0..ctx.max_steps {
            if ctx.cancellation.is_cancelled() {
                (ctx.log)(AgentEvent::Stopped);
                return TurnOutcome::Stopped;
            }
            prepare_step(&ctx.cancellation, &mut last_step_at).await;
            if ctx.cancellation.is_cancelled() {
                (ctx.log)(AgentEvent::Stopped);
                return TurnOutcome::Stopped;
            }

            let request = GenerateRequest {
                model: model.clone(),
                messages: Arc::new(ctx.messages.clone()),
                system: Some(std::borrow::Cow::Owned(ctx.system_prompt.clone())),
                tools: tool_defs.clone(),
                max_tokens: None,
                temperature: None,
            };

            let step = match run_step_with_retries(adapter.as_ref(), request, ctx).await {
                Ok(step) => step,
                Err(RunStepError::Cancelled) => {
                    (ctx.log)(AgentEvent::Stopped);
                    return TurnOutcome::Stopped;
                }
                Err(RunStepError::Exhausted(message)) => {
                    (ctx.log)(AgentEvent::Error { message: message.clone(), kind: None });
                    return TurnOutcome::Error { message };
                }
            };

            ctx.messages.push(step.message.clone());

            let tool_calls: Vec<(String, String, serde_json::Value)> = step
                .message
                .content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolCall { id, name, arguments } => {
                        Some((id.clone(), name.clone(), arguments.clone()))
                    }
                    _ => None,
                })
                .collect();

            if tool_calls.is_empty() {
                let text = extract_text(&step.message);
                if let Some(sentinel) = ctx.harness.terminator_sentinel.clone()
                    && !text.contains(&sentinel)
                {
                    let finalized = finalize(adapter.as_ref(), ctx, &model).await;
                    return match finalized {
                        Ok(text) => TurnOutcome::Finished { text },
                        Err(message) => TurnOutcome::Error { message },
                    };
                }
                if let Some(violation) = check_harness_policy(&ctx.harness, &traced_calls) {
                    (ctx.log)(AgentEvent::Error { message: violation.clone(), kind: None });
                    return TurnOutcome::Error { message: violation };
                }
                (ctx.log)(AgentEvent::Finished { text: text.clone(), usage: step.usage });
                return TurnOutcome::Finished { text };
            }

            let mut results = Vec::with_capacity(tool_calls.len());
            for (id, name, args) in tool_calls {
                traced_calls.push(TracedToolCall { name: name.clone() });
                (ctx.log)(AgentEvent::ToolCall { id: id.clone(), name: name.clone(), arguments: args.clone() });

                if ctx.cancellation.is_cancelled() {
                    (ctx.log)(AgentEvent::Stopped);
                    return TurnOutcome::Stopped;
                }

                let (content, is_error) = match runtime.call(&name, args, &tool_ctx).await {
                    Ok(result) => (result.content, result.is_error),
                    Err(ToolError::Cancelled) => {
                        (ctx.log)(AgentEvent::Stopped);
                        return TurnOutcome::Stopped;
                    }
                    Err(err) => (err.to_string(), true),
                };

                (ctx.log)(AgentEvent::ToolResult { id: id.clone(), content: content.clone(), is_error });
                results.push(ContentBlock::ToolResult { tool_call_id: id, content, is_error });
            }

            ctx.messages.push(Message { role: Role::ToolResult, content: Arc::new(results) });
        }

        let text = ctx.messages.last().map(extract_text).unwrap_or_default();
        (ctx.log)(AgentEvent::Finished { text: text.clone(), usage: Default::default() });
        TurnOutcome::Finished { text }
    }
}

/// Enforces a minimal inter-step interval and yields to cancellation.
async fn prepare_step(cancellation: &CancellationToken, last_step_at: &mut Option<Instant>) {
    if let Some(last) = *last_step_at {
        let elapsed = last.elapsed();
        if elapsed < MIN_STEP_INTERVAL {
            tokio::select! {
                () = tokio::time::sleep(MIN_STEP_INTERVAL - elapsed) => {}
                () = cancellation.cancelled() => {}
            }
        }
    }
    *last_step_at = Some(Instant::now());
    tokio::task::yield_now().await;
}

enum RunStepError {
    Cancelled,
    Exhausted(String),
}

async fn run_step_with_retries(
    adapter: &dyn ModelAdapter,
    request: GenerateRequest,
    ctx: &TurnContext,
) -> Result<StepResult, RunStepError> {
    let max_retries = ctx.config.model_settings.max_retries;
    let on_delta = Arc::new({
        let log = ctx.log.clone();
        move |event: crate::provider::StreamEvent| {
            if let crate::provider::StreamEvent::TextDelta(text) = event {
                (log)(AgentEvent::TextDelta(text));
            }
        }
    });

    let mut attempt = 0u32;
    loop {
        match adapter.generate(request.clone(), on_delta.clone(), &ctx.cancellation).await {
            Ok(step) => return Ok(step),
            Err(ModelError::Cancelled) => return Err(RunStepError::Cancelled),
            Err(err) => {
                if attempt >= max_retries {
                    return Err(RunStepError::Exhausted(err.to_string()));
                }
                let extracted = match &err {
                    ModelError::RateLimited { retry_after: Some(secs) } => Some(Duration::from_secs(*secs)),
                    _ => retry::extract_retry_delay(&err.to_string()),
                };
                let delay = retry::retry_delay(attempt, extracted);
                tokio::select! {
                    () = tokio::time::sleep(delay) => {}
                    () = ctx.cancellation.cancelled() => return Err(RunStepError::Cancelled),
                }
                attempt += 1;
            }
        }
    }
}

/// One additional tool-less model step, invoked when the final text lacks
/// the configured terminator sentinel.
async fn finalize(adapter: &dyn ModelAdapter, ctx: &mut TurnContext, model: &str) -> Result<String, String> {
    let request = GenerateRequest {
        model: model.to_string(),
        messages: Arc::new(ctx.messages.clone()),
        system: Some(std::borrow::Cow::Owned(ctx.system_prompt.clone())),
        tools: Arc::new(Vec::new()),
        max_tokens: None,
        temperature: None,
    };
    match run_step_with_retries(adapter, request, ctx).await {
        Ok(step) => {
            let text = extract_text(&step.message);
            ctx.messages.push(step.message);
            Ok(text)
        }
        Err(RunStepError::Cancelled) => Err("cancelled during finalize".into()),
        Err(RunStepError::Exhausted(message)) => Err(message),
    }
}

fn extract_text(message: &Message) -> String {
    message
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

fn check_harness_policy(policy: &HarnessPolicy, traced: &[TracedToolCall]) -> Option<String> {
    for required in &policy.required_tool_calls {
        if !traced.iter().any(|c| &c.name == required) {
            return Some(format!("required tool call missing: {required}"));
        }
    }
    if let Some(expected) = &policy.required_first_non_todo_tool_call {
        let first_non_todo = traced.iter().find(|c| c.name != "todoWrite").map(|c| c.name.as_str());
        if first_non_todo != Some(expected.as_str()) {
            return Some(format!(
                "required first non-todoWrite tool call mismatch: expected {expected}, got {:?}",
                first_non_todo
            ));
        }
    }
    None
}
