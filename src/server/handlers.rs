//! Dispatch for a single parsed `ClientMessage` (§4.4). Quick requests are
//! answered inline; a `user_message` (or `execute_command` resolving to a
//! skill) hands the turn to a background task so the receive loop stays
//! free to keep accepting frames (cancel, approvals) while it runs.

use super::protocol::{ClientMessage, ErrorSource, ServerEvent};
use super::ServerState;
use crate::agent::{self, AgentEvent, AgentType, TurnContext, TurnDriver, TurnOutcome};
use crate::provider::{ContentBlock, Message, Role};
use crate::session::Session;
use crate::tool::{ApprovalDecision, AskQuestion, ToolMode};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

pub async fn dispatch(
    session: Arc<Mutex<Session>>,
    session_id: String,
    state: ServerState,
    tx: mpsc::Sender<ServerEvent>,
    msg: ClientMessage,
) {
    match msg {
        ClientMessage::ClientHello { .. } | ClientMessage::Unknown => {}
        ClientMessage::Ping => {
            let _ = tx.send(ServerEvent::Pong { session_id }).await;
        }
        ClientMessage::UserMessage { text, .. } => {
            spawn_turn(session, session_id, state, tx, text).await;
        }
        ClientMessage::Cancel { .. } => {
            session.lock().await.cancel();
        }
        ClientMessage::Reset { .. } => {
            let mut session = session.lock().await;
            session.messages.clear();
            session.todos.clear();
            session.cancellation = tokio_util::sync::CancellationToken::new();
            let _ = tx.send(ServerEvent::Todos { session_id, todos: Vec::new() }).await;
        }
        ClientMessage::ApprovalResponse { request_id, approved } => {
            let decision = if approved { ApprovalDecision::Approved } else { ApprovalDecision::Denied };
            session.lock().await.resolve_approval(&request_id, decision);
        }
        ClientMessage::AskResponse { request_id, answer } => {
            session.lock().await.resolve_ask(&request_id, answer);
        }
        ClientMessage::SetEnableMcp { enabled } => {
            let mut session = session.lock().await;
            session.enable_mcp = enabled;
            let model = session.config.model.clone();
            let _ = tx.send(ServerEvent::ConfigUpdated { session_id, enable_mcp: enabled, model }).await;
        }
        ClientMessage::SetModel { model } => {
            let mut session = session.lock().await;
            let mut updated = (*session.config).clone();
            updated.model = Some(model.clone());
            session.config = Arc::new(updated);
            let enable_mcp = session.enable_mcp;
            let _ =
                tx.send(ServerEvent::ConfigUpdated { session_id, enable_mcp, model: Some(model) }).await;
        }
        ClientMessage::ListTools => {
            let runtime = agent::tools::build_runtime(ToolMode::Agi, AgentType::Root);
            let tools = runtime
                .list_tools()
                .iter()
                .map(|t| super::protocol::ToolSummary { name: t.name().to_string(), description: t.description().to_string() })
                .collect();
            let _ = tx.send(ServerEvent::Tools { session_id, tools }).await;
        }
        ClientMessage::ListCommands => {
            let config = session.lock().await.config.clone();
            let commands = crate::skill::list(&config.skills_dirs).await;
            let _ = tx.send(ServerEvent::Commands { session_id, commands }).await;
        }
        ClientMessage::ExecuteCommand { name, args } => {
            let config = session.lock().await.config.clone();
            match crate::skill::resolve(&config.skills_dirs, &name).await {
                Some(content) => {
                    let (_, body) = crate::skill::parse_front_matter(&content);
                    let task = format!("{body}\n\nArguments: {args}");
                    spawn_turn(session, session_id, state, tx, task).await;
                }
                None => {
                    let _ = tx
                        .send(ServerEvent::Error {
                            session_id,
                            code: "not_found".into(),
                            source: ErrorSource::Validation,
                            message: format!("Unknown command: {name}"),
                        })
                        .await;
                }
            }
        }
        ClientMessage::SessionBackupGet | ClientMessage::SessionBackupCheckpoint => {
            let session = session.lock().await;
            let messages = serde_json::to_value(&session.messages).unwrap_or(serde_json::Value::Null);
            let _ = tx.send(ServerEvent::SessionBackupState { session_id, messages }).await;
        }
        ClientMessage::HarnessContextSet { context } => {
            let mut session = session.lock().await;
            session.harness_context = Some(context.clone());
            let _ = tx.send(ServerEvent::HarnessContext { session_id, context }).await;
        }
        ClientMessage::HarnessSloEvaluate { .. } => {
            let _ = tx
                .send(ServerEvent::HarnessSloResult { session_id, status: "ok".into(), message: None })
                .await;
        }
        ClientMessage::ObservabilityQuery { from_ms, to_ms } => {
            let _ = tx
                .send(ServerEvent::ObservabilityQueryResult {
                    session_id,
                    status: "ok".into(),
                    from_ms,
                    to_ms,
                    message: None,
                })
                .await;
        }
    }
}

async fn spawn_turn(
    session: Arc<Mutex<Session>>,
    session_id: String,
    state: ServerState,
    tx: mpsc::Sender<ServerEvent>,
    text: String,
) {
    {
        let mut session = session.lock().await;
        if session.is_busy() {
            drop(session);
            let _ = tx
                .send(ServerEvent::Error {
                    session_id,
                    code: "session_busy".into(),
                    source: ErrorSource::Validation,
                    message: "a turn is already in progress".into(),
                })
                .await;
            return;
        }
        session.set_busy(true);
        session
            .messages
            .push(Message { role: Role::User, content: Arc::new(vec![ContentBlock::Text { text: text.clone() }]) });
    }

    let _ = tx.send(ServerEvent::UserMessage { session_id: session_id.clone(), text }).await;
    let _ = tx.send(ServerEvent::SessionBusy { session_id: session_id.clone(), busy: true }).await;

    tokio::spawn(async move {
        run_turn_task(session, session_id, state, tx).await;
    });
}

async fn run_turn_task(session: Arc<Mutex<Session>>, session_id: String, state: ServerState, tx: mpsc::Sender<ServerEvent>) {
    let (config, messages, cancellation) = {
        let session = session.lock().await;
        (session.config.clone(), session.messages.clone(), session.cancellation.clone())
    };

    let hot_cache = crate::memory::read_hot(&config.project_agent_dir, &config.user_agent_dir)
        .await
        .unwrap_or_default();

    let last_usage: Arc<std::sync::Mutex<crate::provider::Usage>> = Arc::new(std::sync::Mutex::new(crate::provider::Usage::default()));
    let log: agent::context::LogFn = Arc::new({
        let tx = tx.clone();
        let session_id = session_id.clone();
        let last_usage = last_usage.clone();
        move |event: AgentEvent| {
            if let AgentEvent::Finished { usage, .. } = &event {
                *last_usage.lock().unwrap() = usage.clone();
            }
            forward_event(&tx, session_id.clone(), event);
        }
    });

    let approve_command = make_approve_command(session.clone(), tx.clone(), session_id.clone());
    let ask_user = make_ask_user(session.clone(), tx.clone(), session_id.clone());
    let update_todos = make_update_todos(session.clone(), tx.clone(), session_id.clone());

    let skill_names = crate::skill::list(&config.skills_dirs).await;
    let mut discovered_skills = Vec::with_capacity(skill_names.len());
    for name in skill_names {
        let description = crate::skill::resolve(&config.skills_dirs, &name)
            .await
            .and_then(|content| crate::skill::parse_front_matter(&content).0)
            .and_then(|meta| meta.description)
            .unwrap_or_default();
        discovered_skills.push((name, description));
    }
    let system_prompt = agent::prompt::build(&config, &hot_cache, &discovered_skills);

    let mut ctx = TurnContext::build(
        session_id.clone(),
        config,
        system_prompt,
        messages,
        cancellation,
        log,
        approve_command,
        ask_user,
        update_todos,
    )
    .await;

    let outcome = TurnDriver::run_turn(&mut ctx, state.adapter.clone(), ToolMode::Write).await;

    {
        let mut session = session.lock().await;
        session.messages = ctx.messages;
        session.set_busy(false);
    }

    let terminal = match outcome {
        TurnOutcome::Finished { text } => ServerEvent::AgentFinished {
            session_id: session_id.clone(),
            text,
            usage: last_usage.lock().unwrap().clone(),
        },
        TurnOutcome::Stopped => ServerEvent::AgentStopped { session_id: session_id.clone() },
        TurnOutcome::Error { message } => {
            ServerEvent::AgentError { session_id: session_id.clone(), message, kind: None }
        }
    };
    let _ = tx.send(terminal).await;
    let _ = tx.send(ServerEvent::SessionBusy { session_id, busy: false }).await;
}

fn forward_event(tx: &mpsc::Sender<ServerEvent>, session_id: String, event: AgentEvent) {
    let mapped = match event {
        AgentEvent::Started => Some(ServerEvent::AgentStarted { session_id }),
        AgentEvent::TextDelta(text) => Some(ServerEvent::AgentChunk { session_id, text }),
        AgentEvent::ThinkingDelta(_) => None,
        AgentEvent::ToolCall { id, name, arguments } => {
            Some(ServerEvent::AgentToolCall { session_id, id, name, arguments })
        }
        AgentEvent::ToolResult { id, content, is_error } => {
            Some(ServerEvent::AgentToolResult { session_id, id, content, is_error })
        }
        AgentEvent::ApprovalRequest { request_id, command } => {
            Some(ServerEvent::AgentApprovalRequest { session_id, request_id, command })
        }
        AgentEvent::AskRequest { request_id, questions } => {
            Some(ServerEvent::AgentAskRequest { session_id, request_id, questions })
        }
        // Finished/Stopped/Error are emitted by `run_turn_task` itself, once
        // the driver returns, so the terminal event always follows every
        // `agent_chunk`/`agent_tool_*` event already queued ahead of it.
        AgentEvent::Finished { .. } | AgentEvent::Stopped | AgentEvent::Error { .. } => None,
    };
    if let Some(event) = mapped {
        let _ = tx.try_send(event);
    }
}

fn make_approve_command(
    session: Arc<Mutex<Session>>,
    tx: mpsc::Sender<ServerEvent>,
    session_id: String,
) -> agent::context::ApproveCommandFn {
    Arc::new(move |command: String| {
        let session = session.clone();
        let tx = tx.clone();
        let session_id = session_id.clone();
        Box::pin(async move {
            let request_id = uuid::Uuid::new_v4().to_string();
            let rx = session.lock().await.register_approval(request_id.clone());
            let _ = tx
                .send(ServerEvent::AgentApprovalRequest { session_id, request_id, command })
                .await;
            rx.await.unwrap_or(ApprovalDecision::Denied)
        })
    })
}

fn make_ask_user(
    session: Arc<Mutex<Session>>,
    tx: mpsc::Sender<ServerEvent>,
    session_id: String,
) -> agent::context::AskUserFn {
    Arc::new(move |questions: Vec<AskQuestion>| {
        let session = session.clone();
        let tx = tx.clone();
        let session_id = session_id.clone();
        Box::pin(async move {
            let request_id = uuid::Uuid::new_v4().to_string();
            let rx = session.lock().await.register_ask(request_id.clone());
            let _ = tx
                .send(ServerEvent::AgentAskRequest { session_id, request_id, questions })
                .await;
            rx.await.unwrap_or_default()
        })
    })
}

fn make_update_todos(
    session: Arc<Mutex<Session>>,
    tx: mpsc::Sender<ServerEvent>,
    session_id: String,
) -> agent::context::UpdateTodosFn {
    Arc::new(move |todos| {
        let session = session.clone();
        let tx = tx.clone();
        let session_id = session_id.clone();
        tokio::spawn(async move {
            session.lock().await.todos = todos.clone();
            let _ = tx.send(ServerEvent::Todos { session_id, todos }).await;
        });
    })
}
