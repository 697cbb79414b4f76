//! A `Session` is created on each WebSocket accept and lives until `close`.
//! It owns its `AgentConfig` snapshot, message history, the pending
//! approval/ask maps keyed by request id, the current todo list, and the
//! cancellation handle shared with every tool execution spawned from it.
//! Never persisted by the core.

use crate::config::AgentConfig;
use crate::provider::Message;
use crate::tool::ApprovalDecision;
use chrono::Local;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

/// Invariant (advisory, enforced by the `todoWrite` tool contract rather
/// than here): at most one item is `InProgress` at a time. Writes replace
/// the whole list.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TodoItem {
    pub content: String,
    pub status: TodoStatus,
    pub active_form: String,
}

/// Generate a session id: `YYYYMMDD-HHMMSS-xxxx` (timestamp + 4-char random suffix).
fn generate_session_id() -> String {
    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let suffix = &uuid::Uuid::new_v4().to_string()[..4];
    format!("{timestamp}-{suffix}")
}

pub struct Session {
    pub session_id: String,
    pub config: Arc<AgentConfig>,
    pub messages: Vec<Message>,
    pub todos: Vec<TodoItem>,
    pub cancellation: CancellationToken,
    /// Consumed by the (out-of-scope) MCP subsystem; the core only
    /// records and echoes it.
    pub enable_mcp: bool,
    /// Opaque harness-supplied context, recorded and echoed verbatim.
    pub harness_context: Option<serde_json::Value>,
    busy: bool,
    event_seq: u64,
    pending_approvals: HashMap<String, oneshot::Sender<ApprovalDecision>>,
    pending_asks: HashMap<String, oneshot::Sender<HashMap<String, String>>>,
}

impl Session {
    #[must_use]
    pub fn new(config: Arc<AgentConfig>) -> Self {
        Self {
            session_id: generate_session_id(),
            config,
            messages: Vec::new(),
            todos: Vec::new(),
            cancellation: CancellationToken::new(),
            enable_mcp: false,
            harness_context: None,
            busy: false,
            event_seq: 0,
            pending_approvals: HashMap::new(),
            pending_asks: HashMap::new(),
        }
    }

    #[must_use]
    pub fn working_dir(&self) -> &PathBuf {
        &self.config.working_directory
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Monotonic sequence number stamped on every outbound event frame.
    pub fn next_event_seq(&mut self) -> u64 {
        self.event_seq += 1;
        self.event_seq
    }

    /// Cancel the current turn, if any. A cancellation cannot be replayed:
    /// the handle is only ever cancelled, never un-cancelled or reused.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Register a pending approval request, returning the receiver the
    /// caller awaits. The resolver is taken by `resolve_approval`.
    pub fn register_approval(&mut self, request_id: String) -> oneshot::Receiver<ApprovalDecision> {
        let (tx, rx) = oneshot::channel();
        self.pending_approvals.insert(request_id, tx);
        rx
    }

    /// Resolve a pending approval by request id. Returns `false` if no such
    /// request is outstanding (already resolved, or never registered).
    pub fn resolve_approval(&mut self, request_id: &str, decision: ApprovalDecision) -> bool {
        self.pending_approvals
            .remove(request_id)
            .map(|tx| tx.send(decision).is_ok())
            .unwrap_or(false)
    }

    pub fn register_ask(&mut self, request_id: String) -> oneshot::Receiver<HashMap<String, String>> {
        let (tx, rx) = oneshot::channel();
        self.pending_asks.insert(request_id, tx);
        rx
    }

    pub fn resolve_ask(&mut self, request_id: &str, answers: HashMap<String, String>) -> bool {
        self.pending_asks
            .remove(request_id)
            .map(|tx| tx.send(answers).is_ok())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_seq_is_monotonic() {
        let mut session = Session::new(Arc::new(AgentConfig::for_tests()));
        assert_eq!(session.next_event_seq(), 1);
        assert_eq!(session.next_event_seq(), 2);
        assert_eq!(session.next_event_seq(), 3);
    }

    #[tokio::test]
    async fn approval_resolves_registered_receiver() {
        let mut session = Session::new(Arc::new(AgentConfig::for_tests()));
        let rx = session.register_approval("req-1".into());
        assert!(session.resolve_approval("req-1", ApprovalDecision::Approved));
        assert_eq!(rx.await.unwrap(), ApprovalDecision::Approved);
    }

    #[test]
    fn resolving_unknown_request_is_a_noop() {
        let mut session = Session::new(Arc::new(AgentConfig::for_tests()));
        assert!(!session.resolve_approval("missing", ApprovalDecision::Denied));
    }

    #[test]
    fn cancellation_is_observable_and_not_replayable() {
        let session = Session::new(Arc::new(AgentConfig::for_tests()));
        assert!(!session.cancellation.is_cancelled());
        session.cancel();
        assert!(session.cancellation.is_cancelled());
        session.cancel();
        assert!(session.cancellation.is_cancelled());
    }
}
