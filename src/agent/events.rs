//! Turn-driver event stream, forwarded by the session server into the
//! `agent_*` WebSocket events (§4.4) and, for `Chunk`, into the
//! observability sink.

use crate::error::ToolError;
use crate::provider::Usage;
use serde_json::Value;

#[derive(Debug, Clone)]
pub enum AgentEvent {
    Started,
    TextDelta(String),
    ThinkingDelta(String),
    ToolCall { id: String, name: String, arguments: Value },
    ToolResult { id: String, content: String, is_error: bool },
    ApprovalRequest { request_id: String, command: String },
    AskRequest { request_id: String, questions: Vec<crate::tool::AskQuestion> },
    Finished { text: String, usage: Usage },
    Stopped,
    Error { message: String, kind: Option<&'static str> },
}

impl From<&ToolError> for AgentEvent {
    fn from(err: &ToolError) -> Self {
        AgentEvent::Error { message: err.to_string(), kind: Some(err.kind()) }
    }
}
