//! Wire protocol (§4.4, §6): JSON text frames, closed sets of
//! client-to-server and server-to-client message types. Unknown `type`
//! values on the client side are a protocol error, not a parse failure —
//! `ClientMessage` deserializes into `Unknown` rather than rejecting so
//! the dispatcher can report `"Unknown type…"` itself.

use crate::provider::Usage;
use crate::tool::AskQuestion;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    ClientHello { #[serde(default)] client_version: Option<String> },
    Ping,
    UserMessage { #[serde(default)] session_id: Option<String>, text: String },
    Cancel { #[serde(default)] session_id: Option<String> },
    Reset { #[serde(default)] session_id: Option<String> },
    ApprovalResponse { request_id: String, approved: bool },
    AskResponse { request_id: String, answer: std::collections::HashMap<String, String> },
    SetEnableMcp { enabled: bool },
    SetModel { model: String },
    ListTools,
    ListCommands,
    ExecuteCommand { name: String, #[serde(default)] args: Value },
    SessionBackupGet,
    SessionBackupCheckpoint,
    HarnessContextSet { context: Value },
    HarnessSloEvaluate { #[serde(default)] from_ms: Option<i64>, #[serde(default)] to_ms: Option<i64> },
    ObservabilityQuery { #[serde(default)] from_ms: Option<i64>, #[serde(default)] to_ms: Option<i64> },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    ServerHello {
        session_id: String,
        protocol_version: u32,
        config: HelloConfig,
    },
    SessionSettings { session_id: String, harness_mode: String },
    ObservabilityStatus { session_id: String, enabled: bool },
    ProviderCatalog { session_id: String, providers: Vec<String> },
    ProviderAuthMethods { session_id: String, methods: Vec<String> },
    ProviderStatus { session_id: String, provider: Option<String>, model: Option<String> },
    Pong { session_id: String },
    Todos { session_id: String, todos: Vec<crate::session::TodoItem> },
    UserMessage { session_id: String, text: String },
    SessionBusy { session_id: String, busy: bool },
    AgentStarted { session_id: String },
    AgentChunk { session_id: String, text: String },
    AgentToolCall { session_id: String, id: String, name: String, arguments: Value },
    AgentToolResult { session_id: String, id: String, content: String, is_error: bool },
    AgentApprovalRequest { session_id: String, request_id: String, command: String },
    AgentAskRequest { session_id: String, request_id: String, questions: Vec<AskQuestion> },
    AgentFinished { session_id: String, text: String, usage: Usage },
    AgentStopped { session_id: String },
    AgentError { session_id: String, message: String, kind: Option<String> },
    Tools { session_id: String, tools: Vec<ToolSummary> },
    Commands { session_id: String, commands: Vec<String> },
    ConfigUpdated { session_id: String, enable_mcp: bool, model: Option<String> },
    SessionBackupState { session_id: String, messages: Value },
    HarnessContext { session_id: String, context: Value },
    HarnessSloResult { session_id: String, status: String, #[serde(skip_serializing_if = "Option::is_none")] message: Option<String> },
    ObservabilityQueryResult {
        session_id: String,
        status: String,
        from_ms: Option<i64>,
        to_ms: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error { session_id: String, code: String, source: ErrorSource, message: String },
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSource {
    Protocol,
    Agent,
    Validation,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub working_directory: String,
    pub output_directory: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
}

impl ServerEvent {
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::ServerHello { session_id, .. }
            | Self::SessionSettings { session_id, .. }
            | Self::ObservabilityStatus { session_id, .. }
            | Self::ProviderCatalog { session_id, .. }
            | Self::ProviderAuthMethods { session_id, .. }
            | Self::ProviderStatus { session_id, .. }
            | Self::Pong { session_id }
            | Self::Todos { session_id, .. }
            | Self::UserMessage { session_id, .. }
            | Self::SessionBusy { session_id, .. }
            | Self::AgentStarted { session_id }
            | Self::AgentChunk { session_id, .. }
            | Self::AgentToolCall { session_id, .. }
            | Self::AgentToolResult { session_id, .. }
            | Self::AgentApprovalRequest { session_id, .. }
            | Self::AgentAskRequest { session_id, .. }
            | Self::AgentFinished { session_id, .. }
            | Self::AgentStopped { session_id }
            | Self::AgentError { session_id, .. }
            | Self::Tools { session_id, .. }
            | Self::Commands { session_id, .. }
            | Self::ConfigUpdated { session_id, .. }
            | Self::SessionBackupState { session_id, .. }
            | Self::HarnessContext { session_id, .. }
            | Self::HarnessSloResult { session_id, .. }
            | Self::ObservabilityQueryResult { session_id, .. }
            | Self::Error { session_id, .. } => session_id,
        }
    }
}
