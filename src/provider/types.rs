//! Shared types for the model adapter.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;

/// Incremental events emitted while a single step streams in. Forwarded
/// live to the session's observability hook and accumulated into the
/// step's final `Message`.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    TextDelta(String),
    ThinkingDelta(String),
    ToolCall(ToolCallEvent),
    Usage(Usage),
    Done,
    Error(String),
}

#[derive(Debug, Clone)]
pub struct ToolCallEvent {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cache_read_tokens: u32,
    pub cache_write_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Arc<Vec<ContentBlock>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    ToolResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "thinking")]
    Thinking { thinking: String },
    #[serde(rename = "tool_call")]
    ToolCall {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_call_id: String,
        content: String,
        is_error: bool,
    },
    #[serde(rename = "image")]
    Image { media_type: String, data: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One call to the model adapter's `generate`. `prepareStep` (see
/// `PrepareStepFn`) receives and may transform this before it is sent.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub messages: Arc<Vec<Message>>,
    pub system: Option<Cow<'static, str>>,
    pub tools: Arc<Vec<ToolDefinition>>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    Cancelled,
}

/// The outcome of one `generate` call: an assistant message plus usage and
/// the reason generation stopped. Passed to `onStepFinish`; the full
/// sequence across a turn is passed to `onFinish`.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub message: Message,
    pub usage: Usage,
    pub stop_reason: StopReason,
}

/// Hook run before each step is sent, letting the turn driver adjust the
/// request (e.g. trim history, swap the system prompt).
pub type PrepareStepFn = Arc<dyn Fn(GenerateRequest) -> GenerateRequest + Send + Sync>;
/// Hook run after each step completes.
pub type OnStepFinishFn = Arc<dyn Fn(&StepResult) + Send + Sync>;
/// Hook run once, after the whole turn's steps are done.
pub type OnFinishFn = Arc<dyn Fn(&[StepResult]) + Send + Sync>;
