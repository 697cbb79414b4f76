//! Reference `ModelAdapter`: one reqwest-streaming implementation against
//! the Anthropic Messages API. Not a multi-provider wire-format library —
//! other providers plug in by implementing `ModelAdapter` the same way.

use crate::provider::error::ModelError;
use crate::provider::http::{AuthConfig, HttpClient};
use crate::provider::sse::SseParser;
use crate::provider::types::{
    ContentBlock, GenerateRequest, Message, Role, StepResult, StopReason, ToolCallEvent, Usage,
};
use crate::provider::ModelAdapter;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct AnthropicAdapter {
    http: HttpClient,
}

impl AnthropicAdapter {
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            http: HttpClient::new(
                "https://api.anthropic.com/v1",
                AuthConfig::ApiKey { header: "x-api-key".into(), key: api_key },
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicToolDefinition>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: serde_json::Value },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

#[derive(Debug, Serialize)]
struct AnthropicToolDefinition {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicEvent {
    #[serde(rename = "message_start")]
    MessageStart { message: AnthropicMessageInfo },
    #[serde(rename = "content_block_start")]
    ContentBlockStart { index: usize, content_block: AnthropicContentBlockInfo },
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { index: usize, delta: AnthropicDelta },
    #[serde(rename = "content_block_stop")]
    ContentBlockStop {},
    #[serde(rename = "message_delta")]
    MessageDelta { delta: AnthropicMessageDelta, usage: Option<AnthropicUsageDelta> },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "error")]
    Error { error: AnthropicError },
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageInfo {
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsageDelta {
    output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicMessageDelta {
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicContentBlockInfo {
    #[serde(rename = "text")]
    Text {},
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AnthropicDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    message: String,
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

fn map_messages(messages: &[Message]) -> Vec<AnthropicMessage> {
    messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| AnthropicMessage {
            role: match m.role {
                Role::User | Role::ToolResult => "user",
                Role::Assistant => "assistant",
                Role::System => unreachable!(),
            }
            .to_string(),
            content: m
                .content
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => AnthropicContentBlock::Text { text: text.clone() },
                    ContentBlock::Thinking { thinking } => {
                        AnthropicContentBlock::Text { text: format!("<thought>\n{thinking}\n</thought>\n") }
                    }
                    ContentBlock::ToolCall { id, name, arguments } => AnthropicContentBlock::ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                        input: arguments.clone(),
                    },
                    ContentBlock::ToolResult { tool_call_id, content, is_error } => {
                        AnthropicContentBlock::ToolResult {
                            tool_use_id: tool_call_id.clone(),
                            content: content.clone(),
                            is_error: is_error.then_some(true),
                        }
                    }
                    ContentBlock::Image { .. } => {
                        AnthropicContentBlock::Text { text: "[image omitted]".into() }
                    }
                })
                .collect(),
        })
        .collect()
}

fn extract_system_prompt(request: &GenerateRequest) -> Option<String> {
    request.system.clone().map(Cow::into_owned).or_else(|| {
        request.messages.iter().find(|m| m.role == Role::System).and_then(|m| {
            m.content.iter().find_map(|block| match block {
                ContentBlock::Text { text } => Some(text.clone()),
                _ => None,
            })
        })
    })
}

#[async_trait]
impl ModelAdapter for AnthropicAdapter {
    async fn generate(
        &self,
        request: GenerateRequest,
        on_delta: Arc<dyn Fn(crate::provider::StreamEvent) + Send + Sync>,
        cancel: &CancellationToken,
    ) -> Result<StepResult, ModelError> {
        let ant_request = AnthropicRequest {
            model: request.model.clone(),
            messages: map_messages(&request.messages),
            system: extract_system_prompt(&request),
            max_tokens: request.max_tokens.unwrap_or(4096),
            temperature: request.temperature,
            tools: request
                .tools
                .iter()
                .map(|t| AnthropicToolDefinition {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    input_schema: t.parameters.clone(),
                })
                .collect(),
            stream: true,
        };

        let mut byte_stream = Box::pin(
            self.http
                .post_stream("/messages", &ant_request)
                .await
                .map_err(|e| match e {
                    ModelError::Http(err) => ModelError::Stream(err.to_string()),
                    other => other,
                })?,
        );

        let mut parser = SseParser::new();
        let mut pending_tool_calls: Vec<PendingToolCall> = Vec::new();
        let mut text = String::new();
        let mut usage = Usage::default();
        let mut stop_reason = StopReason::EndTurn;

        while let Some(chunk) = byte_stream.next().await {
            if cancel.is_cancelled() {
                return Err(ModelError::Cancelled);
            }
            let chunk = chunk.map_err(ModelError::Http)?;
            let text_chunk = String::from_utf8_lossy(&chunk);
            for event in parser.feed(&text_chunk) {
                if event.data == "[DONE]" {
                    continue;
                }
                let ant_event: AnthropicEvent = match serde_json::from_str(&event.data) {
                    Ok(e) => e,
                    Err(e) => return Err(ModelError::Stream(format!("malformed event: {e}"))),
                };

                match ant_event {
                    AnthropicEvent::MessageStart { message } => {
                        usage.input_tokens = message.usage.input_tokens;
                        usage.output_tokens = message.usage.output_tokens;
                    }
                    AnthropicEvent::ContentBlockStart { index, content_block } => {
                        if let AnthropicContentBlockInfo::ToolUse { id, name } = content_block {
                            while pending_tool_calls.len() <= index {
                                pending_tool_calls.push(PendingToolCall::default());
                            }
                            pending_tool_calls[index].id = id;
                            pending_tool_calls[index].name = name;
                        }
                    }
                    AnthropicEvent::ContentBlockDelta { index, delta } => match delta {
                        AnthropicDelta::TextDelta { text: delta_text } => {
                            text.push_str(&delta_text);
                            on_delta(crate::provider::StreamEvent::TextDelta(delta_text));
                        }
                        AnthropicDelta::InputJsonDelta { partial_json } => {
                            while pending_tool_calls.len() <= index {
                                pending_tool_calls.push(PendingToolCall::default());
                            }
                            pending_tool_calls[index].arguments.push_str(&partial_json);
                        }
                    },
                    AnthropicEvent::MessageDelta { delta, usage: usage_delta } => {
                        if let Some(u) = usage_delta {
                            usage.output_tokens = u.output_tokens;
                        }
                        if let Some(reason) = delta.stop_reason {
                            stop_reason = match reason.as_str() {
                                "tool_use" => StopReason::ToolUse,
                                "max_tokens" => StopReason::MaxTokens,
                                _ => StopReason::EndTurn,
                            };
                        }
                    }
                    AnthropicEvent::Error { error } => return Err(ModelError::Api(error.message)),
                    AnthropicEvent::MessageStop
                    | AnthropicEvent::ContentBlockStop {}
                    | AnthropicEvent::Ping => {}
                }
            }
        }

        let mut content_blocks = Vec::new();
        if !text.is_empty() {
            content_blocks.push(ContentBlock::Text { text });
        }
        for pending in pending_tool_calls {
            if pending.id.is_empty() || pending.name.is_empty() {
                continue;
            }
            let arguments = serde_json::from_str(&pending.arguments).unwrap_or(serde_json::Value::Null);
            on_delta(crate::provider::StreamEvent::ToolCall(ToolCallEvent {
                id: pending.id.clone(),
                name: pending.name.clone(),
                arguments: arguments.clone(),
            }));
            content_blocks.push(ContentBlock::ToolCall { id: pending.id, name: pending.name, arguments });
        }

        Ok(StepResult {
            message: Message { role: Role::Assistant, content: Arc::new(content_blocks) },
            usage,
            stop_reason,
        })
    }
}
