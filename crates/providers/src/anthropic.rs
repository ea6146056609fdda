//! Anthropic Messages API provider, blocking + SSE.

use aura_domain::error::{Error, Result};
use aura_domain::message::{ContentPart, Message, MessageContent, Role, ToolCall, ToolDefinition};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

use crate::sse::read_sse_blocking;
use crate::traits::{ChatOutcome, ChatRequest, ChunkSink, LlmProvider, Usage};

pub struct AnthropicProvider {
    endpoint: String,
    api_key: String,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Other(format!("building anthropic client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client,
        })
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum AnthropicContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: AnthropicImageSource },
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String, input: Value },
    #[serde(rename = "tool_result")]
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Serialize)]
struct AnthropicImageSource {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: String,
    data: String,
}

#[derive(Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

/// Anthropic puts system prompts in a top-level `system` field, not a
/// message with `role: "system"`; everything else maps role-for-role.
fn split_system_prompt(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
    let mut system = None;
    let mut rest = Vec::with_capacity(messages.len());
    for m in messages {
        if m.role == Role::System {
            let text = m.content.as_ref().map(|c| c.extract_all_text()).unwrap_or_default();
            system = Some(match system {
                Some(existing) => format!("{existing}\n{text}"),
                None => text,
            });
        } else {
            rest.push(m);
        }
    }
    (system, rest)
}

fn to_anthropic_messages(messages: &[&Message]) -> Vec<AnthropicMessage> {
    messages
        .iter()
        .map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Tool => "user", // tool results are user-turn content blocks
                _ => "assistant",
            };
            let mut blocks = Vec::new();
            if let Some(tool_call_id) = &m.tool_call_id {
                let text = m.content.as_ref().map(|c| c.extract_all_text()).unwrap_or_default();
                blocks.push(AnthropicContentBlock::ToolResult {
                    tool_use_id: tool_call_id.clone(),
                    content: text,
                });
            } else if let Some(content) = &m.content {
                match content {
                    MessageContent::Text(text) => blocks.push(AnthropicContentBlock::Text { text: text.clone() }),
                    MessageContent::Parts(parts) => {
                        for part in parts {
                            match part {
                                ContentPart::Text { text } => {
                                    blocks.push(AnthropicContentBlock::Text { text: text.clone() })
                                }
                                ContentPart::Image { data, media_type } => {
                                    blocks.push(AnthropicContentBlock::Image {
                                        source: AnthropicImageSource {
                                            kind: "base64",
                                            media_type: media_type.clone().unwrap_or_else(|| "image/png".into()),
                                            data: data.clone(),
                                        },
                                    })
                                }
                            }
                        }
                    }
                }
            }
            for tc in &m.tool_calls {
                blocks.push(AnthropicContentBlock::ToolUse {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    input: tc.arguments.clone(),
                });
            }
            AnthropicMessage { role, content: blocks }
        })
        .collect()
}

fn to_anthropic_tools(tools: &[ToolDefinition]) -> Vec<AnthropicTool> {
    tools
        .iter()
        .map(|t| AnthropicTool {
            name: t.name.clone(),
            description: t.description.clone(),
            input_schema: t.parameters.clone(),
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum AnthropicStreamEvent {
    #[serde(rename = "content_block_start")]
    ContentBlockStart {
        index: usize,
        content_block: AnthropicStreamBlockStart,
    },
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { index: usize, delta: AnthropicStreamDelta },
    #[serde(rename = "message_delta")]
    MessageDelta {
        delta: AnthropicMessageDeltaInner,
        usage: Option<AnthropicUsage>,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct AnthropicStreamBlockStart {
    #[serde(rename = "type")]
    kind: String,
    id: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum AnthropicStreamDelta {
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct AnthropicMessageDeltaInner {
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Default)]
struct PendingToolUse {
    index: usize,
    id: String,
    name: String,
    json_buf: String,
}

impl LlmProvider for AnthropicProvider {
    fn provider_id(&self) -> &str {
        "anthropic"
    }

    fn chat_stream(&self, req: &ChatRequest<'_>, sink: &mut dyn ChunkSink) -> Result<ChatOutcome> {
        let started = Instant::now();
        let (system, rest) = split_system_prompt(req.messages);
        let body = AnthropicRequest {
            model: req.model,
            max_tokens: req.max_tokens.unwrap_or(4096),
            messages: to_anthropic_messages(&rest),
            system,
            tools: to_anthropic_tools(req.tools),
            stream: true,
            temperature: req.temperature,
        };

        let url = format!("{}/v1/messages", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .map_err(|e| Error::LlmTransportFailure(format!("anthropic endpoint {url}: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::LlmTransportFailure(format!(
                "anthropic endpoint returned {status}: {body}"
            )));
        }

        let mut text = String::new();
        let mut tool_uses: Vec<PendingToolUse> = Vec::new();
        let mut usage = None;
        let mut finish_reason = None;

        read_sse_blocking(response, |data| {
            let event: AnthropicStreamEvent = match serde_json::from_str(data) {
                Ok(e) => e,
                Err(_) => return,
            };
            match event {
                AnthropicStreamEvent::ContentBlockStart { index, content_block } => {
                    if content_block.kind == "tool_use" {
                        tool_uses.push(PendingToolUse {
                            index,
                            id: content_block.id.unwrap_or_default(),
                            name: content_block.name.unwrap_or_default(),
                            json_buf: String::new(),
                        });
                    }
                }
                AnthropicStreamEvent::ContentBlockDelta { index, delta } => match delta {
                    AnthropicStreamDelta::TextDelta { text: delta_text } => {
                        text.push_str(&delta_text);
                        sink.on_chunk(&delta_text);
                    }
                    AnthropicStreamDelta::InputJsonDelta { partial_json } => {
                        if let Some(pending) = tool_uses.iter_mut().find(|t| t.index == index) {
                            pending.json_buf.push_str(&partial_json);
                        }
                    }
                    AnthropicStreamDelta::Other => {}
                },
                AnthropicStreamEvent::MessageDelta { delta, usage: u } => {
                    finish_reason = delta.stop_reason;
                    if let Some(u) = u {
                        usage = Some(Usage {
                            prompt_tokens: u.input_tokens,
                            completion_tokens: u.output_tokens,
                            total_tokens: u.input_tokens + u.output_tokens,
                        });
                    }
                }
                AnthropicStreamEvent::Other => {}
            }
        })
        .map_err(|e| Error::LlmTransportFailure(format!("reading anthropic stream: {e}")))?;

        let tool_calls = tool_uses
            .into_iter()
            .map(|t| ToolCall {
                id: t.id,
                name: t.name,
                arguments: serde_json::from_str(&t.json_buf).unwrap_or(Value::Null),
            })
            .collect();

        aura_domain::trace::TraceEvent::LlmRequest {
            session_id: req.session_id,
            provider: "anthropic".to_string(),
            model: req.model.to_string(),
            streaming: true,
            duration_ms: started.elapsed().as_millis() as u64,
            prompt_tokens: usage.map(|u| u.prompt_tokens),
            completion_tokens: usage.map(|u| u.completion_tokens),
        }
        .emit();

        Ok(ChatOutcome {
            text,
            tool_calls,
            usage,
            finish_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_system_prompt_separates_system_messages() {
        let messages = vec![Message::system("be terse"), Message::user("hi")];
        let (system, rest) = split_system_prompt(&messages);
        assert_eq!(system.as_deref(), Some("be terse"));
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn tool_result_message_maps_to_tool_result_block() {
        let messages = vec![Message::tool_result("call_1", "sunny")];
        let wire = to_anthropic_messages(&messages.iter().collect::<Vec<_>>());
        assert_eq!(wire[0].role, "user");
        assert!(matches!(wire[0].content[0], AnthropicContentBlock::ToolResult { .. }));
    }
}
