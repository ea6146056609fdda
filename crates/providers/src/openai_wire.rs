//! Wire shapes shared by the local provider and the OpenAI cloud provider.
//! Both speak the same `/v1/chat/completions`-style JSON; this module is the
//! single place that (de)serializes it and walks the SSE delta stream.

use aura_domain::message::{ContentPart, Message, MessageContent, Role, ToolCall, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::traits::{ChatOutcome, ChunkSink, Usage};

#[derive(Serialize)]
pub(crate) struct WireRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Serialize)]
pub(crate) struct WireMessage {
    pub role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct WireToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunctionCall,
}

#[derive(Serialize)]
pub(crate) struct WireFunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Serialize)]
pub(crate) struct WireTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunctionDef,
}

#[derive(Serialize)]
pub(crate) struct WireFunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

pub(crate) fn role_str(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn content_to_value(content: &MessageContent) -> Value {
    match content {
        MessageContent::Text(text) => Value::String(text.clone()),
        MessageContent::Parts(parts) => Value::Array(
            parts
                .iter()
                .map(|p| match p {
                    ContentPart::Text { text } => serde_json::json!({"type": "text", "text": text}),
                    ContentPart::Image { data, media_type } => serde_json::json!({
                        "type": "image_url",
                        "image_url": {"url": format!(
                            "data:{};base64,{}",
                            media_type.as_deref().unwrap_or("image/png"),
                            data,
                        )},
                    }),
                })
                .collect(),
        ),
    }
}

pub(crate) fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: role_str(&m.role),
            content: m.content.as_ref().map(content_to_value),
            tool_calls: m
                .tool_calls
                .iter()
                .map(|tc| WireToolCall {
                    id: tc.id.clone(),
                    kind: "function",
                    function: WireFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.to_string(),
                    },
                })
                .collect(),
            tool_call_id: m.tool_call_id.clone(),
        })
        .collect()
}

pub(crate) fn to_wire_tools(tools: &[ToolDefinition]) -> Vec<WireTool> {
    tools
        .iter()
        .map(|t| WireTool {
            kind: "function",
            function: WireFunctionDef {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            },
        })
        .collect()
}

/// One `choices[0].delta` slice of a streamed chunk.
#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<StreamToolCallDelta>,
}

#[derive(Deserialize)]
struct StreamToolCallDelta {
    index: usize,
    id: Option<String>,
    function: Option<StreamFunctionDelta>,
}

#[derive(Deserialize, Default)]
struct StreamFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Accumulates `StreamToolCallDelta` fragments (split across many chunks, by
/// index) into complete `ToolCall`s.
#[derive(Default)]
pub(crate) struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

/// Feeds raw SSE `data:` payloads to `sink` and accumulates a final
/// `ChatOutcome`. `[DONE]` ends the stream.
pub(crate) fn consume_data_line(
    data: &str,
    sink: &mut dyn ChunkSink,
    text: &mut String,
    tool_calls: &mut Vec<ToolCallAccumulator>,
    usage: &mut Option<Usage>,
    finish_reason: &mut Option<String>,
) -> bool {
    if data == "[DONE]" {
        return false;
    }
    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(c) => c,
        Err(_) => return true,
    };
    if let Some(u) = chunk.usage {
        *usage = Some(Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
    }
    for choice in chunk.choices {
        if let Some(reason) = choice.finish_reason {
            *finish_reason = Some(reason);
        }
        if let Some(delta_text) = choice.delta.content {
            if !delta_text.is_empty() {
                text.push_str(&delta_text);
                sink.on_chunk(&delta_text);
            }
        }
        for tc_delta in choice.delta.tool_calls {
            while tool_calls.len() <= tc_delta.index {
                tool_calls.push(ToolCallAccumulator::default());
            }
            let acc = &mut tool_calls[tc_delta.index];
            if let Some(id) = tc_delta.id {
                acc.id = id;
            }
            if let Some(f) = tc_delta.function {
                if let Some(name) = f.name {
                    acc.name.push_str(&name);
                }
                if let Some(args) = f.arguments {
                    acc.arguments.push_str(&args);
                }
            }
        }
    }
    true
}

pub(crate) fn finalize_outcome(
    text: String,
    accumulated: Vec<ToolCallAccumulator>,
    usage: Option<Usage>,
    finish_reason: Option<String>,
) -> ChatOutcome {
    let tool_calls = accumulated
        .into_iter()
        .filter(|acc| !acc.name.is_empty())
        .map(|acc| ToolCall {
            id: acc.id,
            name: acc.name,
            arguments: serde_json::from_str(&acc.arguments).unwrap_or(Value::Null),
        })
        .collect();
    ChatOutcome {
        text,
        tool_calls,
        usage,
        finish_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_domain::message::Message;

    struct CollectSink(String);
    impl ChunkSink for CollectSink {
        fn on_chunk(&mut self, text: &str) {
            self.0.push_str(text);
        }
    }

    #[test]
    fn consume_data_line_accumulates_text() {
        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut usage = None;
        let mut finish_reason = None;
        let mut sink = CollectSink(String::new());

        let data = r#"{"choices":[{"delta":{"content":"hel"},"finish_reason":null}]}"#;
        assert!(consume_data_line(
            data,
            &mut sink,
            &mut text,
            &mut tool_calls,
            &mut usage,
            &mut finish_reason
        ));
        assert_eq!(text, "hel");
        assert_eq!(sink.0, "hel");
    }

    #[test]
    fn done_sentinel_stops_stream() {
        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut usage = None;
        let mut finish_reason = None;
        let mut sink = CollectSink(String::new());
        assert!(!consume_data_line(
            "[DONE]",
            &mut sink,
            &mut text,
            &mut tool_calls,
            &mut usage,
            &mut finish_reason
        ));
    }

    #[test]
    fn tool_call_deltas_accumulate_by_index() {
        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let mut usage = None;
        let mut finish_reason = None;
        let mut sink = CollectSink(String::new());

        let chunk1 = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"get_weather","arguments":""}}]}}]}"#;
        let chunk2 = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"city\":"}}]}}}]}"#;
        let chunk3 = r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"nyc\"}"}}]}}]}"#;

        consume_data_line(chunk1, &mut sink, &mut text, &mut tool_calls, &mut usage, &mut finish_reason);
        consume_data_line(chunk2, &mut sink, &mut text, &mut tool_calls, &mut usage, &mut finish_reason);
        consume_data_line(chunk3, &mut sink, &mut text, &mut tool_calls, &mut usage, &mut finish_reason);

        let outcome = finalize_outcome(text, tool_calls, usage, finish_reason);
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].name, "get_weather");
        assert_eq!(outcome.tool_calls[0].id, "call_1");
    }

    #[test]
    fn to_wire_messages_preserves_role_and_tool_call_id() {
        let messages = vec![Message::tool_result("call_1", "sunny")];
        let wire = to_wire_messages(&messages);
        assert_eq!(wire[0].role, "tool");
        assert_eq!(wire[0].tool_call_id.as_deref(), Some("call_1"));
    }
}
