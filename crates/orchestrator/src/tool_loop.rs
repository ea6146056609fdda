//! Tool Iteration Loop (§4.7): bounded fixed-point loop over tool calls.

use aura_domain::error::Result;
use aura_domain::message::{Message, ToolDefinition};
use aura_domain::policy::ResolvedPolicy;
use aura_providers::traits::{ChatRequest, ChunkSink, LlmProvider};
use aura_tools::ToolRegistry;

const APOLOGY: &str = "I wasn't able to finish that after several attempts. Could you try rephrasing?";

pub struct ToolLoopOutcome {
    pub final_text: String,
    /// Tool-call/tool-result message pairs generated across all rounds, in
    /// order, to be appended to session history ahead of the final
    /// assistant message.
    pub extra_messages: Vec<Message>,
    pub tool_iterations: u32,
}

/// Runs the bounded loop. `history` is the turn's starting snapshot (user
/// message already appended by the caller); the loop never mutates session
/// state directly — it returns the messages the caller should append.
#[allow(clippy::too_many_arguments)]
pub fn run(
    provider: &dyn LlmProvider,
    resolved: &ResolvedPolicy,
    tools: &ToolRegistry,
    session_id: u64,
    history: &[Message],
    max_iterations: u32,
    sink: &mut dyn ChunkSink,
) -> Result<ToolLoopOutcome> {
    let tool_defs: Vec<ToolDefinition> = tools.definitions();
    let mut working_history: Vec<Message> = history.to_vec();
    let mut extra_messages = Vec::new();
    let mut pending_vision: Option<Message> = None;

    for iteration in 1..=max_iterations {
        let request_messages: Vec<Message> = match pending_vision.take() {
            Some(vision_message) => {
                let mut m = working_history.clone();
                m.push(vision_message);
                m
            }
            None => working_history.clone(),
        };

        let request = ChatRequest {
            session_id,
            model: &resolved.model,
            messages: &request_messages,
            tools: &tool_defs,
            temperature: None,
            max_tokens: None,
        };
        let outcome = provider.chat_stream(&request, sink)?;

        if outcome.tool_calls.is_empty() {
            return Ok(ToolLoopOutcome {
                final_text: outcome.text,
                extra_messages,
                tool_iterations: iteration - 1,
            });
        }

        let assistant_msg = Message::assistant_tool_calls(outcome.tool_calls.clone());
        working_history.push(assistant_msg.clone());
        extra_messages.push(assistant_msg);

        let results = tools.execute_all(session_id, &outcome.tool_calls);
        for result_msg in &results.tool_result_messages {
            working_history.push(result_msg.clone());
        }
        extra_messages.extend(results.tool_result_messages);

        if let Some(direct_response) = results.skip_followup {
            sink.on_chunk(&direct_response);
            return Ok(ToolLoopOutcome {
                final_text: direct_response,
                extra_messages,
                tool_iterations: iteration,
            });
        }

        if iteration == max_iterations {
            aura_domain::trace::TraceEvent::ToolIterationLimitReached {
                session_id,
                max_iterations,
            }
            .emit();
            sink.on_chunk(APOLOGY);
            return Ok(ToolLoopOutcome {
                final_text: APOLOGY.to_string(),
                extra_messages,
                tool_iterations: iteration,
            });
        }

        if let Some(vision) = results.pending_vision {
            pending_vision = Some(Message::user_with_image(String::new(), vision.data, vision.media_type));
        }
    }

    unreachable!("loop always returns by iteration == max_iterations")
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_domain::error::Error;
    use aura_providers::traits::ChatOutcome;
    use aura_domain::message::{Role, ToolCall};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct NullSink;
    impl ChunkSink for NullSink {
        fn on_chunk(&mut self, _text: &str) {}
    }

    struct ScriptedProvider {
        calls: AtomicU32,
        responses: Mutex<Vec<ChatOutcome>>,
    }

    impl LlmProvider for ScriptedProvider {
        fn provider_id(&self) -> &str {
            "scripted"
        }
        fn chat_stream(&self, _req: &ChatRequest<'_>, _sink: &mut dyn ChunkSink) -> Result<ChatOutcome> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            let mut responses = self.responses.lock().unwrap();
            if idx >= responses.len() {
                return Err(Error::LlmTransportFailure("scripted provider exhausted".into()));
            }
            Ok(std::mem::take(&mut responses[idx]))
        }
    }

    fn resolved() -> ResolvedPolicy {
        ResolvedPolicy {
            kind: aura_domain::policy::PolicyKind::Local,
            provider: None,
            endpoint: "http://localhost".into(),
            api_key: None,
            model: "test-model".into(),
            tool_mode: Default::default(),
            thinking_mode: Default::default(),
        }
    }

    #[test]
    fn no_tool_calls_returns_text_immediately() {
        let provider = ScriptedProvider {
            calls: AtomicU32::new(0),
            responses: Mutex::new(vec![ChatOutcome {
                text: "Hi there.".into(),
                ..Default::default()
            }]),
        };
        let tools = ToolRegistry::new();
        let history = vec![Message::user("Hello.")];
        let mut sink = NullSink;
        let outcome = run(&provider, &resolved(), &tools, 1, &history, 5, &mut sink).unwrap();
        assert_eq!(outcome.final_text, "Hi there.");
        assert!(outcome.extra_messages.is_empty());
    }

    #[test]
    fn single_tool_round_trip_pairs_messages_and_calls_twice() {
        use aura_tools::builtin::GetWeatherTool;
        use std::sync::Arc;

        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(GetWeatherTool));

        let provider = ScriptedProvider {
            calls: AtomicU32::new(0),
            responses: Mutex::new(vec![
                ChatOutcome {
                    text: String::new(),
                    tool_calls: vec![ToolCall {
                        id: "call_1".into(),
                        name: "get_weather".into(),
                        arguments: serde_json::json!({"city": "SF"}),
                    }],
                    ..Default::default()
                },
                ChatOutcome {
                    text: "It's 68 and clear in San Francisco.".into(),
                    ..Default::default()
                },
            ]),
        };

        let history = vec![Message::user("What's the weather?")];
        let mut sink = NullSink;
        let outcome = run(&provider, &resolved(), &tools, 1, &history, 5, &mut sink).unwrap();

        assert_eq!(outcome.final_text, "It's 68 and clear in San Francisco.");
        assert_eq!(outcome.extra_messages.len(), 2);
        assert_eq!(outcome.extra_messages[0].role, Role::Assistant);
        assert_eq!(outcome.extra_messages[1].role, Role::Tool);
    }

    #[test]
    fn skip_followup_short_circuits_without_second_call() {
        use aura_tools::builtin::SwitchLlmTool;
        use std::sync::Arc;

        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(SwitchLlmTool));

        let provider = ScriptedProvider {
            calls: AtomicU32::new(0),
            responses: Mutex::new(vec![ChatOutcome {
                text: String::new(),
                tool_calls: vec![ToolCall {
                    id: "call_1".into(),
                    name: "switch_llm".into(),
                    arguments: serde_json::json!({"kind": "local"}),
                }],
                ..Default::default()
            }]),
        };

        let session = std::sync::Arc::new(aura_sessions::SessionRecord::new(
            1,
            aura_sessions::SessionKind::Web,
            None,
            chrono::Utc::now(),
        ));
        let _guard = aura_sessions::enter_command_context(session);

        let history = vec![Message::user("Switch to local LLM.")];
        let mut sink = NullSink;
        let outcome = run(&provider, &resolved(), &tools, 1, &history, 5, &mut sink).unwrap();
        assert_eq!(outcome.final_text, "Switched to local.");
    }

    #[test]
    fn iteration_limit_returns_apology_after_exactly_max_executions() {
        use aura_tools::builtin::GetWeatherTool;
        use std::sync::Arc;

        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(GetWeatherTool));

        let always_tool_call = || ChatOutcome {
            text: String::new(),
            tool_calls: vec![ToolCall {
                id: "call".into(),
                name: "get_weather".into(),
                arguments: serde_json::json!({"city": "SF"}),
            }],
            ..Default::default()
        };

        let provider = ScriptedProvider {
            calls: AtomicU32::new(0),
            responses: Mutex::new((0..5).map(|_| always_tool_call()).collect()),
        };

        let history = vec![Message::user("loop forever")];
        let mut sink = NullSink;
        let outcome = run(&provider, &resolved(), &tools, 1, &history, 5, &mut sink).unwrap();
        assert_eq!(outcome.final_text, APOLOGY);
        assert_eq!(outcome.tool_iterations, 5);
    }
}
