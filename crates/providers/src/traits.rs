use aura_domain::error::Result;
use aura_domain::message::{Message, ToolCall, ToolDefinition};

/// Request shape fed to one blocking LLM call.
pub struct ChatRequest<'a> {
    /// Carried through only for trace attribution (`TraceEvent::LlmRequest`);
    /// providers never branch on it.
    pub session_id: u64,
    pub model: &'a str,
    pub messages: &'a [Message],
    pub tools: &'a [ToolDefinition],
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Result of one `chat_stream` call: the accumulated assistant text and any
/// native tool calls the model produced.
#[derive(Debug, Clone, Default)]
pub struct ChatOutcome {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
    pub finish_reason: Option<String>,
}

/// The sink a provider feeds every text delta to, in order, as it streams.
/// The Turn Orchestrator's Streaming Filter is the concrete implementation.
pub trait ChunkSink {
    fn on_chunk(&mut self, text: &str);
}

/// A no-op sink, useful for tests and for the follow-up call after
/// `skip_followup` has already resolved (§4.7 step 5 — no LLM call made).
pub struct NullSink;
impl ChunkSink for NullSink {
    fn on_chunk(&mut self, _text: &str) {}
}

/// Blocking LLM transport. `chat_stream` blocks the calling worker thread
/// for the duration of the HTTP call; no session lock may be held across it
/// (the resolved policy is taken by value, per the policy resolver contract).
pub trait LlmProvider: Send + Sync {
    fn provider_id(&self) -> &str;

    fn chat_stream(&self, req: &ChatRequest<'_>, sink: &mut dyn ChunkSink) -> Result<ChatOutcome>;
}
