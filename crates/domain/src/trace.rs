use serde::Serialize;

/// Structured trace events emitted across all aura crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        session_id: u64,
        kind: String,
    },
    SessionReclaimed {
        session_id: u64,
        kind: String,
    },
    SessionEvicted {
        session_id: u64,
    },
    SessionDrained {
        session_id: u64,
    },
    SessionExpired {
        session_id: u64,
        idle_secs: u64,
    },
    TurnStarted {
        session_id: u64,
        request_generation: u64,
    },
    TurnCompleted {
        session_id: u64,
        request_generation: u64,
        tool_iterations: u32,
    },
    TurnCancelled {
        session_id: u64,
        reason: String,
    },
    TurnSuperseded {
        session_id: u64,
        observed_generation: u64,
        current_generation: u64,
    },
    StreamCommandTagOpened {
        session_id: u64,
        stream_id: u64,
    },
    ToolCallExecuted {
        session_id: u64,
        tool_name: String,
        is_error: bool,
        duration_ms: u64,
    },
    ToolIterationLimitReached {
        session_id: u64,
        max_iterations: u32,
    },
    LlmRequest {
        session_id: u64,
        provider: String,
        model: String,
        streaming: bool,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    PolicyResolved {
        session_id: u64,
        kind: String,
        provider: Option<String>,
        model: String,
    },
    PolicyRejected {
        session_id: u64,
        reason: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "aura_event");
    }
}
