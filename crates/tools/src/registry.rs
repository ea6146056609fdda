//! `execute_all(tool_calls) → tool_results` (§6). Dispatches each native
//! tool call in turn, by name.

use aura_domain::message::{Message, ToolCall, ToolDefinition};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::outcome::{PendingVision, ToolOutcome};
use crate::tool::Tool;

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Executes every call in order, for a given session (for tracing).
    /// Tool failures become a `TOOL_EXECUTION_FAILURE`-flavored result text
    /// rather than aborting the loop (§7 propagation policy).
    pub fn execute_all(&self, session_id: u64, calls: &[ToolCall]) -> ExecuteAllResult {
        let mut messages = Vec::with_capacity(calls.len());
        let mut skip_followup = None;
        let mut pending_vision = None;

        for call in calls {
            let started = Instant::now();
            let (result_text, outcome_extra) = match self.tools.get(&call.name) {
                Some(tool) => match tool.execute(&call.arguments) {
                    Ok(outcome) => (outcome.result_text.clone(), Some(outcome)),
                    Err(e) => (format!("tool execution failed: {e}"), None),
                },
                None => (format!("unknown tool: {}", call.name), None),
            };
            let is_error = outcome_extra.is_none();
            tracing::debug!(tool = %call.name, session_id, is_error, "tool executed");
            aura_domain::trace::TraceEvent::ToolCallExecuted {
                session_id,
                tool_name: call.name.clone(),
                is_error,
                duration_ms: started.elapsed().as_millis() as u64,
            }
            .emit();

            messages.push(Message::tool_result(call.id.clone(), result_text));

            if let Some(outcome) = outcome_extra {
                if outcome.skip_followup {
                    skip_followup = outcome.direct_response;
                }
                if outcome.pending_vision.is_some() {
                    pending_vision = outcome.pending_vision;
                }
            }
        }

        ExecuteAllResult {
            tool_result_messages: messages,
            skip_followup,
            pending_vision,
        }
    }
}

pub struct ExecuteAllResult {
    pub tool_result_messages: Vec<Message>,
    pub skip_followup: Option<String>,
    pub pending_vision: Option<PendingVision>,
}
