//! Result of one tool execution (§4.7, §6 "From the core, to tool registry").

/// Image bytes a tool produced (e.g. a camera capture) to be included as
/// the vision input of the *next* LLM call. Must be consumed or cleared
/// within the same turn (§9 open question: session-scoped, not global).
#[derive(Debug, Clone)]
pub struct PendingVision {
    pub data: String,
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ToolOutcome {
    /// Text fed back to the LLM as the tool-role message content.
    pub result_text: String,
    /// If set, the tool loop returns `direct_response` as the final text
    /// without calling the LLM again.
    pub skip_followup: bool,
    pub direct_response: Option<String>,
    pub pending_vision: Option<PendingVision>,
}

impl ToolOutcome {
    pub fn text(result_text: impl Into<String>) -> Self {
        Self {
            result_text: result_text.into(),
            ..Default::default()
        }
    }

    pub fn skip_followup(result_text: impl Into<String>, direct_response: impl Into<String>) -> Self {
        let direct_response = direct_response.into();
        Self {
            result_text: result_text.into(),
            skip_followup: true,
            direct_response: Some(direct_response),
            pending_vision: None,
        }
    }

    pub fn with_vision(mut self, data: impl Into<String>, media_type: Option<String>) -> Self {
        self.pending_vision = Some(PendingVision {
            data: data.into(),
            media_type,
        });
        self
    }
}
