use aura_domain::config::llm::CloudProvider;
use aura_domain::error::{Error, Result};
use aura_domain::policy::{PolicyKind, PolicyOverride, PolicyOverrideFields};
use serde::Deserialize;
use serde_json::Value;

use crate::outcome::ToolOutcome;
use crate::tool::Tool;

/// Scenario 3: a tool whose own text *is* the final reply — no LLM
/// follow-up call. Mutates the calling session's policy override via the
/// command context, matching §4.4's "tool callbacks consult it to mutate
/// that session's policy".
pub struct SwitchLlmTool;

#[derive(Deserialize)]
struct Args {
    kind: String,
    provider: Option<String>,
}

impl Tool for SwitchLlmTool {
    fn name(&self) -> &str {
        "switch_llm"
    }

    fn description(&self) -> &str {
        "Switches the current session to a different LLM backend (local or cloud)."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "kind": {"type": "string", "enum": ["local", "cloud"]},
                "provider": {"type": "string", "enum": ["openai", "claude"]},
            },
            "required": ["kind"],
        })
    }

    fn execute(&self, arguments: &Value) -> Result<ToolOutcome> {
        let args: Args = serde_json::from_value(arguments.clone())
            .map_err(|e| Error::ToolExecutionFailure(format!("switch_llm: bad arguments: {e}")))?;

        let session = aura_sessions::command_context::current()
            .ok_or_else(|| Error::ToolExecutionFailure("switch_llm: no command context bound".into()))?;

        let (kind, provider, label) = match args.kind.as_str() {
            "local" => (PolicyKind::Local, None, "local".to_string()),
            "cloud" => match args.provider.as_deref() {
                Some("openai") => (PolicyKind::Cloud, Some(CloudProvider::Openai), "openai".to_string()),
                Some("claude") => (PolicyKind::Cloud, Some(CloudProvider::Claude), "claude".to_string()),
                _ => {
                    return Err(Error::ToolExecutionFailure(
                        "switch_llm: cloud kind requires a provider".into(),
                    ))
                }
            },
            other => return Err(Error::ToolExecutionFailure(format!("switch_llm: unknown kind {other}"))),
        };

        session.set_policy(PolicyOverride::Explicit(PolicyOverrideFields {
            kind: Some(kind),
            cloud_provider: provider,
            ..Default::default()
        }));

        let direct_response = format!("Switched to {label}.");
        Ok(ToolOutcome::skip_followup(direct_response.clone(), direct_response))
    }
}
