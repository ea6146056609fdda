//! Types shared between a session's stored policy override and the
//! resolver that turns it into a concrete, ready-to-call LLM configuration.

use crate::config::llm::{CloudProvider, ThinkingMode, ToolMode};
use serde::{Deserialize, Serialize};

/// What a session stores in its `policy_mutex`-guarded slot: either
/// "use the global defaults" or a concrete override of part of it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum PolicyOverride {
    #[default]
    Default,
    Explicit(PolicyOverrideFields),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicyOverrideFields {
    pub kind: Option<PolicyKind>,
    pub cloud_provider: Option<CloudProvider>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub tool_mode: Option<ToolMode>,
    pub thinking_mode: Option<ThinkingMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Local,
    Cloud,
}

/// Output of the LLM Policy Resolver: a concrete, self-contained
/// configuration for exactly one `chat_stream` call. Taken by value with no
/// locks held.
#[derive(Debug, Clone)]
pub struct ResolvedPolicy {
    pub kind: PolicyKind,
    pub provider: Option<CloudProvider>,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub tool_mode: ToolMode,
    pub thinking_mode: ThinkingMode,
}

impl ResolvedPolicy {
    /// Key into `aura_providers::ProviderRegistry`.
    pub fn provider_id(&self) -> &'static str {
        match (self.kind, self.provider) {
            (PolicyKind::Local, _) => "local",
            (PolicyKind::Cloud, Some(CloudProvider::Openai)) => "openai",
            (PolicyKind::Cloud, Some(CloudProvider::Claude)) => "claude",
            (PolicyKind::Cloud, None) => "openai",
        }
    }
}
