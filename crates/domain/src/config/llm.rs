use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM configuration — feeds the policy resolver (aura-orchestrator::policy)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Default kind when a session has no override.
    #[serde(default)]
    pub default_kind: LlmKind,
    /// Default cloud provider, used when `default_kind = Cloud`.
    #[serde(default)]
    pub default_cloud_provider: Option<CloudProvider>,
    #[serde(default = "d_default_model")]
    pub default_model: String,
    #[serde(default)]
    pub default_tool_mode: ToolMode,
    #[serde(default)]
    pub default_thinking_mode: ThinkingMode,
    /// Local (on-device) endpoint configuration.
    #[serde(default)]
    pub local: LocalLlmConfig,
    /// Registered cloud providers (data-driven: adding a provider = adding config).
    #[serde(default)]
    pub cloud_providers: Vec<CloudProviderConfig>,
    #[serde(default = "d_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_kind: LlmKind::Local,
            default_cloud_provider: None,
            default_model: d_default_model(),
            default_tool_mode: ToolMode::default(),
            default_thinking_mode: ThinkingMode::default(),
            local: LocalLlmConfig::default(),
            cloud_providers: Vec::new(),
            request_timeout_ms: d_timeout_ms(),
        }
    }
}

impl LlmConfig {
    pub fn cloud_provider(&self, provider: CloudProvider) -> Option<&CloudProviderConfig> {
        self.cloud_providers.iter().find(|p| p.provider == provider)
    }
}

/// `kind` field of the Session Record's `llm_policy_override` and of the
/// resolved policy record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmKind {
    #[default]
    Local,
    Cloud,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudProvider {
    Openai,
    Claude,
}

/// How tool calls are solicited from the model: native function-calling
/// protocol, or embedded `<command>` markup parsed by the streaming filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    #[default]
    Native,
    Prompted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThinkingMode {
    #[default]
    Off,
    On,
    Extended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalLlmConfig {
    /// Endpoint URL for the local inference backend. `None` means no local
    /// backend is configured — resolving `kind = Local` is then UNSATISFIABLE.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "d_default_model")]
    pub default_model: String,
}

impl Default for LocalLlmConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            default_model: d_default_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudProviderConfig {
    pub provider: CloudProvider,
    pub endpoint: String,
    /// Environment variable holding the API key. Unset or pointing at an
    /// empty value means this provider is UNSATISFIABLE.
    pub api_key_env: String,
    pub default_model: String,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_default_model() -> String {
    "default".into()
}
fn d_timeout_ms() -> u64 {
    20_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_kind_is_local() {
        assert_eq!(LlmConfig::default().default_kind, LlmKind::Local);
    }

    #[test]
    fn cloud_provider_lookup() {
        let cfg = LlmConfig {
            cloud_providers: vec![CloudProviderConfig {
                provider: CloudProvider::Openai,
                endpoint: "https://api.openai.com/v1".into(),
                api_key_env: "OPENAI_API_KEY".into(),
                default_model: "gpt-4o".into(),
            }],
            ..LlmConfig::default()
        };
        assert!(cfg.cloud_provider(CloudProvider::Openai).is_some());
        assert!(cfg.cloud_provider(CloudProvider::Claude).is_none());
    }
}
