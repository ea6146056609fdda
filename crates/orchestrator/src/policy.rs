//! LLM Policy Resolver (§4.8). Pure given its inputs — no I/O. Merges a
//! session's override with global defaults into a concrete record the
//! caller takes by value into exactly one `chat_stream` call.

use aura_domain::config::llm::{CloudProvider, LlmConfig};
use aura_domain::error::{Error, Result};
use aura_domain::policy::{PolicyKind, PolicyOverride, ResolvedPolicy};
use std::collections::HashSet;
use std::env;

/// Which credentials/endpoints are actually usable, computed once at
/// startup from the environment and handed to the resolver as plain data
/// so `resolve` itself never touches the environment.
pub struct AvailableCredentials {
    pub cloud_providers: HashSet<CloudProvider>,
}

impl AvailableCredentials {
    pub fn from_config(config: &LlmConfig) -> Self {
        let cloud_providers = config
            .cloud_providers
            .iter()
            .filter(|p| env::var(&p.api_key_env).map(|v| !v.is_empty()).unwrap_or(false))
            .map(|p| p.provider)
            .collect();
        Self { cloud_providers }
    }
}

pub fn resolve(
    session_override: &PolicyOverride,
    defaults: &LlmConfig,
    available: &AvailableCredentials,
) -> Result<ResolvedPolicy> {
    let fields = match session_override {
        PolicyOverride::Default => None,
        PolicyOverride::Explicit(fields) => Some(fields),
    };

    let kind = fields
        .and_then(|f| f.kind)
        .unwrap_or(match defaults.default_kind {
            aura_domain::config::llm::LlmKind::Local => PolicyKind::Local,
            aura_domain::config::llm::LlmKind::Cloud => PolicyKind::Cloud,
        });

    match kind {
        PolicyKind::Local => {
            let endpoint = fields
                .and_then(|f| f.endpoint.clone())
                .or_else(|| defaults.local.endpoint.clone())
                .ok_or_else(|| Error::InvalidPolicy("local LLM requested but no endpoint configured".into()))?;
            let model = fields
                .and_then(|f| f.model.clone())
                .unwrap_or_else(|| defaults.local.default_model.clone());
            Ok(ResolvedPolicy {
                kind,
                provider: None,
                endpoint,
                api_key: None,
                model,
                tool_mode: fields.and_then(|f| f.tool_mode).unwrap_or(defaults.default_tool_mode),
                thinking_mode: fields.and_then(|f| f.thinking_mode).unwrap_or(defaults.default_thinking_mode),
            })
        }
        PolicyKind::Cloud => {
            let provider = fields
                .and_then(|f| f.cloud_provider)
                .or(defaults.default_cloud_provider)
                .ok_or_else(|| Error::InvalidPolicy("cloud LLM requested but no provider selected".into()))?;

            if !available.cloud_providers.contains(&provider) {
                return Err(Error::InvalidPolicy(format!("no API key configured for provider {provider:?}")));
            }
            let provider_config = defaults
                .cloud_provider(provider)
                .ok_or_else(|| Error::InvalidPolicy(format!("provider {provider:?} not present in configuration")))?;

            let endpoint = fields.and_then(|f| f.endpoint.clone()).unwrap_or_else(|| provider_config.endpoint.clone());
            let model = fields.and_then(|f| f.model.clone()).unwrap_or_else(|| provider_config.default_model.clone());
            let api_key = env::var(&provider_config.api_key_env).ok();

            Ok(ResolvedPolicy {
                kind,
                provider: Some(provider),
                endpoint,
                api_key,
                model,
                tool_mode: fields.and_then(|f| f.tool_mode).unwrap_or(defaults.default_tool_mode),
                thinking_mode: fields.and_then(|f| f.thinking_mode).unwrap_or(defaults.default_thinking_mode),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_domain::config::llm::CloudProviderConfig;
    use aura_domain::policy::PolicyOverrideFields;

    fn config_with_local() -> LlmConfig {
        let mut cfg = LlmConfig::default();
        cfg.local.endpoint = Some("http://localhost:8080/v1".into());
        cfg
    }

    #[test]
    fn default_override_resolves_to_local_defaults() {
        let config = config_with_local();
        let available = AvailableCredentials::from_config(&config);
        let resolved = resolve(&PolicyOverride::Default, &config, &available).unwrap();
        assert_eq!(resolved.kind, PolicyKind::Local);
        assert_eq!(resolved.endpoint, "http://localhost:8080/v1");
    }

    #[test]
    fn local_without_endpoint_is_unsatisfiable() {
        let config = LlmConfig::default();
        let available = AvailableCredentials::from_config(&config);
        let err = resolve(&PolicyOverride::Default, &config, &available).unwrap_err();
        assert!(matches!(err, Error::InvalidPolicy(_)));
    }

    #[test]
    fn explicit_local_endpoint_override_satisfies_with_no_global_default() {
        let config = LlmConfig::default();
        let available = AvailableCredentials::from_config(&config);
        let session_override = PolicyOverride::Explicit(PolicyOverrideFields {
            endpoint: Some("http://192.168.1.50:8080/v1".into()),
            ..Default::default()
        });
        let resolved = resolve(&session_override, &config, &available).unwrap();
        assert_eq!(resolved.kind, PolicyKind::Local);
        assert_eq!(resolved.endpoint, "http://192.168.1.50:8080/v1");
    }

    #[test]
    fn cloud_without_api_key_is_unsatisfiable() {
        let mut config = config_with_local();
        config.default_kind = aura_domain::config::llm::LlmKind::Cloud;
        config.default_cloud_provider = Some(CloudProvider::Openai);
        config.cloud_providers.push(CloudProviderConfig {
            provider: CloudProvider::Openai,
            endpoint: "https://api.openai.com/v1".into(),
            api_key_env: "AURA_TEST_UNSET_KEY_XYZ".into(),
            default_model: "gpt-4o".into(),
        });
        let available = AvailableCredentials::from_config(&config);
        let err = resolve(&PolicyOverride::Default, &config, &available).unwrap_err();
        assert!(matches!(err, Error::InvalidPolicy(_)));
    }

    #[test]
    fn explicit_override_beats_defaults() {
        let config = config_with_local();
        let available = AvailableCredentials::from_config(&config);
        let session_override = PolicyOverride::Explicit(PolicyOverrideFields {
            model: Some("custom-model".into()),
            ..Default::default()
        });
        let resolved = resolve(&session_override, &config, &available).unwrap();
        assert_eq!(resolved.model, "custom-model");
    }
}
