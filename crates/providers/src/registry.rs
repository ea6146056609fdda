//! Builds the set of live `LlmProvider`s from configuration. Keyed by a
//! short provider id (`"local"`, `"openai"`, `"claude"`) the policy resolver
//! uses to look one up once it has decided `kind`/`provider` for a turn.

use aura_domain::config::llm::{CloudProvider, LlmConfig};
use aura_domain::error::{Error, Result};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::anthropic::AnthropicProvider;
use crate::local::LocalProvider;
use crate::traits::LlmProvider;

pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    /// Providers that failed to construct (e.g. missing API key env var),
    /// kept so the resolver can report why a kind is UNSATISFIABLE.
    init_errors: Vec<String>,
}

impl ProviderRegistry {
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        let mut init_errors = Vec::new();
        let timeout = Duration::from_millis(config.request_timeout_ms);

        if let Some(endpoint) = &config.local.endpoint {
            match LocalProvider::new(endpoint.clone(), None, timeout) {
                Ok(p) => {
                    providers.insert("local".into(), Arc::new(p));
                }
                Err(e) => init_errors.push(format!("local provider: {e}")),
            }
        } else {
            init_errors.push("local provider: no endpoint configured".into());
        }

        for cloud in &config.cloud_providers {
            let key = match cloud.provider {
                CloudProvider::Openai => "openai",
                CloudProvider::Claude => "claude",
            };
            let api_key = match env::var(&cloud.api_key_env) {
                Ok(v) if !v.is_empty() => v,
                _ => {
                    init_errors.push(format!(
                        "{key} provider: env var {} unset or empty",
                        cloud.api_key_env
                    ));
                    continue;
                }
            };
            match cloud.provider {
                CloudProvider::Claude => match AnthropicProvider::new(cloud.endpoint.clone(), api_key, timeout) {
                    Ok(p) => {
                        providers.insert(key.into(), Arc::new(p));
                    }
                    Err(e) => init_errors.push(format!("{key} provider: {e}")),
                },
                CloudProvider::Openai => {
                    match LocalProvider::with_provider_id("openai", cloud.endpoint.clone(), Some(api_key), timeout) {
                        Ok(p) => {
                            providers.insert(key.into(), Arc::new(p));
                        }
                        Err(e) => init_errors.push(format!("{key} provider: {e}")),
                    }
                }
            }
        }

        for err in &init_errors {
            tracing::warn!(error = %err, "provider init error");
        }

        Self { providers, init_errors }
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn LlmProvider>> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| Error::InvalidPolicy(format!("no provider registered for {id}")))
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn init_errors(&self) -> &[String] {
        &self.init_errors
    }
}
