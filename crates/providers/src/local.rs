//! OpenAI-compatible `/v1/chat/completions` adapter. Used both for the
//! on-device/self-hosted backend (no auth) and for the OpenAI cloud provider
//! (bearer auth) — both speak the same wire format.

use aura_domain::error::{Error, Result};
use reqwest::blocking::Client;
use std::time::{Duration, Instant};

use crate::openai_wire::{self, WireRequest};
use crate::sse::read_sse_blocking;
use crate::traits::{ChatOutcome, ChatRequest, ChunkSink, LlmProvider};

pub struct LocalProvider {
    provider_id: &'static str,
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl LocalProvider {
    /// `api_key = None` for an unauthenticated local backend.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Self::with_provider_id("local", endpoint, api_key, timeout)
    }

    pub fn with_provider_id(
        provider_id: &'static str,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Other(format!("building {provider_id} client: {e}")))?;
        Ok(Self {
            provider_id,
            endpoint: endpoint.into(),
            api_key,
            client,
        })
    }
}

impl LlmProvider for LocalProvider {
    fn provider_id(&self) -> &str {
        self.provider_id
    }

    fn chat_stream(&self, req: &ChatRequest<'_>, sink: &mut dyn ChunkSink) -> Result<ChatOutcome> {
        let started = Instant::now();
        let body = WireRequest {
            model: req.model,
            messages: openai_wire::to_wire_messages(req.messages),
            tools: openai_wire::to_wire_tools(req.tools),
            stream: true,
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };

        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));
        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .map_err(|e| Error::LlmTransportFailure(format!("{} endpoint {url}: {e}", self.provider_id)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::LlmTransportFailure(format!(
                "{} endpoint returned {status}: {body}",
                self.provider_id
            )));
        }

        let mut text = String::new();
        let mut tool_call_accs = Vec::new();
        let mut usage = None;
        let mut finish_reason = None;

        read_sse_blocking(response, |data| {
            openai_wire::consume_data_line(
                data,
                sink,
                &mut text,
                &mut tool_call_accs,
                &mut usage,
                &mut finish_reason,
            );
        })
        .map_err(|e| Error::LlmTransportFailure(format!("reading {} stream: {e}", self.provider_id)))?;

        let outcome = openai_wire::finalize_outcome(text, tool_call_accs, usage, finish_reason);

        aura_domain::trace::TraceEvent::LlmRequest {
            session_id: req.session_id,
            provider: self.provider_id.to_string(),
            model: req.model.to_string(),
            streaming: true,
            duration_ms: started.elapsed().as_millis() as u64,
            prompt_tokens: outcome.usage.map(|u| u.prompt_tokens),
            completion_tokens: outcome.usage.map(|u| u.completion_tokens),
        }
        .emit();

        Ok(outcome)
    }
}
