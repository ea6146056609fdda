//! Turn Orchestrator (§4.5): `run_turn`, the end-to-end processing of one
//! user utterance.

use aura_domain::error::{Error, Result};
use aura_domain::message::Message;
use aura_domain::transport::{StreamEndReason, TranscriptRole};
use aura_providers::ProviderRegistry;
use aura_sessions::SessionHandle;
use aura_tools::ToolRegistry;

use crate::policy::{resolve, AvailableCredentials};
use crate::stream_filter::StreamingFilter;
use crate::tool_loop;

pub enum TurnResult {
    FinalText(String),
    Cancelled,
}

pub struct TurnContext<'a> {
    pub providers: &'a ProviderRegistry,
    pub tools: &'a ToolRegistry,
    pub llm_defaults: &'a aura_domain::config::llm::LlmConfig,
    pub available_credentials: &'a AvailableCredentials,
    pub max_tool_iterations: u32,
}

/// `run_turn(session, user_text, [image]) → final_text | CANCELLED | ERROR`.
pub fn run_turn(
    ctx: &TurnContext<'_>,
    session: &SessionHandle,
    user_text: &str,
    image: Option<(String, Option<String>)>,
) -> Result<TurnResult> {
    // 1. Fast-reject.
    if session.is_disconnected() {
        return Ok(TurnResult::Cancelled);
    }

    // 2. Append {user, user_text} to history (the raw, un-prefixed form).
    let user_message = match &image {
        Some((data, media_type)) => Message::user_with_image(user_text, data.clone(), media_type.clone()),
        None => Message::user(user_text),
    };
    session.append_history(user_message);

    // 3. Touch activity.
    session.touch();
    let generation = session.bump_generation();
    aura_domain::trace::TraceEvent::TurnStarted {
        session_id: session.session_id,
        request_generation: generation,
    }
    .emit();

    // 4. History snapshot.
    let mut snapshot: Vec<Message> = (*session.history_snapshot()).clone();

    // 5. Satellite location prefix applies to the *input*, not the stored
    // history: rewrite the trailing user message's text in the snapshot
    // used for the LLM call only.
    if let Some(location) = session.kind.location() {
        if let Some(last) = snapshot.last_mut() {
            if let Some(content) = &mut last.content {
                let prefixed = format!("[Location: {location}] {}", content.extract_all_text());
                *content = aura_domain::message::MessageContent::Text(prefixed);
            }
        }
    }

    // 6. Snapshot policy, resolve it.
    let policy_override = session.get_policy();
    let resolved = match resolve(&policy_override, ctx.llm_defaults, ctx.available_credentials) {
        Ok(r) => r,
        Err(e) => {
            aura_domain::trace::TraceEvent::PolicyRejected {
                session_id: session.session_id,
                reason: e.to_string(),
            }
            .emit();
            return Err(e);
        }
    };
    aura_domain::trace::TraceEvent::PolicyResolved {
        session_id: session.session_id,
        kind: format!("{:?}", resolved.kind),
        provider: resolved.provider.map(|p| format!("{p:?}")),
        model: resolved.model.clone(),
    }
    .emit();

    let provider = ctx.providers.get(resolved.provider_id())?;

    // 7. Command-context scope bound to this session.
    let _guard = aura_sessions::enter_command_context(session.clone());

    // 8. Reset streaming-filter state.
    session.reset_streaming_state();

    let stream_id = generation;
    let loop_outcome = {
        let mut filter = StreamingFilter::new(session, stream_id, |_delta| {});
        let result = tool_loop::run(
            provider.as_ref(),
            &resolved,
            ctx.tools,
            session.session_id,
            &snapshot,
            ctx.max_tool_iterations,
            &mut filter,
        );
        filter.finish();
        result
    };

    let loop_outcome = match loop_outcome {
        Ok(o) => o,
        Err(e) => {
            if let Some(transport) = session.transport() {
                transport.send_error("LLM_TRANSPORT_FAILURE", &e.to_string());
            }
            return Err(e);
        }
    };

    // 10. Stream completion / fallback delivery.
    let streaming_state = session.streaming_state();
    if streaming_state.llm_streaming_active {
        if let Some(transport) = session.transport() {
            transport.send_stream_end(stream_id, StreamEndReason::Complete);
        }
    } else if !streaming_state.stream_had_content {
        if let Some(transport) = session.transport() {
            transport.send_transcript(TranscriptRole::Assistant, &loop_outcome.final_text);
        }
    }

    // 11. Late cancellation / supersession check.
    if session.is_disconnected() {
        aura_domain::trace::TraceEvent::TurnCancelled {
            session_id: session.session_id,
            reason: "disconnected".into(),
        }
        .emit();
        return Ok(TurnResult::Cancelled);
    }
    if session.current_generation() != generation {
        aura_domain::trace::TraceEvent::TurnSuperseded {
            session_id: session.session_id,
            observed_generation: generation,
            current_generation: session.current_generation(),
        }
        .emit();
        return Ok(TurnResult::Cancelled);
    }

    // Tool-derived messages go in before the final assistant message,
    // maintaining the contiguous-block guarantee (§4.5 ordering).
    session.append_history_many(loop_outcome.extra_messages);

    // 12. Append {assistant, final_text}.
    session.append_history(Message::assistant(loop_outcome.final_text.clone()));

    aura_domain::trace::TraceEvent::TurnCompleted {
        session_id: session.session_id,
        request_generation: generation,
        tool_iterations: loop_outcome.tool_iterations,
    }
    .emit();

    Ok(TurnResult::FinalText(loop_outcome.final_text))
}
