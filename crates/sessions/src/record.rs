//! Per-client session state and the locks that guard it.
//!
//! Lock order (authoritative): registry lock < any per-session lock;
//! `ref_mutex` < `fd_mutex` < {`policy_mutex`, `history_mutex`}.
//! `policy_mutex` and `history_mutex` are never held simultaneously. No
//! per-session lock is ever held across an LLM call, a tool call, or I/O —
//! copy under lock, release, then work.

use aura_domain::message::Message;
use aura_domain::policy::PolicyOverride;
use aura_domain::transport::Transport;
use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::kind::SessionKind;

/// Turn-local streaming-filter state (§4.6). Touched only by the one worker
/// thread executing the session's current turn — sessions are serialized by
/// convention at the transport layer — so this is not part of the four-lock
/// ordering discipline; it still lives behind a mutex for `Sync`, not for
/// contention.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamingState {
    pub in_command_tag: bool,
    pub stream_had_content: bool,
    pub llm_streaming_active: bool,
}

pub struct SessionRecord {
    pub session_id: u64,
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
    last_activity: Mutex<DateTime<Utc>>,

    /// Guards transport handle during reconnect swap. Absent for LOCAL.
    fd_mutex: Mutex<Option<Arc<dyn Transport>>>,
    /// Guards `ref_count`; the paired condvar signals "count reached zero".
    ref_mutex: Mutex<u32>,
    ref_zero: Condvar,
    /// Guards `llm_policy_override`.
    policy_mutex: Mutex<PolicyOverride>,
    /// Guards `conversation_history`.
    history_mutex: Mutex<Vec<Message>>,

    pub disconnected: AtomicBool,
    pub request_generation: AtomicU64,

    streaming: Mutex<StreamingState>,
}

impl SessionRecord {
    pub fn new(session_id: u64, kind: SessionKind, transport: Option<Arc<dyn Transport>>, now: DateTime<Utc>) -> Self {
        Self {
            session_id,
            kind,
            created_at: now,
            last_activity: Mutex::new(now),
            fd_mutex: Mutex::new(transport),
            ref_mutex: Mutex::new(1),
            ref_zero: Condvar::new(),
            policy_mutex: Mutex::new(PolicyOverride::default()),
            history_mutex: Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
            request_generation: AtomicU64::new(0),
            streaming: Mutex::new(StreamingState::default()),
        }
    }

    // ── transport (fd_mutex) ────────────────────────────────────────

    pub fn rebind_transport(&self, transport: Arc<dyn Transport>) {
        *self.fd_mutex.lock() = Some(transport);
    }

    pub fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.fd_mutex.lock().clone()
    }

    // ── refcount (ref_mutex + condvar) ───────────────────────────────

    pub fn retain(&self) {
        let mut count = self.ref_mutex.lock();
        *count += 1;
    }

    /// Returns the refcount observed immediately after decrement.
    pub fn release(&self) -> u32 {
        let mut count = self.ref_mutex.lock();
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            self.ref_zero.notify_all();
        }
        remaining
    }

    pub fn ref_count(&self) -> u32 {
        *self.ref_mutex.lock()
    }

    /// Blocks the calling thread until `ref_count == 0` (phase 2 drain).
    pub fn wait_until_drained(&self) {
        let mut count = self.ref_mutex.lock();
        while *count != 0 {
            self.ref_zero.wait(&mut count);
        }
    }

    // ── activity timestamp ───────────────────────────────────────────

    pub fn touch(&self) {
        *self.last_activity.lock() = Utc::now();
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock()
    }

    // ── policy (policy_mutex) ────────────────────────────────────────

    pub fn get_policy(&self) -> PolicyOverride {
        self.policy_mutex.lock().clone()
    }

    pub fn set_policy(&self, policy: PolicyOverride) {
        *self.policy_mutex.lock() = policy;
    }

    pub fn reset_policy(&self) {
        *self.policy_mutex.lock() = PolicyOverride::default();
    }

    // ── history (history_mutex) ──────────────────────────────────────

    pub fn append_history(&self, message: Message) {
        self.history_mutex.lock().push(message);
    }

    pub fn append_history_many(&self, messages: impl IntoIterator<Item = Message>) {
        self.history_mutex.lock().extend(messages);
    }

    /// A snapshot whose contents are logically immutable to the caller even
    /// as later appends occur — we clone the backing vec and hand out an
    /// `Arc` over the copy rather than sharing the live store.
    pub fn history_snapshot(&self) -> Arc<Vec<Message>> {
        Arc::new(self.history_mutex.lock().clone())
    }

    pub fn clear_history(&self) {
        self.history_mutex.lock().clear();
    }

    pub fn init_with_system_prompt(&self, prompt: impl Into<String>) {
        let mut history = self.history_mutex.lock();
        history.clear();
        history.push(Message::system(prompt));
    }

    pub fn get_system_prompt(&self) -> Option<String> {
        let history = self.history_mutex.lock();
        history.first().and_then(|m| {
            m.content.as_ref().map(|c| c.extract_all_text())
        })
    }

    pub fn history_len(&self) -> usize {
        self.history_mutex.lock().len()
    }

    // ── streaming state (turn-exclusive) ─────────────────────────────

    pub fn reset_streaming_state(&self) {
        *self.streaming.lock() = StreamingState::default();
    }

    pub fn streaming_state(&self) -> StreamingState {
        *self.streaming.lock()
    }

    pub fn with_streaming_state_mut<R>(&self, f: impl FnOnce(&mut StreamingState) -> R) -> R {
        f(&mut self.streaming.lock())
    }

    // ── generation / cancellation ────────────────────────────────────

    pub fn bump_generation(&self) -> u64 {
        self.request_generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_generation(&self) -> u64 {
        self.request_generation.load(Ordering::SeqCst)
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    pub fn mark_disconnected(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

pub type SessionHandle = Arc<SessionRecord>;

#[cfg(test)]
mod tests {
    use super::*;
    use aura_domain::message::Role;

    fn new_record() -> SessionRecord {
        SessionRecord::new(1, SessionKind::Web, None, Utc::now())
    }

    #[test]
    fn retain_release_tracks_refcount() {
        let record = new_record();
        assert_eq!(record.ref_count(), 1);
        record.retain();
        assert_eq!(record.ref_count(), 2);
        assert_eq!(record.release(), 1);
        assert_eq!(record.release(), 0);
    }

    #[test]
    fn init_with_system_prompt_round_trips() {
        let record = new_record();
        record.init_with_system_prompt("be terse");
        assert_eq!(record.get_system_prompt().as_deref(), Some("be terse"));
    }

    #[test]
    fn set_policy_get_policy_round_trips() {
        let record = new_record();
        let policy = PolicyOverride::Explicit(Default::default());
        record.set_policy(policy.clone());
        matches!(record.get_policy(), PolicyOverride::Explicit(_));
    }

    #[test]
    fn history_snapshot_is_independent_of_later_appends() {
        let record = new_record();
        record.append_history(Message::user("hi"));
        let snapshot = record.history_snapshot();
        record.append_history(Message::assistant("hello"));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(record.history_len(), 2);
        assert_eq!(snapshot[0].role, Role::User);
    }

    #[test]
    fn bump_generation_is_monotonic() {
        let record = new_record();
        assert_eq!(record.current_generation(), 0);
        assert_eq!(record.bump_generation(), 1);
        assert_eq!(record.bump_generation(), 2);
    }

    #[test]
    fn two_consecutive_touches_are_indistinguishable() {
        let record = new_record();
        record.touch();
        let first = record.last_activity();
        record.touch();
        let second = record.last_activity();
        assert!(second >= first);
    }
}
