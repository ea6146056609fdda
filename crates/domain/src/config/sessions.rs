use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Bounds and timeouts for the session registry and its idle sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Registry capacity. Slot 0 (LOCAL) always counts against this.
    #[serde(default = "d_max_sessions")]
    pub max_sessions: usize,

    /// Idle timeout before a non-LOCAL session is swept.
    #[serde(default = "d_session_timeout_sec")]
    pub session_timeout_sec: u64,

    /// Upper bound on concurrently active satellite worker threads.
    #[serde(default = "d_max_satellite_workers")]
    pub max_satellite_workers: usize,

    /// Per-kind default system prompts, used when a session has none set.
    #[serde(default)]
    pub default_prompts: DefaultPrompts,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            max_sessions: d_max_sessions(),
            session_timeout_sec: d_session_timeout_sec(),
            max_satellite_workers: d_max_satellite_workers(),
            default_prompts: DefaultPrompts::default(),
        }
    }
}

/// Default system prompt used for local vs. remote clients when a session
/// has no explicit system prompt of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultPrompts {
    #[serde(default = "d_local_prompt")]
    pub local: String,
    #[serde(default = "d_remote_prompt")]
    pub remote: String,
}

impl Default for DefaultPrompts {
    fn default() -> Self {
        Self {
            local: d_local_prompt(),
            remote: d_remote_prompt(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_max_sessions() -> usize {
    8
}
fn d_session_timeout_sec() -> u64 {
    1800
}
fn d_max_satellite_workers() -> usize {
    8
}
fn d_local_prompt() -> String {
    "You are the on-device voice assistant.".into()
}
fn d_remote_prompt() -> String {
    "You are a voice assistant speaking with a remote client.".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = SessionsConfig::default();
        assert_eq!(cfg.max_sessions, 8);
        assert_eq!(cfg.session_timeout_sec, 1800);
        assert_eq!(cfg.max_satellite_workers, 8);
    }
}
