/// Shared error type used across all aura crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    /// Registry is at `max_sessions` capacity; creation rejected.
    #[error("session registry full")]
    RegistryFull,

    /// Lookup found no matching session.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// Session exists but is marked `disconnected`.
    #[error("session disconnected: {0}")]
    DisconnectedSession(String),

    /// A policy override could not be satisfied (e.g. no API key configured).
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// The LLM HTTP transport failed (non-200, timeout, connection error).
    #[error("LLM transport failure: {0}")]
    LlmTransportFailure(String),

    /// A tool invocation failed; recorded as a tool-role message, loop continues.
    #[error("tool execution failure: {0}")]
    ToolExecutionFailure(String),

    /// The tool iteration loop reached `max_tool_iterations` without resolving.
    #[error("tool iteration limit exceeded")]
    ToolIterationExceeded,

    /// The turn was cancelled: session disconnected, or superseded by a newer turn.
    #[error("turn cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
