use serde::{Deserialize, Serialize};

/// Bounds for the Turn Orchestrator's tool iteration loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Maximum tool-call/follow-up round-trips before the apology fallback.
    #[serde(default = "d_max_tool_iterations")]
    pub max_tool_iterations: u32,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: d_max_tool_iterations(),
        }
    }
}

fn d_max_tool_iterations() -> u32 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_max_tool_iterations_is_five() {
        assert_eq!(TurnConfig::default().max_tool_iterations, 5);
    }
}
