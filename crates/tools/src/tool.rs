use aura_domain::error::Result;
use aura_domain::message::ToolDefinition;
use serde_json::Value;

use crate::outcome::ToolOutcome;

/// One callable tool. Implementations run on the calling worker thread with
/// the command context bound to the acting session (§4.4); they may read
/// `aura_sessions::command_context::current()` to find it.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    fn execute(&self, arguments: &Value) -> Result<ToolOutcome>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}
