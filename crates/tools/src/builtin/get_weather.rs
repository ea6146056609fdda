use aura_domain::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::outcome::ToolOutcome;
use crate::tool::Tool;

/// Scenario 2 stand-in: a tool with an external side effect. Production
/// wiring would call a weather provider; this implementation reports a
/// fixed reading so the turn orchestrator's tool-loop tests are
/// deterministic.
pub struct GetWeatherTool;

#[derive(Deserialize)]
struct Args {
    city: String,
}

impl Tool for GetWeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Reports the current weather for a named city."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"],
        })
    }

    fn execute(&self, arguments: &Value) -> Result<ToolOutcome> {
        let args: Args = serde_json::from_value(arguments.clone())
            .map_err(|e| Error::ToolExecutionFailure(format!("get_weather: bad arguments: {e}")))?;
        Ok(ToolOutcome::text(format!("68F and clear in {}", args.city)))
    }
}
