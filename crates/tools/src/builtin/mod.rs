mod get_weather;
mod switch_llm;

pub use get_weather::GetWeatherTool;
pub use switch_llm::SwitchLlmTool;
