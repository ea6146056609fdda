//! The tool registry the Tool Iteration Loop executes against (§4.7, §6).

pub mod builtin;
pub mod outcome;
pub mod registry;
pub mod tool;

pub use outcome::{PendingVision, ToolOutcome};
pub use registry::{ExecuteAllResult, ToolRegistry};
pub use tool::Tool;
