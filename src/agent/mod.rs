//! Agent configuration, registry and runtime.
//!
//! An agent is a declarative bundle (name, role, model, tools, instructions,
//! storage table, flags). The registry holds the ordered list served by the
//! playground; the runner executes one message against an agent with tool
//! calling and session history.

mod definition;
mod prompt;
mod registry;
mod runner;

pub use definition::{AgentConfig, ModelRef, StorageRef};
pub use prompt::{build_instructions, build_system_message};
pub use registry::{builtin_agents, is_valid_table_name, AgentRegistry, COMMON_INSTRUCTIONS};
pub use runner::{build_messages, format_tool_calls, Agent, AgentResponse};
