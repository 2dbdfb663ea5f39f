//! LLM client and agent loop

mod agent;
mod client;
mod registry;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

pub use agent::{AgentLoop, LoopOutput, ToolOutcome, ToolResult};
pub use client::{LlmClient, OpenAiClient};
pub use registry::{
    Agent, AgentContext, AgentId, AgentRegistry, AgentStatus, AgentSummary, AgentType,
};
