//! Storehand - agent orchestration for storefront browser automation
//!
//! Agents wrap a single-round LLM tool-call loop bound to a fixed tool
//! catalog. Tools either compute locally or run inside the active page
//! through a [`ContentBridge`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use storehand::{
//!     AgentConfig, AgentType, MemoryStore, MessageRouter, OpenAiClient, Orchestrator,
//!     PageBridge, Request, RequestKind, StateStore,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let orchestrator = Orchestrator::new(
//!         Arc::new(OpenAiClient::default()),
//!         Arc::new(PageBridge::new()),
//!         StateStore::new(Arc::new(MemoryStore::new())),
//!     );
//!     let router = MessageRouter::new(Arc::new(orchestrator));
//!
//!     let created = router
//!         .handle(Request::new(RequestKind::CreateAgent {
//!             agent_type: AgentType::ProductResearch,
//!             name: None,
//!             config: AgentConfig::with_key(std::env::var("OPENAI_API_KEY").unwrap()),
//!         }))
//!         .await;
//!
//!     let response = router
//!         .handle(Request::new(RequestKind::AgentMessage {
//!             agent_id: created.agent_id.unwrap(),
//!             action: "calculateMargin".to_string(),
//!             data: json!({"cost": 12.0, "price": 30.0}),
//!         }))
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&response).unwrap());
//! }
//! ```

mod config;
mod error;
mod host;
mod llm;
mod orchestrator;
mod prompts;
mod protocol;
mod router;
mod store;
mod tools;

// Re-export the public API
pub use config::{AgentConfig, Config, ModelDefaults, ResolvedModel};
pub use error::{BridgeError, OrchestratorError, PersistenceError, ProviderError, ToolError};
pub use host::Host;
pub use llm::types;
pub use llm::{
    Agent, AgentContext, AgentId, AgentLoop, AgentRegistry, AgentStatus, AgentSummary, AgentType,
    LlmClient, LoopOutput, OpenAiClient, ToolOutcome, ToolResult,
};
pub use orchestrator::Orchestrator;
pub use prompts::SystemPrompt;
pub use protocol::{
    ClientMessage, Message, MessageKind, Outcome, PageEvent, Request, RequestKind, Response,
    ServerMessage,
};
pub use router::MessageRouter;
pub use store::{
    FileStore, MemoryStore, PersistedAgentState, PersistedState, PersistentStore, StateStore,
};
pub use tools::{
    names as tool_names, normalize_categories, schema, BridgeRequest, CalculateMarginTool,
    ContentBridge, ExtractCatalogRowsTool, ExtractItemDataTool, FindSimilarItemsTool,
    NormalizeCategoriesTool, PageBridge, ReviewSeoTool, Tool, ToolContext, ToolRegistry,
    ValidateImportHeadersTool, REQUIRED_FIELDS,
};
