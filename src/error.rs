//! Error taxonomy for the orchestration layer
//!
//! Errors scoped to a single tool call ([`ToolError`]) never escape the loop;
//! they are captured into that call's result entry. Everything else is turned
//! into a failure response at the router boundary.

use thiserror::Error;

use crate::llm::AgentId;

/// Failures of the orchestrator operations surfaced to callers
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No live agent with this id
    #[error("unknown agent: {0}")]
    Lookup(AgentId),

    /// The provider credential did not pass the admission probe
    #[error("provider credential rejected: {0}")]
    Capability(#[source] ProviderError),

    /// The reasoning call itself failed
    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),
}

/// Failures of a single provider round trip
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Failures scoped to one tool invocation
#[derive(Debug, Error)]
pub enum ToolError {
    /// The provider sent arguments that are not well-formed JSON
    #[error("tool arguments are not valid JSON: {0}")]
    InvalidArguments(String),

    /// Arguments parsed but do not match the tool's parameters
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    Execution(String),

    #[error("no active page to run the action in")]
    NoActiveTarget,

    #[error("content bridge failed: {0}")]
    Bridge(String),
}

/// Failures of a content bridge round trip
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no active page to run the action in")]
    NoActiveTarget,

    /// The target went away before replying
    #[error("page {0} closed before replying")]
    TargetClosed(String),

    /// The page replied with an error
    #[error("page reported: {0}")]
    Page(String),
}

impl From<BridgeError> for ToolError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::NoActiveTarget => ToolError::NoActiveTarget,
            other => ToolError::Bridge(other.to_string()),
        }
    }
}

/// Failures reading or writing the persisted blob
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store contents could not be encoded: {0}")]
    Serde(#[from] serde_json::Error),
}
