//! Single-round tool-call loop for one inbound message

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::client::LlmClient;
use super::registry::Agent;
use super::types::{ChatMessage, ChatRequest, ToolCallRequest};
use crate::config::ModelDefaults;
use crate::error::{ProviderError, ToolError};
use crate::prompts::{user_message, SystemPrompt};
use crate::tools::{ContentBridge, ToolContext};

/// Outcome of one tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolOutcome {
    Result(Value),
    Error(String),
}

/// One entry of `toolResults`, serialized as `{tool, result}` or `{tool, error}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Error(_))
    }
}

/// What a loop run hands back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopOutput {
    /// Assistant text, if the model produced any
    pub response: Option<String>,
    pub tool_results: Vec<ToolResult>,
}

/// Drives the reasoning call and the tool invocations it requests
#[derive(Clone)]
pub struct AgentLoop {
    client: Arc<dyn LlmClient>,
    bridge: Arc<dyn ContentBridge>,
    defaults: ModelDefaults,
    prompt: SystemPrompt,
}

impl AgentLoop {
    pub fn new(
        client: Arc<dyn LlmClient>,
        bridge: Arc<dyn ContentBridge>,
        defaults: ModelDefaults,
        prompt: SystemPrompt,
    ) -> Self {
        Self {
            client,
            bridge,
            defaults,
            prompt,
        }
    }

    /// Build the completion request for one message
    pub fn request(&self, agent: &Agent, action: &str, data: &Value) -> ChatRequest {
        let resolved = agent.config.resolve(&self.defaults);
        ChatRequest {
            model: resolved.model,
            messages: vec![
                ChatMessage::system(self.prompt.build(agent)),
                ChatMessage::user(user_message(action, data)),
            ],
            tools: agent.tools.definitions(),
            tool_choice: Some("auto".to_string()),
            temperature: resolved.temperature,
            max_tokens: resolved.max_tokens,
        }
    }

    /// Issue exactly one completion and run every requested tool in order.
    ///
    /// Per-call failures are recorded in the output; only a failed provider
    /// round trip is an error.
    pub async fn run(
        &self,
        agent: &Agent,
        action: &str,
        data: &Value,
    ) -> Result<LoopOutput, ProviderError> {
        let request = self.request(agent, action, data);
        debug!(
            "Agent {}: completion with {} tools (model {})",
            agent.id,
            request.tools.len(),
            request.model
        );

        let response = self
            .client
            .complete(&agent.config.provider_key, &request)
            .await?;
        if let Some(usage) = response.usage {
            debug!(
                "Agent {}: {} prompt / {} completion tokens",
                agent.id, usage.prompt_tokens, usage.completion_tokens
            );
        }
        let message = response
            .first_message()
            .ok_or_else(|| ProviderError::MalformedResponse("response has no choices".into()))?;

        let ctx = ToolContext::new(self.bridge.clone(), agent.context.clone());
        let mut tool_results = Vec::with_capacity(message.tool_calls().len());
        for call in message.tool_calls() {
            let outcome = match self.invoke(agent, call, &ctx).await {
                Ok(value) => ToolOutcome::Result(value),
                Err(e) => {
                    debug!("Agent {}: tool {} failed: {}", agent.id, call.function.name, e);
                    ToolOutcome::Error(e.to_string())
                }
            };
            tool_results.push(ToolResult {
                tool: call.function.name.clone(),
                outcome,
            });
        }

        info!(
            "Agent {}: handled {} with {} tool calls",
            agent.id,
            action,
            tool_results.len()
        );
        Ok(LoopOutput {
            response: message.content.clone(),
            tool_results,
        })
    }

    async fn invoke(
        &self,
        agent: &Agent,
        call: &ToolCallRequest,
        ctx: &ToolContext,
    ) -> Result<Value, ToolError> {
        let tool = agent
            .tools
            .get(&call.function.name)
            .ok_or_else(|| ToolError::UnknownTool(call.function.name.clone()))?;
        let params = parse_arguments(&call.function.arguments)?;
        debug!("Agent {}: invoking {} ({})", agent.id, tool.name(), call.id);
        tool.invoke(params, ctx).await
    }
}

/// Parse a raw argument string; blank counts as no arguments
fn parse_arguments(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
