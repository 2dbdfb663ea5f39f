//! Scripted provider for unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::client::LlmClient;
use super::types::{ChatRequest, ChatResponse};
use crate::error::ProviderError;

/// Key the scripted probe rejects
pub(crate) const REJECTED_KEY: &str = "sk-rejected";

/// Replays queued completions in order and records every request
pub(crate) struct ScriptedClient {
    responses: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<Result<ChatResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn probe(&self, api_key: &str) -> Result<(), ProviderError> {
        if api_key == REJECTED_KEY {
            return Err(ProviderError::Api {
                status: 401,
                message: "Incorrect API key provided".to_string(),
            });
        }
        Ok(())
    }

    async fn complete(
        &self,
        _api_key: &str,
        request: &ChatRequest,
    ) -> Result<ChatResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted client ran out of responses")
    }
}

pub(crate) fn text_reply(content: &str) -> ChatResponse {
    serde_json::from_value(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
    .unwrap()
}

/// A reply requesting `(name, raw arguments)` calls in order
pub(crate) fn tool_call_reply(calls: &[(&str, &str)]) -> ChatResponse {
    let tool_calls: Vec<_> = calls
        .iter()
        .enumerate()
        .map(|(i, (name, arguments))| {
            json!({
                "id": format!("call_{i}"),
                "type": "function",
                "function": {"name": name, "arguments": arguments}
            })
        })
        .collect();
    serde_json::from_value(json!({
        "choices": [{"message": {"role": "assistant", "content": null, "tool_calls": tool_calls}}]
    }))
    .unwrap()
}
