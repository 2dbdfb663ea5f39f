//! Entry point for inbound requests
//!
//! Every request gets exactly one [`Response`] carrying its correlation id.
//! Errors and handler panics are converted into failure responses here and
//! never escape.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::OrchestratorError;
use crate::llm::AgentId;
use crate::orchestrator::Orchestrator;
use crate::protocol::{new_correlation_id, Message, Request, RequestKind, Response};

#[derive(Clone)]
pub struct MessageRouter {
    orchestrator: Arc<Orchestrator>,
}

impl MessageRouter {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Accept a request and answer it asynchronously on `responses`.
    ///
    /// Returns the correlation id to acknowledge with, generated here when
    /// the request carries none.
    pub fn dispatch(&self, request: Request, responses: mpsc::UnboundedSender<Response>) -> String {
        let correlation_id = request
            .correlation_id
            .clone()
            .unwrap_or_else(new_correlation_id);
        let agent_id = request.kind.agent_id().map(str::to_string);

        let router = self.clone();
        let id = correlation_id.clone();
        tokio::spawn(async move {
            // The handler runs in its own task so a panic still yields a response
            let handler = {
                let id = id.clone();
                tokio::spawn(async move { router.respond(id, request.kind).await })
            };
            let response = match handler.await {
                Ok(response) => response,
                Err(e) => {
                    error!("Handler for {} did not complete: {}", id, e);
                    Response::failure(id, agent_id, "request handler failed unexpectedly")
                }
            };
            if responses.send(response).is_err() {
                debug!("Response channel closed before reply was delivered");
            }
        });

        correlation_id
    }

    /// Handle a request to completion
    pub async fn handle(&self, request: Request) -> Response {
        let correlation_id = request
            .correlation_id
            .unwrap_or_else(new_correlation_id);
        self.respond(correlation_id, request.kind).await
    }

    async fn respond(&self, correlation_id: String, kind: RequestKind) -> Response {
        let agent_id = kind.agent_id().map(str::to_string);
        match self.route(&correlation_id, kind).await {
            Ok((agent_id, data)) => Response::ok(correlation_id, agent_id, data),
            Err(e) => {
                debug!("Request {} failed: {}", correlation_id, e);
                Response::failure(correlation_id, agent_id, e.to_string())
            }
        }
    }

    async fn route(
        &self,
        correlation_id: &str,
        kind: RequestKind,
    ) -> Result<(Option<AgentId>, Value), RouteError> {
        let orchestrator = &self.orchestrator;
        match kind {
            RequestKind::AgentMessage {
                agent_id,
                action,
                data,
            } => {
                let message = Message::request(agent_id, action, data, correlation_id);
                debug!(
                    "Message {} for {} ({})",
                    message.id, message.agent_id, message.action
                );
                let output = orchestrator
                    .process(&message.agent_id, &message.action, &message.data)
                    .await?;
                Ok((Some(message.agent_id), to_data(&output)?))
            }
            RequestKind::CreateAgent {
                agent_type,
                name,
                config,
            } => {
                let summary = orchestrator.create(agent_type, config, name).await?;
                Ok((Some(summary.id.clone()), to_data(&summary)?))
            }
            RequestKind::StartAgent { agent_id, context } => {
                let summary = orchestrator.start(&agent_id, context).await?;
                Ok((Some(agent_id), to_data(&summary)?))
            }
            RequestKind::StopAgent { agent_id } => {
                let summary = orchestrator.stop(&agent_id).await?;
                Ok((Some(agent_id), to_data(&summary)?))
            }
            RequestKind::GetStatus { agent_id } => {
                let summary = orchestrator.status(&agent_id).await?;
                Ok((Some(agent_id), to_data(&summary)?))
            }
            RequestKind::ListAgents => {
                let agents = orchestrator.list().await;
                Ok((None, json!({ "agents": to_data(&agents)? })))
            }
            RequestKind::DeleteAgent { agent_id } => {
                let summary = orchestrator.delete(&agent_id).await?;
                Ok((Some(agent_id), to_data(&summary)?))
            }
        }
    }
}

/// Failures while routing one request
#[derive(Debug, thiserror::Error)]
enum RouteError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

fn to_data<T: Serialize>(value: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AgentConfig, ModelDefaults};
    use crate::error::ProviderError;
    use crate::llm::testing::{tool_call_reply, ScriptedClient};
    use crate::llm::types::ChatResponse;
    use crate::llm::AgentType;
    use crate::prompts::SystemPrompt;
    use crate::store::{MemoryStore, StateStore};
    use crate::tools::testing::StaticBridge;
    use pretty_assertions::assert_eq;

    fn router(responses: Vec<Result<ChatResponse, ProviderError>>) -> MessageRouter {
        let orchestrator = Orchestrator::with_settings(
            Arc::new(ScriptedClient::new(responses)),
            Arc::new(StaticBridge::replying(json!({"title": "Mug"}))),
            StateStore::new(Arc::new(MemoryStore::new())),
            ModelDefaults::default(),
            SystemPrompt::bare(),
        );
        MessageRouter::new(Arc::new(orchestrator))
    }

    async fn create(router: &MessageRouter) -> AgentId {
        let response = router
            .handle(Request::new(RequestKind::CreateAgent {
                agent_type: AgentType::ProductResearch,
                name: None,
                config: AgentConfig::with_key("sk-good"),
            }))
            .await;
        assert!(response.success, "{:?}", response.error());
        response.agent_id.unwrap()
    }

    fn message(agent_id: &str) -> RequestKind {
        RequestKind::AgentMessage {
            agent_id: agent_id.to_string(),
            action: "extractItemData".to_string(),
            data: json!({}),
        }
    }

    #[tokio::test]
    async fn test_correlation_id_is_echoed() {
        let router = router(vec![Ok(tool_call_reply(&[("extractItemData", "{}")]))]);
        let agent_id = create(&router).await;

        let response = router
            .handle(Request::new(message(&agent_id)).with_correlation_id("c-42"))
            .await;

        assert!(response.success);
        assert_eq!(response.correlation_id, "c-42");
        assert_eq!(response.agent_id.as_deref(), Some(agent_id.as_str()));
        assert_eq!(response.data().unwrap()["toolResults"][0]["tool"], "extractItemData");
    }

    #[tokio::test]
    async fn test_missing_correlation_id_is_generated() {
        let router = router(vec![]);
        let response = router.handle(Request::new(RequestKind::ListAgents)).await;
        assert!(response.success);
        assert!(!response.correlation_id.is_empty());
        assert_eq!(response.data().unwrap()["agents"], json!([]));
    }

    #[tokio::test]
    async fn test_unknown_agent_is_failure_response() {
        let router = router(vec![]);
        let response = router
            .handle(Request::new(message("agent_missing")).with_correlation_id("c-1"))
            .await;

        assert!(!response.success);
        assert_eq!(response.correlation_id, "c-1");
        assert_eq!(response.error(), Some("unknown agent: agent_missing"));
        assert_eq!(response.agent_id.as_deref(), Some("agent_missing"));
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_correlation() {
        let router = router(vec![Err(ProviderError::MalformedResponse("no choices".into()))]);
        let agent_id = create(&router).await;

        let response = router
            .handle(Request::new(message(&agent_id)).with_correlation_id("c-7"))
            .await;
        assert!(!response.success);
        assert_eq!(response.correlation_id, "c-7");

        let status = router
            .handle(Request::new(RequestKind::GetStatus { agent_id }))
            .await;
        assert_eq!(status.data().unwrap()["status"], "error");
    }

    #[tokio::test]
    async fn test_dispatch_acks_then_responds_once() {
        let router = router(vec![]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let ack = router.dispatch(Request::new(RequestKind::ListAgents), tx.clone());
        let explicit = router.dispatch(
            Request::new(message("agent_missing")).with_correlation_id("c-9"),
            tx,
        );
        assert_eq!(explicit, "c-9");

        let mut seen = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        // Senders are gone once both handlers finish
        assert!(rx.recv().await.is_none());
        seen.sort_by_key(|r| r.success);
        assert_eq!(seen[0].correlation_id, "c-9");
        assert!(!seen[0].success);
        assert_eq!(seen[1].correlation_id, ack);
    }

    #[tokio::test]
    async fn test_create_responds_with_admitted_summary() {
        let router = router(vec![]);
        let response = router
            .handle(
                Request::new(RequestKind::CreateAgent {
                    agent_type: AgentType::CatalogManager,
                    name: Some("Cataloger".to_string()),
                    config: AgentConfig::with_key("sk-good"),
                })
                .with_correlation_id("c-3"),
            )
            .await;

        assert!(response.success);
        let data = response.data().unwrap();
        assert_eq!(data["id"], json!(response.agent_id.clone().unwrap()));
        assert_eq!(data["name"], "Cataloger");
        assert_eq!(data["status"], "idle");
    }

    #[tokio::test]
    async fn test_panicking_handler_yields_one_failure() {
        // No queued completion, so the scripted client panics mid-request
        let router = router(vec![]);
        let agent_id = create(&router).await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let id = router.dispatch(
            Request::new(message(&agent_id)).with_correlation_id("c-panic"),
            tx,
        );
        assert_eq!(id, "c-panic");

        let response = rx.recv().await.unwrap();
        assert!(!response.success);
        assert_eq!(response.correlation_id, "c-panic");
        assert_eq!(response.error(), Some("request handler failed unexpectedly"));
        assert_eq!(response.agent_id.as_deref(), Some(agent_id.as_str()));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_lifecycle_requests() {
        let router = router(vec![]);
        let agent_id = create(&router).await;

        let started = router
            .handle(Request::new(RequestKind::StartAgent {
                agent_id: agent_id.clone(),
                context: None,
            }))
            .await;
        assert_eq!(started.data().unwrap()["status"], "running");

        let stopped = router
            .handle(Request::new(RequestKind::StopAgent {
                agent_id: agent_id.clone(),
            }))
            .await;
        assert_eq!(stopped.data().unwrap()["status"], "stopped");

        let deleted = router
            .handle(Request::new(RequestKind::DeleteAgent {
                agent_id: agent_id.clone(),
            }))
            .await;
        assert!(deleted.success);

        let gone = router
            .handle(Request::new(RequestKind::GetStatus { agent_id }))
            .await;
        assert!(!gone.success);
    }
}
