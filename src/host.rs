//! Newline-delimited JSON host
//!
//! Reads [`ClientMessage`]s from the input, writes [`ServerMessage`]s to the
//! output. Each request is acknowledged before its response is written. Page
//! targets attached through page events are served by forwarding
//! [`BridgeRequest`](crate::tools::BridgeRequest)s out and matching the
//! `bridge-response` replies back by request id.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, error, info, warn};

use crate::protocol::{new_correlation_id, ClientMessage, PageEvent, Response, ServerMessage};
use crate::router::MessageRouter;
use crate::tools::PageBridge;

type Responder = oneshot::Sender<Result<Value, String>>;

/// Bridge requests awaiting a `bridge-response`
#[derive(Default)]
struct Pending {
    /// Attachment generation per live page. A forwarder whose generation is
    /// gone drops its queued requests unanswered.
    attached: HashMap<String, u64>,
    next_generation: u64,
    requests: HashMap<String, (String, Responder)>,
}

impl Pending {
    fn attach(&mut self, target_id: &str) -> u64 {
        self.next_generation += 1;
        self.attached
            .insert(target_id.to_string(), self.next_generation);
        self.next_generation
    }

    fn is_attached(&self, target_id: &str, generation: u64) -> bool {
        self.attached.get(target_id) == Some(&generation)
    }

    /// Forget a page and fail the calls waiting on it
    fn detach(&mut self, target_id: &str) {
        self.attached.remove(target_id);
        self.requests.retain(|_, (target, _)| target != target_id);
    }
}

#[derive(Clone)]
pub struct Host {
    router: MessageRouter,
    bridge: Arc<PageBridge>,
    pending: Arc<Mutex<Pending>>,
}

impl Host {
    pub fn new(router: MessageRouter, bridge: Arc<PageBridge>) -> Self {
        Self {
            router,
            bridge,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Serve until the input closes and every accepted request is answered
    pub async fn run<R, W>(&self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out_tx, out_rx) = mpsc::unbounded_channel::<ServerMessage>();
        let writer_handle = tokio::spawn(write_lines(writer, out_rx));

        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<Response>();
        let forward_tx = out_tx.clone();
        let responses_handle = tokio::spawn(async move {
            while let Some(response) = response_rx.recv().await {
                if forward_tx.send(ServerMessage::Response(response)).is_err() {
                    break;
                }
            }
        });

        let mut lines = LinesStream::new(BufReader::new(reader).lines());
        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            self.handle_line(&line, &out_tx, &response_tx).await;
        }
        info!("Input closed");

        // No bridge reply can arrive any more
        self.close_pages().await;

        drop(response_tx);
        if let Err(e) = responses_handle.await {
            error!("Response forwarder failed: {}", e);
        }
        drop(out_tx);
        writer_handle
            .await
            .context("Writer task failed")?
            .context("Failed to write output")?;
        Ok(())
    }

    async fn handle_line(
        &self,
        line: &str,
        out_tx: &mpsc::UnboundedSender<ServerMessage>,
        response_tx: &mpsc::UnboundedSender<Response>,
    ) {
        let parsed = serde_json::from_str::<Value>(line).map_err(|e| (None, e)).and_then(|value| {
            let correlation_id = value
                .get("correlationId")
                .and_then(Value::as_str)
                .map(str::to_string);
            ClientMessage::from_value(value).map_err(|e| (correlation_id, e))
        });

        match parsed {
            Ok(ClientMessage::Request(mut request)) => {
                let correlation_id = request
                    .correlation_id
                    .get_or_insert_with(new_correlation_id)
                    .clone();
                let _ = out_tx.send(ServerMessage::Ack { correlation_id });
                self.router.dispatch(request, response_tx.clone());
            }
            Ok(ClientMessage::Page(event)) => self.handle_page_event(event, out_tx).await,
            Err((correlation_id, e)) => {
                warn!("Rejected inbound message: {}", e);
                let correlation_id = correlation_id.unwrap_or_else(new_correlation_id);
                let _ = out_tx.send(ServerMessage::Ack {
                    correlation_id: correlation_id.clone(),
                });
                let _ = response_tx.send(Response::failure(
                    correlation_id,
                    None,
                    format!("invalid message: {e}"),
                ));
            }
        }
    }

    async fn handle_page_event(&self, event: PageEvent, out_tx: &mpsc::UnboundedSender<ServerMessage>) {
        match event {
            PageEvent::PageAttached { target_id, url } => {
                let generation = self.pending.lock().await.attach(&target_id);
                let requests = self.bridge.attach(target_id.clone(), url).await;
                tokio::spawn(forward_bridge_requests(
                    target_id,
                    generation,
                    requests,
                    self.pending.clone(),
                    out_tx.clone(),
                ));
            }
            PageEvent::PageActivated { target_id } => {
                if !self.bridge.activate(&target_id).await {
                    warn!("Cannot activate unknown page {}", target_id);
                }
            }
            PageEvent::PageDetached { target_id } => {
                self.bridge.detach(&target_id).await;
                // Dropping the responders fails the waiting tool calls
                self.pending.lock().await.detach(&target_id);
            }
            PageEvent::BridgeResponse {
                request_id,
                data,
                error,
            } => {
                let entry = self.pending.lock().await.requests.remove(&request_id);
                let Some((_, responder)) = entry else {
                    warn!("Bridge response for unknown request {}", request_id);
                    return;
                };
                let reply = match error {
                    Some(error) => Err(error),
                    None => Ok(data.unwrap_or(Value::Null)),
                };
                if responder.send(reply).is_err() {
                    debug!("Bridge request {} was abandoned", request_id);
                }
            }
        }
    }

    async fn close_pages(&self) {
        {
            let mut pending = self.pending.lock().await;
            pending.attached.clear();
            pending.requests.clear();
        }
        self.bridge.detach_all().await;
    }
}

async fn forward_bridge_requests(
    target_id: String,
    generation: u64,
    mut requests: mpsc::UnboundedReceiver<crate::tools::BridgeRequest>,
    pending: Arc<Mutex<Pending>>,
    out_tx: mpsc::UnboundedSender<ServerMessage>,
) {
    while let Some(request) = requests.recv().await {
        let request_id = uuid::Uuid::new_v4().to_string();
        {
            let mut pending = pending.lock().await;
            if !pending.is_attached(&target_id, generation) {
                debug!("Dropping request for detached page {}", target_id);
                continue;
            }
            pending
                .requests
                .insert(request_id.clone(), (target_id.clone(), request.responder));
        }

        let message = ServerMessage::BridgeRequest {
            request_id,
            target_id: target_id.clone(),
            action: request.action,
            data: request.data,
        };
        if out_tx.send(message).is_err() {
            break;
        }
    }
    debug!("Page {} forwarder finished", target_id);
}

async fn write_lines<W>(mut writer: W, mut messages: mpsc::UnboundedReceiver<ServerMessage>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = messages.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize message: {}", e);
                continue;
            }
        };
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelDefaults;
    use crate::error::ProviderError;
    use crate::llm::testing::{tool_call_reply, ScriptedClient};
    use crate::llm::types::ChatResponse;
    use crate::orchestrator::Orchestrator;
    use crate::prompts::SystemPrompt;
    use crate::store::{MemoryStore, StateStore};
    use serde_json::json;
    use tokio::io::{duplex, AsyncBufReadExt, DuplexStream, Lines};

    fn host(responses: Vec<Result<ChatResponse, ProviderError>>) -> Host {
        let bridge = Arc::new(PageBridge::new());
        let orchestrator = Orchestrator::with_settings(
            Arc::new(ScriptedClient::new(responses)),
            bridge.clone(),
            StateStore::new(Arc::new(MemoryStore::new())),
            ModelDefaults::default(),
            SystemPrompt::bare(),
        );
        Host::new(MessageRouter::new(Arc::new(orchestrator)), bridge)
    }

    struct Session {
        input: DuplexStream,
        output: Lines<BufReader<DuplexStream>>,
        handle: tokio::task::JoinHandle<Result<()>>,
    }

    impl Session {
        fn start(host: Host) -> Self {
            let (input, host_input) = duplex(64 * 1024);
            let (host_output, output) = duplex(64 * 1024);
            let handle = tokio::spawn(async move { host.run(host_input, host_output).await });
            Self {
                input,
                output: BufReader::new(output).lines(),
                handle,
            }
        }

        async fn send(&mut self, value: Value) {
            self.send_raw(&value.to_string()).await;
        }

        async fn send_raw(&mut self, line: &str) {
            self.input.write_all(line.as_bytes()).await.unwrap();
            self.input.write_all(b"\n").await.unwrap();
        }

        async fn recv(&mut self) -> Value {
            let line = self.output.next_line().await.unwrap().expect("host closed output");
            serde_json::from_str(&line).unwrap()
        }

        async fn finish(mut self) -> Vec<Value> {
            drop(self.input);
            let mut rest = Vec::new();
            while let Some(line) = self.output.next_line().await.unwrap() {
                rest.push(serde_json::from_str(&line).unwrap());
            }
            self.handle.await.unwrap().unwrap();
            rest
        }
    }

    #[tokio::test]
    async fn test_ack_precedes_response() {
        let mut session = Session::start(host(vec![]));
        session
            .send(json!({"type": "list-agents", "correlationId": "c-1"}))
            .await;

        assert_eq!(session.recv().await, json!({"type": "ack", "correlationId": "c-1"}));
        let response = session.recv().await;
        assert_eq!(response["type"], "response");
        assert_eq!(response["correlationId"], "c-1");
        assert_eq!(response["data"]["agents"], json!([]));
        assert!(session.finish().await.is_empty());
    }

    #[tokio::test]
    async fn test_generated_correlation_id_matches_ack() {
        let mut session = Session::start(host(vec![]));
        session.send(json!({"type": "list-agents"})).await;

        let ack = session.recv().await;
        let response = session.recv().await;
        assert_eq!(ack["correlationId"], response["correlationId"]);
        session.finish().await;
    }

    #[tokio::test]
    async fn test_malformed_lines_are_answered() {
        let mut session = Session::start(host(vec![]));

        session
            .send(json!({"type": "agent-message", "correlationId": "c-bad"}))
            .await;
        assert_eq!(session.recv().await["correlationId"], "c-bad");
        let response = session.recv().await;
        assert_eq!(response["success"], false);
        assert_eq!(response["correlationId"], "c-bad");
        assert!(response["error"].as_str().unwrap().starts_with("invalid message"));

        session.send_raw("{ not json").await;
        let ack = session.recv().await;
        let response = session.recv().await;
        assert_eq!(response["success"], false);
        assert_eq!(ack["correlationId"], response["correlationId"]);
        session.finish().await;
    }

    #[tokio::test]
    async fn test_bridge_round_trip_through_page() {
        let mut session = Session::start(host(vec![Ok(tool_call_reply(&[(
            "extractItemData",
            r#"{"includeImages": false}"#,
        )]))]));

        session
            .send(json!({
                "type": "create-agent",
                "agentType": "product-research",
                "config": {"providerKey": "sk-good"},
                "correlationId": "c-create"
            }))
            .await;
        session.recv().await;
        let created = session.recv().await;
        let agent_id = created["agentId"].as_str().unwrap().to_string();

        session
            .send(json!({"type": "page-attached", "targetId": "tab-1", "url": "https://shop.test/p/1"}))
            .await;
        session
            .send(json!({
                "type": "agent-message",
                "agentId": agent_id,
                "action": "extractItemData",
                "data": {},
                "correlationId": "c-msg"
            }))
            .await;

        assert_eq!(session.recv().await["type"], "ack");
        let bridge_request = session.recv().await;
        assert_eq!(bridge_request["type"], "bridge-request");
        assert_eq!(bridge_request["targetId"], "tab-1");
        assert_eq!(bridge_request["action"], "extractItemData");

        session
            .send(json!({
                "type": "bridge-response",
                "requestId": bridge_request["requestId"],
                "data": {"title": "Brass Lamp", "price": 42}
            }))
            .await;

        let response = session.recv().await;
        assert_eq!(response["correlationId"], "c-msg");
        assert_eq!(response["success"], true);
        assert_eq!(
            response["data"]["toolResults"][0],
            json!({"tool": "extractItemData", "result": {"title": "Brass Lamp", "price": 42}})
        );
        session.finish().await;
    }

    #[tokio::test]
    async fn test_detached_page_fails_pending_call() {
        let mut session = Session::start(host(vec![Ok(tool_call_reply(&[(
            "extractItemData",
            "{}",
        )]))]));

        session
            .send(json!({
                "type": "create-agent",
                "agentType": "product-research",
                "config": {"providerKey": "sk-good"}
            }))
            .await;
        session.recv().await;
        let agent_id = session.recv().await["agentId"].as_str().unwrap().to_string();

        session.send(json!({"type": "page-attached", "targetId": "tab-1"})).await;
        session
            .send(json!({
                "type": "agent-message",
                "agentId": agent_id,
                "action": "extractItemData",
                "correlationId": "c-msg"
            }))
            .await;
        session.recv().await;
        assert_eq!(session.recv().await["type"], "bridge-request");

        session.send(json!({"type": "page-detached", "targetId": "tab-1"})).await;
        let response = session.recv().await;
        assert_eq!(response["success"], true);
        assert_eq!(
            response["data"]["toolResults"][0]["error"],
            "content bridge failed: page tab-1 closed before replying"
        );
        session.finish().await;
    }

    #[tokio::test]
    async fn test_queued_request_for_detached_page_is_dropped() {
        let pending = Arc::new(Mutex::new(Pending::default()));
        let generation = pending.lock().await.attach("tab-1");

        // The request is still queued when the page goes away
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (responder, reply) = oneshot::channel();
        requests_tx
            .send(crate::tools::BridgeRequest {
                action: "extractItemData".to_string(),
                data: json!({}),
                responder,
            })
            .unwrap();
        drop(requests_tx);
        pending.lock().await.detach("tab-1");

        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        forward_bridge_requests("tab-1".to_string(), generation, requests_rx, pending.clone(), out_tx)
            .await;

        assert!(reply.await.is_err());
        assert!(out_rx.recv().await.is_none());
        assert!(pending.lock().await.requests.is_empty());
    }

    #[tokio::test]
    async fn test_reattached_page_ignores_stale_forwarder() {
        let mut pending = Pending::default();
        let first = pending.attach("tab-1");
        pending.detach("tab-1");
        let second = pending.attach("tab-1");

        assert!(!pending.is_attached("tab-1", first));
        assert!(pending.is_attached("tab-1", second));
    }
}
