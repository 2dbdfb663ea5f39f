//! Host protocol definitions
//!
//! Defines the JSON messages exchanged with the calling context.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AgentConfig;
use crate::llm::{AgentContext, AgentId, AgentType};

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Fresh opaque correlation token
pub fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// Client → Host Messages
// ============================================================================

/// What an inbound request asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum RequestKind {
    /// Run an action through an agent's tool-call loop
    AgentMessage {
        agent_id: AgentId,
        action: String,
        #[serde(default)]
        data: Value,
    },

    /// Admit a new agent
    CreateAgent {
        agent_type: AgentType,
        #[serde(default)]
        name: Option<String>,
        config: AgentConfig,
    },

    StartAgent {
        agent_id: AgentId,
        #[serde(default)]
        context: Option<AgentContext>,
    },

    StopAgent {
        agent_id: AgentId,
    },

    #[serde(rename = "agent-status")]
    GetStatus {
        agent_id: AgentId,
    },

    ListAgents,

    DeleteAgent {
        agent_id: AgentId,
    },
}

impl RequestKind {
    /// The agent the request targets, if any
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            Self::AgentMessage { agent_id, .. }
            | Self::StartAgent { agent_id, .. }
            | Self::StopAgent { agent_id }
            | Self::GetStatus { agent_id }
            | Self::DeleteAgent { agent_id } => Some(agent_id),
            Self::CreateAgent { .. } | Self::ListAgents => None,
        }
    }
}

/// An inbound request with its optional correlation id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(flatten)]
    pub kind: RequestKind,
}

impl Request {
    pub fn new(kind: RequestKind) -> Self {
        Self {
            correlation_id: None,
            kind,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// Page lifecycle and bridge replies from the calling context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum PageEvent {
    /// A page became available; it becomes the active target
    PageAttached {
        target_id: String,
        #[serde(default)]
        url: Option<String>,
    },

    PageActivated {
        target_id: String,
    },

    PageDetached {
        target_id: String,
    },

    /// Reply to a `bridge-request`
    BridgeResponse {
        request_id: String,
        #[serde(default)]
        data: Option<Value>,
        #[serde(default)]
        error: Option<String>,
    },
}

const PAGE_EVENT_TYPES: [&str; 4] = [
    "page-attached",
    "page-activated",
    "page-detached",
    "bridge-response",
];

/// Any inbound line
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Request(Request),
    Page(PageEvent),
}

impl ClientMessage {
    /// Parse one inbound JSON value, routing on its `type` tag
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let is_page_event = value
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|kind| PAGE_EVENT_TYPES.contains(&kind));

        if is_page_event {
            serde_json::from_value(value).map(Self::Page)
        } else {
            serde_json::from_value(value).map(Self::Request)
        }
    }
}

// ============================================================================
// Host → Client Messages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Request,
    Response,
}

/// Internal envelope for one agent message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub agent_id: AgentId,
    pub action: String,
    pub data: Value,
    pub timestamp: i64,
    pub correlation_id: String,
}

impl Message {
    pub fn request(
        agent_id: impl Into<AgentId>,
        action: impl Into<String>,
        data: Value,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: MessageKind::Request,
            agent_id: agent_id.into(),
            action: action.into(),
            data,
            timestamp: now_millis(),
            correlation_id: correlation_id.into(),
        }
    }
}

/// Payload of a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Data(Value),
    Error(String),
}

/// Exactly one per request, carrying the request's correlation id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    pub timestamp: i64,
    pub correlation_id: String,
}

impl Response {
    pub fn ok(correlation_id: impl Into<String>, agent_id: Option<AgentId>, data: Value) -> Self {
        Self {
            success: true,
            outcome: Outcome::Data(data),
            agent_id,
            timestamp: now_millis(),
            correlation_id: correlation_id.into(),
        }
    }

    pub fn failure(
        correlation_id: impl Into<String>,
        agent_id: Option<AgentId>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            outcome: Outcome::Error(error.into()),
            agent_id,
            timestamp: now_millis(),
            correlation_id: correlation_id.into(),
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Data(data) => Some(data),
            Outcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Data(_) => None,
            Outcome::Error(error) => Some(error),
        }
    }
}

/// Messages written by the host
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "type",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// A response for this correlation id will follow
    Ack { correlation_id: String },

    Response(Response),

    /// Run an action in a page; answered by a `bridge-response`
    BridgeRequest {
        request_id: String,
        target_id: String,
        action: String,
        data: Value,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_agent_message() {
        let message = ClientMessage::from_value(json!({
            "type": "agent-message",
            "agentId": "agent_1",
            "action": "extractItemData",
            "data": {},
            "correlationId": "c-1"
        }))
        .unwrap();

        let ClientMessage::Request(request) = message else {
            panic!("expected a request");
        };
        assert_eq!(request.correlation_id.as_deref(), Some("c-1"));
        assert_eq!(
            request.kind,
            RequestKind::AgentMessage {
                agent_id: "agent_1".into(),
                action: "extractItemData".into(),
                data: json!({}),
            }
        );
    }

    #[test]
    fn test_parse_create_agent_without_correlation() {
        let message = ClientMessage::from_value(json!({
            "type": "create-agent",
            "agentType": "catalog-manager",
            "config": {"providerKey": "sk-test", "maxTokens": 256}
        }))
        .unwrap();

        let ClientMessage::Request(request) = message else {
            panic!("expected a request");
        };
        assert!(request.correlation_id.is_none());
        match request.kind {
            RequestKind::CreateAgent {
                agent_type, config, ..
            } => {
                assert_eq!(agent_type, AgentType::CatalogManager);
                assert_eq!(config.max_tokens, Some(256));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_status_and_list() {
        let status = ClientMessage::from_value(json!({"type": "agent-status", "agentId": "a"})).unwrap();
        assert!(matches!(
            status,
            ClientMessage::Request(Request { kind: RequestKind::GetStatus { .. }, .. })
        ));

        let list = ClientMessage::from_value(json!({"type": "list-agents"})).unwrap();
        assert!(matches!(
            list,
            ClientMessage::Request(Request { kind: RequestKind::ListAgents, .. })
        ));
    }

    #[test]
    fn test_parse_page_events() {
        let attached = ClientMessage::from_value(json!({
            "type": "page-attached",
            "targetId": "tab-1",
            "url": "https://shop.test"
        }))
        .unwrap();
        assert_eq!(
            attached,
            ClientMessage::Page(PageEvent::PageAttached {
                target_id: "tab-1".into(),
                url: Some("https://shop.test".into()),
            })
        );

        let reply = ClientMessage::from_value(json!({
            "type": "bridge-response",
            "requestId": "r-1",
            "error": "no product"
        }))
        .unwrap();
        assert!(matches!(
            reply,
            ClientMessage::Page(PageEvent::BridgeResponse { data: None, .. })
        ));
    }

    #[test]
    fn test_unknown_type_is_error() {
        assert!(ClientMessage::from_value(json!({"type": "reboot"})).is_err());
        assert!(ClientMessage::from_value(json!({"agentId": "a"})).is_err());
    }

    #[test]
    fn test_response_wire_format() {
        let ok = Response::ok("c-1", Some("agent_1".into()), json!({"toolResults": []}));
        let value = serde_json::to_value(ServerMessage::Response(ok)).unwrap();
        assert_eq!(value["type"], "response");
        assert_eq!(value["success"], true);
        assert_eq!(value["data"], json!({"toolResults": []}));
        assert_eq!(value["agentId"], "agent_1");
        assert_eq!(value["correlationId"], "c-1");
        assert!(value["timestamp"].as_i64().unwrap() > 0);

        let failed = Response::failure("c-2", None, "unknown agent: x");
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "unknown agent: x");
        assert!(value.get("agentId").is_none());
        assert!(value.get("data").is_none());
    }

    #[test]
    fn test_ack_and_bridge_request_wire_format() {
        let ack = serde_json::to_value(ServerMessage::Ack {
            correlation_id: "c-1".into(),
        })
        .unwrap();
        assert_eq!(ack, json!({"type": "ack", "correlationId": "c-1"}));

        let request = serde_json::to_value(ServerMessage::BridgeRequest {
            request_id: "r-1".into(),
            target_id: "tab-1".into(),
            action: "extractItemData".into(),
            data: json!({}),
        })
        .unwrap();
        assert_eq!(request["type"], "bridge-request");
        assert_eq!(request["targetId"], "tab-1");
    }

    #[test]
    fn test_message_envelope() {
        let message = Message::request("agent_1", "analyze", json!({"a": 1}), "c-1");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "request");
        assert_eq!(value["agentId"], "agent_1");
        assert_eq!(value["correlationId"], "c-1");
        assert_ne!(message.id, message.correlation_id);
    }
}
