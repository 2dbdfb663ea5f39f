//! Bridge doubles for unit tests

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::ContentBridge;
use crate::error::BridgeError;

/// Replies to every action with a fixed value and records what it was asked
pub(crate) struct StaticBridge {
    reply: Option<Value>,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl StaticBridge {
    pub fn replying(reply: Value) -> Self {
        Self {
            reply: Some(reply),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A bridge with no page attached
    pub fn detached() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn actions(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(action, _)| action.clone())
            .collect()
    }
}

#[async_trait]
impl ContentBridge for StaticBridge {
    async fn execute(&self, action: &str, params: Value) -> Result<Value, BridgeError> {
        self.calls
            .lock()
            .unwrap()
            .push((action.to_string(), params));
        self.reply.clone().ok_or(BridgeError::NoActiveTarget)
    }
}
