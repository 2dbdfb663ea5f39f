//! Content bridge into page execution contexts
//!
//! A page registers itself as a target and receives [`BridgeRequest`]s on a
//! channel; each request carries a oneshot responder for exactly one reply.
//! The bridge never holds a connection open to a page: every call resolves
//! "the current active target" by id at call time.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::debug;

use crate::error::BridgeError;

/// Round trip into the active page
///
/// No timeout is applied: a page that never replies blocks the call.
#[async_trait]
pub trait ContentBridge: Send + Sync {
    async fn execute(&self, action: &str, params: Value) -> Result<Value, BridgeError>;
}

/// A request delivered to a page target
#[derive(Debug)]
pub struct BridgeRequest {
    pub action: String,
    pub data: Value,
    /// Send the page's reply (or its error message)
    pub responder: oneshot::Sender<Result<Value, String>>,
}

struct PageTarget {
    url: Option<String>,
    sender: mpsc::UnboundedSender<BridgeRequest>,
}

#[derive(Default)]
struct Targets {
    pages: HashMap<String, PageTarget>,
    active: Option<String>,
}

/// Bridge over id-addressed page targets
#[derive(Default)]
pub struct PageBridge {
    targets: Mutex<Targets>,
}

impl PageBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page and make it the active target.
    ///
    /// Re-attaching an id replaces the previous channel.
    pub async fn attach(
        &self,
        target_id: impl Into<String>,
        url: Option<String>,
    ) -> mpsc::UnboundedReceiver<BridgeRequest> {
        let target_id = target_id.into();
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut targets = self.targets.lock().await;
        debug!("Page {} attached ({:?})", target_id, url);
        targets
            .pages
            .insert(target_id.clone(), PageTarget { url, sender });
        targets.active = Some(target_id);
        receiver
    }

    /// Make an attached page the active target. Returns false if unknown.
    pub async fn activate(&self, target_id: &str) -> bool {
        let mut targets = self.targets.lock().await;
        if !targets.pages.contains_key(target_id) {
            return false;
        }
        targets.active = Some(target_id.to_string());
        true
    }

    /// Forget a page; if it was active there is no active target afterwards
    pub async fn detach(&self, target_id: &str) {
        let mut targets = self.targets.lock().await;
        targets.pages.remove(target_id);
        if targets.active.as_deref() == Some(target_id) {
            targets.active = None;
        }
        debug!("Page {} detached", target_id);
    }

    /// Forget every page
    pub async fn detach_all(&self) {
        let mut targets = self.targets.lock().await;
        targets.pages.clear();
        targets.active = None;
    }

    /// Id and url of the active target
    #[cfg(test)]
    pub(crate) async fn active(&self) -> Option<(String, Option<String>)> {
        let targets = self.targets.lock().await;
        let id = targets.active.as_ref()?;
        let page = targets.pages.get(id)?;
        Some((id.clone(), page.url.clone()))
    }
}

#[async_trait]
impl ContentBridge for PageBridge {
    async fn execute(&self, action: &str, params: Value) -> Result<Value, BridgeError> {
        let (target_id, sender) = {
            let targets = self.targets.lock().await;
            let target_id = targets.active.clone().ok_or(BridgeError::NoActiveTarget)?;
            let page = targets
                .pages
                .get(&target_id)
                .ok_or(BridgeError::NoActiveTarget)?;
            (target_id, page.sender.clone())
        };

        let (responder, reply) = oneshot::channel();
        sender
            .send(BridgeRequest {
                action: action.to_string(),
                data: params,
                responder,
            })
            .map_err(|_| BridgeError::TargetClosed(target_id.clone()))?;
        debug!("Bridge request {} sent to page {}", action, target_id);

        match reply.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(BridgeError::Page(message)),
            Err(_) => Err(BridgeError::TargetClosed(target_id)),
        }
    }
}
