//! The orchestrator owns the live agents and everything they talk to
//!
//! All registry access goes through its methods. The registry lock is only
//! held for in-memory transitions, never across a provider, bridge or store
//! await.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::{AgentConfig, ModelDefaults};
use crate::error::OrchestratorError;
use crate::llm::{
    Agent, AgentContext, AgentLoop, AgentRegistry, AgentStatus, AgentSummary, AgentType,
    LlmClient, LoopOutput,
};
use crate::prompts::SystemPrompt;
use crate::store::StateStore;
use crate::tools::ContentBridge;

pub struct Orchestrator {
    registry: Mutex<AgentRegistry>,
    store: StateStore,
    client: Arc<dyn LlmClient>,
    agent_loop: AgentLoop,
}

impl Orchestrator {
    /// Create an orchestrator with default model settings and system prompt
    pub fn new(
        client: Arc<dyn LlmClient>,
        bridge: Arc<dyn ContentBridge>,
        store: StateStore,
    ) -> Self {
        Self::with_settings(
            client,
            bridge,
            store,
            ModelDefaults::default(),
            SystemPrompt::default(),
        )
    }

    pub fn with_settings(
        client: Arc<dyn LlmClient>,
        bridge: Arc<dyn ContentBridge>,
        store: StateStore,
        defaults: ModelDefaults,
        prompt: SystemPrompt,
    ) -> Self {
        Self {
            registry: Mutex::new(AgentRegistry::new()),
            store,
            agent_loop: AgentLoop::new(client.clone(), bridge, defaults, prompt),
            client,
        }
    }

    /// Admit a new agent after probing its credential
    pub async fn create(
        &self,
        agent_type: AgentType,
        config: AgentConfig,
        name: Option<String>,
    ) -> Result<AgentSummary, OrchestratorError> {
        self.client
            .probe(&config.provider_key)
            .await
            .map_err(OrchestratorError::Capability)?;

        let agent = {
            let mut registry = self.registry.lock().await;
            let agent = Agent::new(
                registry.allocate_id(),
                agent_type,
                name.unwrap_or_else(|| agent_type.display_name().to_string()),
                AgentStatus::Idle,
                config,
                None,
            );
            registry.insert(agent.clone());
            agent
        };

        info!("Created {} agent {}", agent_type, agent.id);
        self.persist(&agent).await;
        Ok(agent.summary())
    }

    /// Mark an agent running, optionally replacing its page context
    pub async fn start(
        &self,
        id: &str,
        context: Option<AgentContext>,
    ) -> Result<AgentSummary, OrchestratorError> {
        let agent = self.registry.lock().await.start(id, context)?.clone();
        info!("Started agent {}", id);
        self.persist(&agent).await;
        Ok(agent.summary())
    }

    pub async fn stop(&self, id: &str) -> Result<AgentSummary, OrchestratorError> {
        let agent = self.registry.lock().await.stop(id)?.clone();
        info!("Stopped agent {}", id);
        self.persist(&agent).await;
        Ok(agent.summary())
    }

    pub async fn status(&self, id: &str) -> Result<AgentSummary, OrchestratorError> {
        Ok(self.registry.lock().await.lookup(id)?.summary())
    }

    pub async fn list(&self) -> Vec<AgentSummary> {
        self.registry.lock().await.list()
    }

    /// Remove an agent and its persisted entries
    pub async fn delete(&self, id: &str) -> Result<AgentSummary, OrchestratorError> {
        let agent = self
            .registry
            .lock()
            .await
            .remove(id)
            .ok_or_else(|| OrchestratorError::Lookup(id.to_string()))?;
        info!("Deleted agent {}", id);
        if let Err(e) = self.store.remove_agent(id).await {
            warn!("Failed to remove persisted agent {}: {}", id, e);
        }
        Ok(agent.summary())
    }

    /// Rebuild agents from the store. Every restored agent is stopped.
    ///
    /// Returns the number of agents restored; a store that cannot be read
    /// restores nothing.
    pub async fn restore(&self) -> usize {
        let state = match self.store.load().await {
            Ok(state) => state,
            Err(e) => {
                warn!("Failed to load persisted agents: {}", e);
                return 0;
            }
        };

        for id in state.agent_configs.keys() {
            if !state.agent_states.contains_key(id) {
                warn!("Skipping persisted agent {} without a state", id);
            }
        }

        let mut restored = Vec::new();
        {
            let mut registry = self.registry.lock().await;
            for (id, saved) in state.agent_states {
                let Some(config) = state.agent_configs.get(&id) else {
                    warn!("Skipping persisted agent {} without a config", id);
                    continue;
                };
                let agent = Agent::new(
                    id.clone(),
                    saved.agent_type,
                    saved.name,
                    AgentStatus::Stopped,
                    config.clone(),
                    saved.context,
                );
                if registry.insert(agent) {
                    restored.push((id, AgentStatus::Stopped));
                }
            }
        }

        if !restored.is_empty() {
            if let Err(e) = self.store.save_statuses(&restored).await {
                warn!("Failed to persist restored statuses: {}", e);
            }
        }
        info!("Restored {} agents", restored.len());
        restored.len()
    }

    /// Stop and persist every agent, then clear the registry.
    ///
    /// Persisted entries are kept.
    pub async fn teardown(&self) {
        let agents = {
            let mut registry = self.registry.lock().await;
            let agents = registry.stop_all();
            registry.clear();
            agents
        };

        if let Err(e) = self.store.save_agents(&agents).await {
            warn!("Failed to persist agents at teardown: {}", e);
        }
        info!("Tore down {} agents", agents.len());
    }

    /// Run one message through the agent's tool-call loop.
    ///
    /// A failed provider round trip moves the agent to `error`.
    pub async fn process(
        &self,
        id: &str,
        action: &str,
        data: &Value,
    ) -> Result<LoopOutput, OrchestratorError> {
        let agent = self.registry.lock().await.lookup(id)?.clone();

        match self.agent_loop.run(&agent, action, data).await {
            Ok(output) => Ok(output),
            Err(e) => {
                error!("Agent {}: provider call failed: {}", id, e);
                // The agent may have been deleted while the call was in flight
                let errored = self
                    .registry
                    .lock()
                    .await
                    .set_error(id)
                    .ok()
                    .cloned();
                if let Some(agent) = errored {
                    self.persist(&agent).await;
                }
                Err(OrchestratorError::Provider(e))
            }
        }
    }

    async fn persist(&self, agent: &Agent) {
        if let Err(e) = self.store.save_agent(agent).await {
            warn!("Failed to persist agent {}: {}", agent.id, e);
        }
    }
}
