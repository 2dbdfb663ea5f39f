//! Agent registry for managing live agents

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AgentConfig;
use crate::error::OrchestratorError;
use crate::tools::ToolRegistry;

/// Unique identifier for an agent
pub type AgentId = String;

/// Kind of agent; selects the tool catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    /// Researches items on supplier and marketplace pages
    ProductResearch,
    /// Cleans and validates the store's catalog
    CatalogManager,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductResearch => "product-research",
            Self::CatalogManager => "catalog-manager",
        }
    }

    /// Name given to agents created without one
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ProductResearch => "Product Research Agent",
            Self::CatalogManager => "Catalog Manager Agent",
        }
    }

    pub fn all() -> [AgentType; 2] {
        [Self::ProductResearch, Self::CatalogManager]
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Running,
    Stopped,
    Error,
}

/// Page the agent is currently working on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    #[serde(default)]
    pub page_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Epoch milliseconds
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// A live agent
#[derive(Clone)]
pub struct Agent {
    pub id: AgentId,
    pub agent_type: AgentType,
    pub name: String,
    pub status: AgentStatus,
    pub config: AgentConfig,
    pub context: Option<AgentContext>,
    /// Derived from `agent_type`, never persisted
    pub tools: ToolRegistry,
}

impl Agent {
    /// Build an agent with the catalog for its type
    pub fn new(
        id: AgentId,
        agent_type: AgentType,
        name: String,
        status: AgentStatus,
        config: AgentConfig,
        context: Option<AgentContext>,
    ) -> Self {
        Self {
            id,
            agent_type,
            name,
            status,
            config,
            context,
            tools: ToolRegistry::for_agent_type(agent_type),
        }
    }

    /// Read-only projection of this agent
    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.id.clone(),
            agent_type: self.agent_type,
            name: self.name.clone(),
            status: self.status,
            context: self.context.clone(),
            tools: self.tools.names().map(str::to_string).collect(),
        }
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keep the provider key out of logs
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("agent_type", &self.agent_type)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Serializable view returned by `status` and `list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub id: AgentId,
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub name: String,
    pub status: AgentStatus,
    pub context: Option<AgentContext>,
    pub tools: Vec<String>,
}

/// Registry of live agents keyed by id
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<AgentId, Agent>,
}

impl AgentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id not used by any live agent
    pub fn allocate_id(&self) -> AgentId {
        loop {
            let id = format!("agent_{}", uuid::Uuid::new_v4().simple());
            if !self.agents.contains_key(&id) {
                return id;
            }
        }
    }

    /// Insert an agent. Returns false, leaving the registry untouched, if the
    /// id is already taken.
    pub fn insert(&mut self, agent: Agent) -> bool {
        if self.agents.contains_key(&agent.id) {
            return false;
        }
        self.agents.insert(agent.id.clone(), agent);
        true
    }

    /// Get an agent by id
    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    /// Get an agent by id or fail with a lookup error
    pub fn lookup(&self, id: &str) -> Result<&Agent, OrchestratorError> {
        self.agents
            .get(id)
            .ok_or_else(|| OrchestratorError::Lookup(id.to_string()))
    }

    fn lookup_mut(&mut self, id: &str) -> Result<&mut Agent, OrchestratorError> {
        self.agents
            .get_mut(id)
            .ok_or_else(|| OrchestratorError::Lookup(id.to_string()))
    }

    /// Mark agent as running, optionally replacing its context
    pub fn start(
        &mut self,
        id: &str,
        context: Option<AgentContext>,
    ) -> Result<&Agent, OrchestratorError> {
        let agent = self.lookup_mut(id)?;
        debug!("Agent {}: {:?} -> Running", id, agent.status);
        agent.status = AgentStatus::Running;
        if let Some(context) = context {
            agent.context = Some(context);
        }
        Ok(agent)
    }

    /// Mark agent as stopped
    pub fn stop(&mut self, id: &str) -> Result<&Agent, OrchestratorError> {
        let agent = self.lookup_mut(id)?;
        debug!("Agent {}: {:?} -> Stopped", id, agent.status);
        agent.status = AgentStatus::Stopped;
        Ok(agent)
    }

    /// Mark agent as errored
    pub fn set_error(&mut self, id: &str) -> Result<&Agent, OrchestratorError> {
        let agent = self.lookup_mut(id)?;
        debug!("Agent {}: {:?} -> Error", id, agent.status);
        agent.status = AgentStatus::Error;
        Ok(agent)
    }

    /// Stop every agent, returning the updated agents
    pub fn stop_all(&mut self) -> Vec<Agent> {
        self.agents
            .values_mut()
            .map(|agent| {
                agent.status = AgentStatus::Stopped;
                agent.clone()
            })
            .collect()
    }

    /// Remove an agent by ID
    pub fn remove(&mut self, id: &str) -> Option<Agent> {
        self.agents.remove(id)
    }

    /// Drop every agent
    pub fn clear(&mut self) {
        self.agents.clear();
    }

    /// All agents ordered by id
    pub fn list(&self) -> Vec<AgentSummary> {
        let mut summaries: Vec<_> = self.agents.values().map(Agent::summary).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
