//! Durable agent configs and last-known states
//!
//! The whole blob is read and written at once. [`StateStore`] serializes every
//! read-modify-write so that saves for different agents never drop each other.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::AgentConfig;
use crate::error::PersistenceError;
use crate::llm::{Agent, AgentContext, AgentId, AgentStatus, AgentType};

/// Last-known state of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAgentState {
    #[serde(rename = "type")]
    pub agent_type: AgentType,
    pub name: String,
    pub status: AgentStatus,
    #[serde(default)]
    pub context: Option<AgentContext>,
}

impl From<&Agent> for PersistedAgentState {
    fn from(agent: &Agent) -> Self {
        Self {
            agent_type: agent.agent_type,
            name: agent.name.clone(),
            status: agent.status,
            context: agent.context.clone(),
        }
    }
}

/// The persisted blob
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub agent_configs: BTreeMap<AgentId, AgentConfig>,
    pub agent_states: BTreeMap<AgentId, PersistedAgentState>,
}

impl PersistedState {
    fn upsert(&mut self, agent: &Agent) {
        self.agent_configs
            .insert(agent.id.clone(), agent.config.clone());
        self.agent_states
            .insert(agent.id.clone(), PersistedAgentState::from(agent));
    }
}

/// Whole-blob storage backend
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn read(&self) -> Result<PersistedState, PersistenceError>;
    async fn write(&self, state: &PersistedState) -> Result<(), PersistenceError>;
}

/// JSON file backend
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PersistentStore for FileStore {
    async fn read(&self) -> Result<PersistedState, PersistenceError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(PersistedState::default()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PersistedState::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// In-memory backend
#[derive(Default)]
pub struct MemoryStore {
    state: StdMutex<PersistedState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: StdMutex::new(state),
        }
    }

    /// Copy of the current blob
    pub fn snapshot(&self) -> PersistedState {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn read(&self) -> Result<PersistedState, PersistenceError> {
        Ok(self.snapshot())
    }

    async fn write(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state.clone();
        Ok(())
    }
}

/// Serialized read-modify-write access to a [`PersistentStore`]
#[derive(Clone)]
pub struct StateStore {
    backend: Arc<dyn PersistentStore>,
    write_lock: Arc<Mutex<()>>,
}

impl StateStore {
    pub fn new(backend: Arc<dyn PersistentStore>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn load(&self) -> Result<PersistedState, PersistenceError> {
        self.backend.read().await
    }

    /// Persist one agent's config and state
    pub async fn save_agent(&self, agent: &Agent) -> Result<(), PersistenceError> {
        self.update(|state| state.upsert(agent)).await
    }

    /// Persist several agents in a single write
    pub async fn save_agents(&self, agents: &[Agent]) -> Result<(), PersistenceError> {
        self.update(|state| agents.iter().for_each(|agent| state.upsert(agent)))
            .await
    }

    /// Overwrite the stored status of existing entries
    pub async fn save_statuses(
        &self,
        statuses: &[(AgentId, AgentStatus)],
    ) -> Result<(), PersistenceError> {
        self.update(|state| {
            for (id, status) in statuses {
                if let Some(entry) = state.agent_states.get_mut(id) {
                    entry.status = *status;
                }
            }
        })
        .await
    }

    /// Drop both persisted entries for an agent
    pub async fn remove_agent(&self, id: &str) -> Result<(), PersistenceError> {
        self.update(|state| {
            state.agent_configs.remove(id);
            state.agent_states.remove(id);
        })
        .await
    }

    async fn update<F>(&self, mutate: F) -> Result<(), PersistenceError>
    where
        F: FnOnce(&mut PersistedState),
    {
        let _guard = self.write_lock.lock().await;
        let mut state = self.backend.read().await?;
        mutate(&mut state);
        self.backend.write(&state).await?;
        debug!("Persisted {} agents", state.agent_states.len());
        Ok(())
    }
}
