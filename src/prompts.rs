//! Prompt definitions for agent reasoning calls
//!
//! The system prompt is composed of:
//! 1. A per-type base prompt
//! 2. The agent's identity and current page context
//! 3. The description of every tool in its catalog
//! 4. User SYSTEM.md from ~/.config/storehand/ (optional)

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::config::Config;
use crate::llm::{Agent, AgentContext, AgentType};

/// Filename for custom system prompt additions
pub const SYSTEM_MD_FILENAME: &str = "SYSTEM.md";

const PRODUCT_RESEARCH_PROMPT: &str = r#"You help a small online store decide which products to carry.

## Guidelines
- Extract the item from the current page before judging it
- Compare against similar listings to estimate a realistic selling price
- Always report profit and margin from `calculateMargin`, never from mental arithmetic
- Be concise; summarize findings as a short recommendation
"#;

const CATALOG_MANAGER_PROMPT: &str = r#"You keep a store's product catalog clean and ready to import.

## Guidelines
- Read rows from the catalog page before proposing changes
- Validate import headers before anything else; a missing column fails the whole import
- Normalize category cells rather than rewriting them by hand
- Flag missing or over-long SEO fields item by item
"#;

fn base_prompt(agent_type: AgentType) -> &'static str {
    match agent_type {
        AgentType::ProductResearch => PRODUCT_RESEARCH_PROMPT,
        AgentType::CatalogManager => CATALOG_MANAGER_PROMPT,
    }
}

/// Describe the page an agent is working on
fn describe_context(context: &AgentContext) -> Option<String> {
    let mut lines = Vec::new();

    if let Some(page_type) = &context.page_type {
        lines.push(format!("- Page type: {page_type}"));
    }
    if let Some(url) = &context.url {
        match url::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)) {
            Some(host) => lines.push(format!("- URL: {url} (site: {host})")),
            None => lines.push(format!("- URL: {url}")),
        }
    }
    if let Some(session_id) = &context.session_id {
        lines.push(format!("- Session: {session_id}"));
    }

    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Builds the system prompt for one agent
#[derive(Clone)]
pub struct SystemPrompt {
    user_path: Option<PathBuf>,
}

impl SystemPrompt {
    /// Create a SystemPrompt reading additions from the default config dir
    pub fn new() -> Self {
        Self {
            user_path: Config::config_dir().map(|d| d.join(SYSTEM_MD_FILENAME)),
        }
    }

    /// Create a SystemPrompt without user additions
    pub fn bare() -> Self {
        Self { user_path: None }
    }

    /// Create a SystemPrompt reading additions from a specific file
    pub fn with_user_path(path: impl Into<PathBuf>) -> Self {
        Self {
            user_path: Some(path.into()),
        }
    }

    /// Build the complete system prompt for `agent`
    pub fn build(&self, agent: &Agent) -> String {
        let mut prompt = format!(
            "You are {}, a {} agent.\n\n{}",
            agent.name,
            agent.agent_type,
            base_prompt(agent.agent_type)
        );

        if let Some(context) = agent.context.as_ref().and_then(describe_context) {
            prompt.push_str("\n## Current page\n");
            prompt.push_str(&context);
            prompt.push('\n');
        }

        prompt.push_str("\n## Tools\n");
        for tool in agent.tools.values() {
            prompt.push_str(&format!("- `{}`: {}\n", tool.name(), tool.description()));
        }

        if let Some(content) = self.user_path.as_deref().and_then(load_system_md) {
            prompt.push_str("\n\n");
            prompt.push_str(&content);
        }

        prompt
    }
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self::new()
    }
}

fn load_system_md(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    match fs::read_to_string(path) {
        Ok(content) => Some(content).filter(|s| !s.trim().is_empty()),
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            None
        }
    }
}

/// The user turn sent with every reasoning call
pub fn user_message(action: &str, data: &Value) -> String {
    format!("Action: {action}\nData: {data}")
}
