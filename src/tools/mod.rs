//! Tool catalogs and the capability interface handlers implement
//!
//! Each agent type maps to a fixed, ordered catalog built once when the agent
//! is created or restored. Handlers either compute locally or delegate to the
//! [`ContentBridge`] supplied through [`ToolContext`].

pub mod bridge;
mod impls;
pub mod schema;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ToolError;
use crate::llm::{AgentContext, AgentType};
use crate::llm::types::ToolDefinition;

pub use bridge::{BridgeRequest, ContentBridge, PageBridge};
pub use impls::{
    normalize_categories, CalculateMarginTool, ExtractCatalogRowsTool, ExtractItemDataTool,
    FindSimilarItemsTool, NormalizeCategoriesTool, ReviewSeoTool, ValidateImportHeadersTool,
    REQUIRED_FIELDS,
};

/// Canonical tool names
pub mod names {
    pub const EXTRACT_ITEM_DATA: &str = "extractItemData";
    pub const FIND_SIMILAR_ITEMS: &str = "findSimilarItems";
    pub const CALCULATE_MARGIN: &str = "calculateMargin";
    pub const EXTRACT_CATALOG_ROWS: &str = "extractCatalogRows";
    pub const VALIDATE_IMPORT_HEADERS: &str = "validateImportHeaders";
    pub const NORMALIZE_CATEGORIES: &str = "normalizeCategories";
    pub const REVIEW_SEO: &str = "reviewSeo";
}

/// Collaborators a handler may use
#[derive(Clone)]
pub struct ToolContext {
    pub bridge: Arc<dyn ContentBridge>,
    /// Page the agent was started on, if any
    pub page: Option<AgentContext>,
}

impl ToolContext {
    pub fn new(bridge: Arc<dyn ContentBridge>, page: Option<AgentContext>) -> Self {
        Self { bridge, page }
    }
}

/// A named capability the reasoning loop can invoke
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, unique within a catalog
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema for the tool's parameters
    fn schema(&self) -> Value;

    async fn invoke(&self, params: Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}

/// Deserialize tool params into a typed struct
pub(crate) fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, ToolError> {
    // Providers send `{}` or nothing for parameterless calls
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

/// Ordered catalog of tools for one agent
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// The fixed catalog for an agent type
    pub fn for_agent_type(agent_type: AgentType) -> Self {
        let mut registry = Self::empty();

        match agent_type {
            AgentType::ProductResearch => {
                registry.register(Arc::new(ExtractItemDataTool));
                registry.register(Arc::new(FindSimilarItemsTool));
                registry.register(Arc::new(CalculateMarginTool));
            }
            AgentType::CatalogManager => {
                registry.register(Arc::new(ExtractCatalogRowsTool));
                registry.register(Arc::new(ValidateImportHeadersTool));
                registry.register(Arc::new(NormalizeCategoriesTool));
                registry.register(Arc::new(ReviewSeoTool));
            }
        }

        registry
    }

    pub fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    /// Add a tool, replacing any existing tool with the same name in place
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(index) => self.tools[index] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn values(&self) -> impl Iterator<Item = &dyn Tool> {
        self.tools.iter().map(|t| t.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.iter().map(|t| t.name())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool schemas in function-calling format
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.values()
            .map(|tool| ToolDefinition::function(tool.name(), tool.description(), tool.schema()))
            .collect()
    }
}
