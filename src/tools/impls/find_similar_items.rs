//! Search the active marketplace page for comparable listings

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tools::schema::{integer_prop, object_schema, string_prop};
use crate::tools::{names, parse_params, Tool, ToolContext};

const DEFAULT_LIMIT: u32 = 10;

pub struct FindSimilarItemsTool;

#[derive(Debug, Deserialize)]
struct FindSimilarItemsParams {
    query: String,
    #[serde(default)]
    limit: Option<u32>,
}

#[async_trait]
impl Tool for FindSimilarItemsTool {
    fn name(&self) -> &'static str {
        names::FIND_SIMILAR_ITEMS
    }

    fn description(&self) -> &'static str {
        "Find listings similar to an item on the marketplace page currently open \
         in the browser. Returns titles, prices and links."
    }

    fn schema(&self) -> Value {
        object_schema()
            .required("query", string_prop("Item title or keywords to search for"))
            .optional("limit", integer_prop("Maximum number of listings (default 10)", 1))
            .build()
    }

    async fn invoke(&self, params: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let parsed: FindSimilarItemsParams = parse_params(params)?;
        let query = parsed.query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidParams("query must not be empty".to_string()));
        }

        let request = json!({
            "query": query,
            "limit": parsed.limit.unwrap_or(DEFAULT_LIMIT).max(1),
        });
        Ok(ctx.bridge.execute(self.name(), request).await?)
    }
}
