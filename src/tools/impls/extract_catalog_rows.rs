//! Read catalog rows from the store dashboard page

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tools::schema::{integer_prop, object_schema, string_array_prop};
use crate::tools::{names, parse_params, Tool, ToolContext};

pub struct ExtractCatalogRowsTool;

#[derive(Debug, Deserialize)]
struct ExtractCatalogRowsParams {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    offset: u32,
    #[serde(default)]
    limit: Option<u32>,
}

#[async_trait]
impl Tool for ExtractCatalogRowsTool {
    fn name(&self) -> &'static str {
        names::EXTRACT_CATALOG_ROWS
    }

    fn description(&self) -> &'static str {
        "Read item rows from the catalog table open in the store dashboard. \
         Returns the header row and one object per item."
    }

    fn schema(&self) -> Value {
        object_schema()
            .optional(
                "columns",
                string_array_prop("Only return these columns (default: all)"),
            )
            .optional("offset", integer_prop("Index of the first row to return", 0))
            .optional("limit", integer_prop("Maximum number of rows", 1))
            .build()
    }

    async fn invoke(&self, params: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let parsed: ExtractCatalogRowsParams = parse_params(params)?;
        let mut request = json!({
            "columns": parsed.columns,
            "offset": parsed.offset,
        });
        if let Some(limit) = parsed.limit {
            request["limit"] = json!(limit);
        }
        Ok(ctx.bridge.execute(self.name(), request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::StaticBridge;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_forwards_normalized_request() {
        let bridge = Arc::new(StaticBridge::replying(json!({"headers": ["SKU"], "rows": []})));
        let ctx = ToolContext::new(bridge.clone(), None);

        let value = ExtractCatalogRowsTool
            .invoke(json!({"columns": ["SKU", "Item Name"]}), &ctx)
            .await
            .unwrap();
        assert_eq!(value["headers"], json!(["SKU"]));

        let calls = bridge.calls.lock().unwrap();
        assert_eq!(calls[0].1, json!({"columns": ["SKU", "Item Name"], "offset": 0}));
    }

    #[tokio::test]
    async fn test_no_page_is_reported() {
        let ctx = ToolContext::new(Arc::new(StaticBridge::detached()), None);
        let err = ExtractCatalogRowsTool
            .invoke(Value::Null, &ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NoActiveTarget));
    }
}
