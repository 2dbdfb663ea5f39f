//! Extract item data from the active page

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ToolError;
use crate::tools::schema::{boolean_prop, object_schema, string_prop};
use crate::tools::{names, parse_params, Tool, ToolContext};

/// Reads title, price, images and attributes off the product page in view
pub struct ExtractItemDataTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractItemDataParams {
    #[serde(default)]
    selector: Option<String>,
    #[serde(default)]
    include_images: Option<bool>,
}

#[async_trait]
impl Tool for ExtractItemDataTool {
    fn name(&self) -> &'static str {
        names::EXTRACT_ITEM_DATA
    }

    fn description(&self) -> &'static str {
        "Extract structured item data (title, price, images, attributes) from the \
         product page currently open in the browser."
    }

    fn schema(&self) -> Value {
        object_schema()
            .optional(
                "selector",
                string_prop("CSS selector scoping the product container (optional)"),
            )
            .optional(
                "includeImages",
                boolean_prop("Include image URLs in the result (default true)"),
            )
            .build()
    }

    async fn invoke(&self, params: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let parsed: ExtractItemDataParams = parse_params(params.clone())?;
        tracing::debug!(
            "Extracting item data (selector: {:?}, images: {:?})",
            parsed.selector,
            parsed.include_images
        );
        Ok(ctx.bridge.execute(self.name(), params).await?)
    }
}
