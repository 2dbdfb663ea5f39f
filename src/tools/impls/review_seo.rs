//! SEO completeness review for catalog items

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tools::schema::object_schema;
use crate::tools::{names, parse_params, Tool, ToolContext};

/// Search engines truncate titles past this many characters
const MAX_TITLE_CHARS: usize = 60;
const MAX_DESCRIPTION_CHARS: usize = 160;

pub struct ReviewSeoTool;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeoItem {
    name: String,
    #[serde(default)]
    seo_title: Option<String>,
    #[serde(default)]
    seo_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewSeoParams {
    items: Vec<SeoItem>,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn review(item: &SeoItem) -> Vec<String> {
    let mut issues = Vec::new();

    match present(&item.seo_title) {
        None => issues.push("missing SEO title".to_string()),
        Some(title) => {
            let len = title.chars().count();
            if len > MAX_TITLE_CHARS {
                issues.push(format!("SEO title is {len} chars (max {MAX_TITLE_CHARS})"));
            }
        }
    }

    match present(&item.seo_description) {
        None => issues.push("missing SEO description".to_string()),
        Some(description) => {
            let len = description.chars().count();
            if len > MAX_DESCRIPTION_CHARS {
                issues.push(format!(
                    "SEO description is {len} chars (max {MAX_DESCRIPTION_CHARS})"
                ));
            }
        }
    }

    issues
}

#[async_trait]
impl Tool for ReviewSeoTool {
    fn name(&self) -> &'static str {
        names::REVIEW_SEO
    }

    fn description(&self) -> &'static str {
        "Review catalog items for missing or over-long SEO titles and descriptions. \
         Returns the items that need attention with their issues."
    }

    fn schema(&self) -> Value {
        object_schema()
            .required(
                "items",
                json!({
                    "type": "array",
                    "description": "Items to review",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "seoTitle": { "type": "string" },
                            "seoDescription": { "type": "string" }
                        },
                        "required": ["name"]
                    }
                }),
            )
            .build()
    }

    async fn invoke(&self, params: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let parsed: ReviewSeoParams = parse_params(params)?;
        let needs_attention: Vec<Value> = parsed
            .items
            .iter()
            .filter_map(|item| {
                let issues = review(item);
                (!issues.is_empty()).then(|| json!({ "name": item.name, "issues": issues }))
            })
            .collect();

        Ok(json!({
            "reviewed": parsed.items.len(),
            "complete": parsed.items.len() - needs_attention.len(),
            "needsAttention": needs_attention,
        }))
    }
}
