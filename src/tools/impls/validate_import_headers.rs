//! Square catalog import header and value checks

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::tools::schema::{object_schema, string_array_prop};
use crate::tools::{names, parse_params, Tool, ToolContext};

/// Columns every import sheet must carry
pub const REQUIRED_FIELDS: [&str; 14] = [
    "Reference Handle",
    "Token",
    "Item Name",
    "Variation Name",
    "SKU",
    "Description",
    "Categories",
    "Reporting Category",
    "SEO Title",
    "SEO Description",
    "Item Type",
    "Sold Online",
    "Available for Sale",
    "Square Online Item Visibility",
];

/// Values at least one row must carry for the item to show up online
const REQUIRED_VALUES: [(&str, &str); 4] = [
    ("Square Online Item Visibility", "Visible"),
    ("Sold Online", "Y"),
    ("Available for Sale", "Y"),
    ("Item Type", "Physical"),
];

pub struct ValidateImportHeadersTool;

#[derive(Debug, Deserialize)]
struct ValidateImportHeadersParams {
    headers: Vec<String>,
    #[serde(default)]
    rows: Vec<Map<String, Value>>,
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn check_values(headers: &BTreeSet<&str>, rows: &[Map<String, Value>]) -> Vec<String> {
    let mut issues = Vec::new();
    for (field, expected) in REQUIRED_VALUES {
        if !headers.contains(field) {
            // Already reported as a missing header
            continue;
        }
        let found: BTreeSet<String> = rows
            .iter()
            .filter_map(|row| row.get(field).and_then(cell_text))
            .collect();
        if !found.contains(expected) {
            issues.push(format!(
                "expected '{}' in '{}', found {:?}",
                expected, field, found
            ));
        }
    }
    issues
}

#[async_trait]
impl Tool for ValidateImportHeadersTool {
    fn name(&self) -> &'static str {
        names::VALIDATE_IMPORT_HEADERS
    }

    fn description(&self) -> &'static str {
        "Validate a catalog import sheet: report missing required columns, \
         duplicate headers, and (when rows are given) required values."
    }

    fn schema(&self) -> Value {
        object_schema()
            .required("headers", string_array_prop("Header row of the sheet, in order"))
            .optional(
                "rows",
                json!({
                    "type": "array",
                    "description": "Data rows keyed by header (optional)",
                    "items": { "type": "object" }
                }),
            )
            .build()
    }

    async fn invoke(&self, params: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let parsed: ValidateImportHeadersParams = parse_params(params)?;

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for header in &parsed.headers {
            *counts.entry(header.as_str()).or_default() += 1;
        }
        let duplicates: Vec<&str> = counts
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(header, _)| *header)
            .collect();

        let present: BTreeSet<&str> = counts.keys().copied().collect();
        let mut missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| !present.contains(field))
            .collect();
        missing.sort_unstable();

        let value_issues = if parsed.rows.is_empty() {
            Vec::new()
        } else {
            check_values(&present, &parsed.rows)
        };

        Ok(json!({
            "valid": missing.is_empty() && duplicates.is_empty() && value_issues.is_empty(),
            "missing": missing,
            "duplicates": duplicates,
            "valueIssues": value_issues,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::StaticBridge;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn ctx() -> ToolContext {
        ToolContext::new(Arc::new(StaticBridge::detached()), None)
    }

    #[tokio::test]
    async fn test_complete_headers_are_valid() {
        let value = ValidateImportHeadersTool
            .invoke(json!({ "headers": REQUIRED_FIELDS }), &ctx())
            .await
            .unwrap();
        assert_eq!(value["valid"], true);
        assert_eq!(value["missing"], json!([]));
    }

    #[tokio::test]
    async fn test_reports_missing_and_duplicates() {
        let value = ValidateImportHeadersTool
            .invoke(
                json!({ "headers": ["Token", "SKU", "SKU", "Item Name", "Token"] }),
                &ctx(),
            )
            .await
            .unwrap();

        assert_eq!(value["valid"], false);
        assert_eq!(value["duplicates"], json!(["SKU", "Token"]));
        let missing = value["missing"].as_array().unwrap();
        assert_eq!(missing.len(), REQUIRED_FIELDS.len() - 3);
        assert_eq!(missing[0], "Available for Sale");
    }

    #[tokio::test]
    async fn test_checks_required_values() {
        let mut row: Map<String, Value> = REQUIRED_FIELDS
            .iter()
            .map(|field| (field.to_string(), json!("x")))
            .collect();
        row.insert("Square Online Item Visibility".into(), json!(" Visible "));
        row.insert("Sold Online".into(), json!("Y"));
        row.insert("Available for Sale".into(), json!("Y"));
        row.insert("Item Type".into(), json!("Digital"));

        let value = ValidateImportHeadersTool
            .invoke(json!({ "headers": REQUIRED_FIELDS, "rows": [row] }), &ctx())
            .await
            .unwrap();

        assert_eq!(value["valid"], false);
        let issues = value["valueIssues"].as_array().unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].as_str().unwrap().contains("'Item Type'"));
    }
}
