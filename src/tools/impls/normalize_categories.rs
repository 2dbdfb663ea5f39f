//! Category cell cleanup

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tools::schema::{object_schema, string_array_prop};
use crate::tools::{names, parse_params, Tool, ToolContext};

/// Legacy category names and their replacements
const RENAMES: [(&str, &str); 2] = [
    ("TRTR Curated", "The Apothecary Cabinet"),
    ("Labz", "Curated Labz"),
];

/// Normalize one comma-separated category cell.
///
/// Backslashes are dropped, parts are trimmed, renamed, deduplicated and
/// sorted, then joined with `", "`.
pub fn normalize_categories(cell: &str) -> String {
    let cleaned = cell.replace('\\', "");
    let parts: BTreeSet<&str> = cleaned
        .trim()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            RENAMES
                .iter()
                .find(|(from, _)| *from == part)
                .map_or(part, |(_, to)| *to)
        })
        .collect();

    parts.into_iter().collect::<Vec<_>>().join(", ")
}

pub struct NormalizeCategoriesTool;

#[derive(Debug, Deserialize)]
struct NormalizeCategoriesParams {
    values: Vec<String>,
}

#[async_trait]
impl Tool for NormalizeCategoriesTool {
    fn name(&self) -> &'static str {
        names::NORMALIZE_CATEGORIES
    }

    fn description(&self) -> &'static str {
        "Normalize catalog category cells: strip stray backslashes, trim, apply \
         category renames, and deduplicate and sort the comma-separated parts."
    }

    fn schema(&self) -> Value {
        object_schema()
            .required(
                "values",
                string_array_prop("Category cells, one per item, comma-separated"),
            )
            .build()
    }

    async fn invoke(&self, params: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let parsed: NormalizeCategoriesParams = parse_params(params)?;
        let normalized: Vec<String> = parsed
            .values
            .iter()
            .map(|cell| normalize_categories(cell))
            .collect();
        let changed = parsed
            .values
            .iter()
            .zip(&normalized)
            .filter(|(before, after)| before != after)
            .count();

        Ok(json!({ "normalized": normalized, "changed": changed }))
    }
}
