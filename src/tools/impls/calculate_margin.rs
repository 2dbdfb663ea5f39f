//! Profit and margin arithmetic

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::tools::schema::{number_prop, object_schema};
use crate::tools::{names, parse_params, Tool, ToolContext};

pub struct CalculateMarginTool;

#[derive(Debug, Deserialize)]
struct CalculateMarginParams {
    cost: f64,
    price: f64,
    #[serde(default)]
    fees: f64,
    #[serde(default)]
    shipping: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait]
impl Tool for CalculateMarginTool {
    fn name(&self) -> &'static str {
        names::CALCULATE_MARGIN
    }

    fn description(&self) -> &'static str {
        "Calculate profit, margin and markup for an item given its cost, selling \
         price and optional fees and shipping."
    }

    fn schema(&self) -> Value {
        object_schema()
            .required("cost", number_prop("Unit cost to acquire the item"))
            .required("price", number_prop("Selling price"))
            .optional("fees", number_prop("Marketplace or payment fees per unit"))
            .optional("shipping", number_prop("Shipping cost per unit"))
            .build()
    }

    async fn invoke(&self, params: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let p: CalculateMarginParams = parse_params(params)?;
        if p.price <= 0.0 {
            return Err(ToolError::Execution("price must be greater than zero".to_string()));
        }
        if p.cost < 0.0 || p.fees < 0.0 || p.shipping < 0.0 {
            return Err(ToolError::Execution("costs must not be negative".to_string()));
        }

        let total_cost = p.cost + p.fees + p.shipping;
        let profit = p.price - total_cost;
        let markup = if total_cost > 0.0 {
            Value::from(round2(profit / total_cost * 100.0))
        } else {
            Value::Null
        };

        Ok(json!({
            "totalCost": round2(total_cost),
            "profit": round2(profit),
            "marginPercent": round2(profit / p.price * 100.0),
            "markupPercent": markup,
        }))
    }
}
