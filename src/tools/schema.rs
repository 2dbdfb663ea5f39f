//! JSON schema helpers for tool parameters

use serde_json::{json, Map, Value};

/// Start an object schema
pub fn object_schema() -> SchemaBuilder {
    SchemaBuilder::default()
}

pub fn string_prop(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

pub fn number_prop(description: &str) -> Value {
    json!({ "type": "number", "description": description })
}

pub fn integer_prop(description: &str, minimum: i64) -> Value {
    json!({ "type": "integer", "description": description, "minimum": minimum })
}

pub fn boolean_prop(description: &str) -> Value {
    json!({ "type": "boolean", "description": description })
}

pub fn string_array_prop(description: &str) -> Value {
    json!({
        "type": "array",
        "description": description,
        "items": { "type": "string" }
    })
}

/// Object schema builder; `build` always yields `"type": "object"`
#[derive(Default)]
pub struct SchemaBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl SchemaBuilder {
    pub fn required(mut self, name: &str, schema: Value) -> Self {
        self.properties.insert(name.to_string(), schema);
        self.required.push(name.to_string());
        self
    }

    pub fn optional(mut self, name: &str, schema: Value) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    pub fn build(self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
            "additionalProperties": false
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_tracks_required() {
        let schema = object_schema()
            .required("cost", number_prop("Unit cost"))
            .optional("fees", number_prop("Marketplace fees"))
            .build();

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["cost"]));
        assert_eq!(schema["properties"]["fees"]["type"], "number");
    }

    #[test]
    fn test_empty_schema() {
        let schema = object_schema().build();
        assert_eq!(schema["properties"], json!({}));
        assert_eq!(schema["required"], json!([]));
    }
}
