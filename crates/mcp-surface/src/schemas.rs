//! JSON Schema generation for every tool's input and output shape (spec
//! §4.8 "Typed input/output schemas").
//!
//! Each tool owns a pair of plain serde/schemars structs in its own module
//! under `tools/`; this module only holds the one helper that turns a
//! `JsonSchema` type into the `serde_json::Value` the MCP `Tool` descriptor
//! and the structured-output validator both want.

use schemars::JsonSchema;
use serde_json::Value;

/// Render `T`'s JSON Schema as a plain `Value`, the shape `rmcp::model::Tool`
/// and `jsonschema::Validator` both consume.
pub fn schema_for<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, JsonSchema)]
    struct Example {
        name: String,
        count: u32,
    }

    #[test]
    fn schema_for_renders_an_object_schema() {
        let schema = schema_for::<Example>();
        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["name"].is_object());
    }
}
