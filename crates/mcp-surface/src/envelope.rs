//! The response envelope every tool and resource reply carries (spec §4.8,
//! §6 "Wire protocol — inbound (MCP)").

use serde::Serialize;
use serde_json::Value;

/// MCP 2025-06-18, carried on every response (spec §4.8).
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryMode {
    Single,
    Multi,
}

impl RegistryMode {
    pub fn from_count(count: usize) -> Self {
        if count > 1 {
            RegistryMode::Multi
        } else {
            RegistryMode::Single
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            RegistryMode::Single => "single",
            RegistryMode::Multi => "multi",
        }
    }
}

/// Wraps a tool's raw JSON result (or error payload) with the two fields
/// every response carries (spec §4.8).
pub fn envelope_success(registry_mode: RegistryMode, mut payload: Value) -> Value {
    if let Value::Object(map) = &mut payload {
        map.insert("mcp_protocol_version".to_string(), Value::String(MCP_PROTOCOL_VERSION.to_string()));
        map.insert("registry_mode".to_string(), Value::String(registry_mode.as_str().to_string()));
        payload
    } else {
        serde_json::json!({
            "result": payload,
            "mcp_protocol_version": MCP_PROTOCOL_VERSION,
            "registry_mode": registry_mode.as_str(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    pub error_code: String,
    pub registry_mode: &'static str,
    pub mcp_protocol_version: &'static str,
}

pub fn envelope_error(registry_mode: RegistryMode, error: &registry_core::ErrorPayload) -> ErrorEnvelope {
    ErrorEnvelope {
        error: error.error.clone(),
        error_code: error.error_code.clone(),
        registry_mode: registry_mode.as_str(),
        mcp_protocol_version: MCP_PROTOCOL_VERSION,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_injects_both_fields_into_an_object_payload() {
        let result = envelope_success(RegistryMode::Multi, serde_json::json!({"subjects": []}));
        assert_eq!(result["mcp_protocol_version"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["registry_mode"], "multi");
    }

    #[test]
    fn mode_from_count_is_single_unless_more_than_one_registry() {
        assert_eq!(RegistryMode::from_count(1), RegistryMode::Single);
        assert_eq!(RegistryMode::from_count(0), RegistryMode::Single);
        assert_eq!(RegistryMode::from_count(3), RegistryMode::Multi);
    }
}
