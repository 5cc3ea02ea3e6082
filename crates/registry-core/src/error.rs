//! The stable error-code taxonomy shared by every layer (spec §7).
//!
//! Each layer crate defines its own `thiserror` enum for the errors it can
//! raise, but every one of them implements [`ErrorCode`] so that the MCP
//! surface can always attach a stable `error_code` string to a failed tool
//! response without matching on crate-specific types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stable, machine-readable error code as carried in every structured
/// error response (spec §7).
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}

/// Errors that belong to `registry-core` itself: configuration parsing,
/// identifier validation, and the context/URL builder.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration is invalid: {0}")]
    ConfigInvalid(String),

    #[error("duplicate registry name: {0}")]
    DuplicateRegistryName(String),

    #[error("duplicate registry url: {0}")]
    DuplicateRegistryUrl(String),

    #[error("registry name must be 1..64 characters: {0:?}")]
    InvalidRegistryName(String),

    #[error("url is not permitted: {0}")]
    SsrfBlocked(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ErrorCode for CoreError {
    fn error_code(&self) -> &'static str {
        match self {
            CoreError::ConfigInvalid(_) => "CONFIG_INVALID",
            CoreError::DuplicateRegistryName(_) => "REGISTRY_DUPLICATE_NAME",
            CoreError::DuplicateRegistryUrl(_) => "REGISTRY_DUPLICATE_URL",
            CoreError::InvalidRegistryName(_) => "INVALID_ARGUMENT",
            CoreError::SsrfBlocked(_) => "SSRF_BLOCKED",
            CoreError::InvalidArgument(_) => "INVALID_ARGUMENT",
        }
    }
}

/// The shape of every user-visible error in a tool response (spec §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorPayload {
    pub fn new(message: impl Into<String>, code: &'static str) -> Self {
        Self {
            error: message.into(),
            error_code: code.to_string(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn from_error(err: &(impl std::error::Error + ErrorCode)) -> Self {
        Self::new(err.to_string(), err.error_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_maps_to_stable_code() {
        let err = CoreError::ConfigInvalid("missing name".into());
        assert_eq!(err.error_code(), "CONFIG_INVALID");
    }

    #[test]
    fn error_payload_omits_details_when_absent() {
        let payload = ErrorPayload::new("boom", "INTERNAL_ERROR");
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("details").is_none());
    }

    #[test]
    fn error_payload_from_error_uses_code_and_message() {
        let err = CoreError::SsrfBlocked("http://169.254.169.254".into());
        let payload = ErrorPayload::from_error(&err);
        assert_eq!(payload.error_code, "SSRF_BLOCKED");
        assert!(payload.error.contains("169.254.169.254"));
    }
}
