//! The MCP surface's own error cases layered on top of the service and
//! client error taxonomies (spec §4.4, §7).

use registry_core::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error(transparent)]
    Service(#[from] registry_service::ServiceError),

    #[error(transparent)]
    Client(#[from] registry_client::ClientError),

    #[error(transparent)]
    Core(#[from] registry_core::CoreError),

    #[error("scope {required} is required for this tool")]
    InsufficientScope { required: registry_core::Scope },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("unknown resource uri: {0}")]
    UnknownResource(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ErrorCode for McpError {
    fn error_code(&self) -> &'static str {
        match self {
            McpError::Service(inner) => inner.error_code(),
            McpError::Client(inner) => inner.error_code(),
            McpError::Core(inner) => inner.error_code(),
            McpError::InsufficientScope { .. } => "INSUFFICIENT_SCOPE",
            McpError::UnknownTool(_) => "INVALID_ARGUMENT",
            McpError::UnknownResource(_) => "INVALID_ARGUMENT",
            McpError::InvalidArgument(_) => "INVALID_ARGUMENT",
        }
    }
}

impl McpError {
    pub fn to_payload(&self) -> registry_core::ErrorPayload {
        registry_core::ErrorPayload::new(self.to_string(), self.error_code())
    }
}

pub type McpResult<T> = Result<T, McpError>;
