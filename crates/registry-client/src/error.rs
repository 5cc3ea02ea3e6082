//! Errors raised by a single registry client operation (spec §4.1, §7).

use registry_core::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("registry is unreachable: {0}")]
    RegistryUnreachable(String),

    #[error("registry request timed out after {0:?}")]
    RegistryTimeout(std::time::Duration),

    #[error("registry authentication failed")]
    RegistryAuthFailed,

    #[error("registry is view-only; mutating operations are rejected")]
    RegistryViewonly,

    #[error("subject not found: {0}")]
    SubjectNotFound(String),

    #[error("context not found: {0}")]
    ContextNotFound(String),

    #[error("registering with an explicit id requires IMPORT mode on the target")]
    ModeConflict,

    #[error("schema id {0} is already registered under a different schema")]
    IdCollision(i64),

    #[error("schema is incompatible with the subject's compatibility policy: {0}")]
    SchemaIncompatible(String),

    #[error("url rejected: {0}")]
    SsrfBlocked(#[from] registry_core::CoreError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unexpected registry response: {0}")]
    Internal(String),
}

impl ErrorCode for ClientError {
    fn error_code(&self) -> &'static str {
        match self {
            ClientError::RegistryUnreachable(_) => "REGISTRY_UNREACHABLE",
            ClientError::RegistryTimeout(_) => "REGISTRY_TIMEOUT",
            ClientError::RegistryAuthFailed => "REGISTRY_AUTH_FAILED",
            ClientError::RegistryViewonly => "REGISTRY_VIEWONLY",
            ClientError::SubjectNotFound(_) => "SUBJECT_NOT_FOUND",
            ClientError::ContextNotFound(_) => "CONTEXT_NOT_FOUND",
            ClientError::ModeConflict => "MODE_CONFLICT",
            ClientError::IdCollision(_) => "ID_COLLISION",
            ClientError::SchemaIncompatible(_) => "SCHEMA_INCOMPATIBLE",
            ClientError::SsrfBlocked(inner) => inner.error_code(),
            ClientError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ClientError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
