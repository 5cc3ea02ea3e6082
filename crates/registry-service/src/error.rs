//! Errors raised above the client layer: registry lookup, tasks, migration
//! state, and batch/compare orchestration (spec §7).

use registry_core::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] registry_core::CoreError),

    #[error(transparent)]
    Client(#[from] registry_client::ClientError),

    #[error("registry not found: {0}")]
    RegistryNotFound(String),

    #[error("registry {0} is busy with another migration")]
    RegistryBusy(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("task {0} is already in a terminal state")]
    TaskAlreadyTerminal(String),

    #[error("task {0} exceeded its wall-clock timeout")]
    TaskTimeout(String),

    #[error("task {0} was cancelled")]
    TaskCancelled(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorCode for ServiceError {
    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::Core(inner) => inner.error_code(),
            ServiceError::Client(inner) => inner.error_code(),
            ServiceError::RegistryNotFound(_) => "REGISTRY_NOT_FOUND",
            ServiceError::RegistryBusy(_) => "REGISTRY_BUSY",
            ServiceError::TaskNotFound(_) => "TASK_NOT_FOUND",
            ServiceError::TaskAlreadyTerminal(_) => "TASK_ALREADY_TERMINAL",
            ServiceError::TaskTimeout(_) => "TASK_TIMEOUT",
            ServiceError::TaskCancelled(_) => "TASK_CANCELLED",
            ServiceError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
