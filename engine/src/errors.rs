//! Error types for the geoflow engine

use thiserror::Error;

/// Main error type for the geoflow engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// A referenced workflow, result or model does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unknown step type, missing step type or unusable step configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Step failed: {0}")]
    StepFailed(String),

    #[error("Remote invocation error: {0}")]
    RemoteInvocation(String),

    /// The workflow is already claimed by another execution
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Storage error: {0}")]
    StoreError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Internal(err.to_string())
    }
}
