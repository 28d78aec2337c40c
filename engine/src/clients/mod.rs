//! Clients for services outside the engine

pub mod invoker;
pub mod metrics;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::EngineError;
use crate::models::workflow::WorkflowType;

/// Remote function invocation (Lambda-like)
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Invoke `function_name` with a JSON payload and return the raw response body.
    /// Transport failures are errors; an empty body is not.
    async fn invoke(&self, function_name: &str, payload: &Value) -> Result<String, EngineError>;
}

/// Execution duration metrics
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Record the duration of one workflow execution
    async fn record(&self, workflow_type: Option<WorkflowType>, duration_ms: i64);
}
