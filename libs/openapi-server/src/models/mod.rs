//! Engine control API models

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Error body returned with non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Workflow list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowListResponse {
    pub workflows: Vec<WorkflowSummary>,
    pub total: usize,
}

/// Workflow summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    pub workflow_type: Option<String>,
    pub status: String,
    pub is_active: bool,
    pub schedule_expression: Option<String>,
    pub next_scheduled_run: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub step_count: usize,
}

/// Step of a workflow creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRequest {
    pub name: String,

    /// Step type tag, e.g. `AI_ANALYSIS`
    pub step_type: String,

    #[serde(default)]
    pub configuration: Option<String>,

    #[serde(default)]
    pub max_retries: Option<u32>,
}

/// Workflow creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkflowRequest {
    pub name: String,

    /// Workflow type tag, e.g. `ANOMALY_DETECTION`
    #[serde(default)]
    pub workflow_type: Option<String>,

    #[serde(default)]
    pub schedule_expression: Option<String>,

    #[serde(default)]
    pub is_active: Option<bool>,

    /// GeoJSON geometry
    #[serde(default)]
    pub area_of_interest: Option<Value>,

    #[serde(default)]
    pub steps: Vec<StepRequest>,

    #[serde(default)]
    pub parameters: HashMap<String, String>,

    #[serde(default)]
    pub model_ids: Vec<String>,
}

/// Schedule request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Replaces the stored schedule expression when set
    #[serde(default)]
    pub expression: Option<String>,

    /// First run; defaults to the next run computed from the expression
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
}

/// Workflow control response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowControlResponse {
    pub success: bool,
    pub workflow_id: String,
    pub status: String,
    pub next_scheduled_run: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

/// Outcome of an on-demand execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub result_id: String,
    pub workflow_id: String,
    pub status: String,
    pub processing_time_ms: i64,
    pub confidence_score: Option<f64>,
    pub error: Option<String>,
    pub result_data: Value,
}

/// Analysis result summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSummary {
    pub id: String,
    pub workflow_id: String,
    pub status: String,
    pub execution_date: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
    pub processing_time_ms: i64,
    pub confidence_score: Option<f64>,
    pub completed_steps: u64,
    pub total_steps: u64,
}

/// Result list response, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultListResponse {
    pub results: Vec<ResultSummary>,
    pub total: usize,
}
