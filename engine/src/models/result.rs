//! Analysis result models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::workflow::{TimeRange, Workflow};

/// Durable record of one workflow execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Unique result ID
    pub id: String,

    /// Owning workflow
    pub workflow_id: String,

    /// Execution start
    pub execution_date: DateTime<Utc>,

    /// Set once by the terminal write
    pub completion_date: Option<DateTime<Utc>>,

    pub status: ResultStatus,

    /// Wall-clock duration of the execution
    pub processing_time_ms: i64,

    /// Per-step outputs and execution summary
    pub result_data: Map<String, Value>,

    pub confidence_score: Option<f64>,

    /// Copied from the workflow at execution start
    pub area_of_interest: Option<Value>,

    /// Copied from the workflow at execution start
    pub time_range: Option<TimeRange>,
}

impl AnalysisResult {
    /// Open a PROCESSING result for an execution of `workflow`
    pub fn start(workflow: &Workflow, execution_date: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow.id.clone(),
            execution_date,
            completion_date: None,
            status: ResultStatus::Processing,
            processing_time_ms: 0,
            result_data: Map::new(),
            confidence_score: None,
            area_of_interest: workflow.area_of_interest.clone(),
            time_range: workflow.time_range.clone(),
        }
    }

    /// True once the terminal write happened
    pub fn is_finished(&self) -> bool {
        self.completion_date.is_some()
    }

    /// Close the result with a terminal status
    pub fn finish(&mut self, status: ResultStatus, completion_date: DateTime<Utc>) {
        self.status = status;
        self.completion_date = Some(completion_date);
        self.processing_time_ms = (completion_date - self.execution_date)
            .num_milliseconds()
            .max(0);
    }

    /// Ordered per-step results
    pub fn step_results(&self) -> &[Value] {
        self.result_data
            .get("stepResults")
            .and_then(|v| v.as_array())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Top-level error message, if the execution failed
    pub fn error(&self) -> Option<&str> {
        self.result_data.get("error").and_then(|v| v.as_str())
    }
}

/// Analysis result status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    Processing,
    Completed,
    Failed,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Processing => "PROCESSING",
            ResultStatus::Completed => "COMPLETED",
            ResultStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResultStatus::Processing)
    }
}
