//! Workflow models

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default retry budget for a step
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// A schedulable AI workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique workflow ID
    pub id: String,

    /// Workflow name
    pub name: String,

    /// Workflow category, drives the AI analysis output
    #[serde(default, rename = "type")]
    pub workflow_type: Option<WorkflowType>,

    /// Workflow status
    #[serde(default)]
    pub status: WorkflowStatus,

    /// Created timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Start of the most recent execution
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,

    /// Next due time, only meaningful while SCHEDULED
    #[serde(default)]
    pub next_scheduled_run: Option<DateTime<Utc>>,

    /// Schedule expression interpreted by the next-run policy
    #[serde(default)]
    pub schedule_expression: Option<String>,

    /// Inactive workflows are never selected by the scheduler
    #[serde(default = "default_true")]
    pub is_active: bool,

    /// Area of interest geometry (opaque to the engine)
    #[serde(default)]
    pub area_of_interest: Option<serde_json::Value>,

    /// Analysis time window
    #[serde(default)]
    pub time_range: Option<TimeRange>,

    /// Ordered steps
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Free-form workflow parameters
    #[serde(default)]
    pub parameters: HashMap<String, String>,

    /// Associated AI model references
    #[serde(default)]
    pub model_ids: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Workflow {
    /// Create a new workflow in CREATED state
    pub fn new(name: impl Into<String>, workflow_type: Option<WorkflowType>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            workflow_type,
            status: WorkflowStatus::Created,
            created_at: Utc::now(),
            last_run_at: None,
            next_scheduled_run: None,
            schedule_expression: None,
            is_active: true,
            area_of_interest: None,
            time_range: None,
            steps: Vec::new(),
            parameters: HashMap::new(),
            model_ids: Vec::new(),
        }
    }

    /// Append a step, keeping stored order
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// True when the workflow carries a non-empty schedule expression
    pub fn is_recurring(&self) -> bool {
        self.schedule_expression
            .as_deref()
            .map(|expr| !expr.trim().is_empty())
            .unwrap_or(false)
    }

    /// True when the scheduler should pick the workflow up at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self
                .next_scheduled_run
                .map(|next| next <= now)
                .unwrap_or(false)
    }
}

/// Workflow category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowType {
    EnvironmentalMonitoring,
    AssetTracking,
    AnomalyDetection,
    ChangeDetection,
    Classification,
    Segmentation,
    PredictiveMaintenance,
    Custom,
}

impl WorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::EnvironmentalMonitoring => "ENVIRONMENTAL_MONITORING",
            WorkflowType::AssetTracking => "ASSET_TRACKING",
            WorkflowType::AnomalyDetection => "ANOMALY_DETECTION",
            WorkflowType::ChangeDetection => "CHANGE_DETECTION",
            WorkflowType::Classification => "CLASSIFICATION",
            WorkflowType::Segmentation => "SEGMENTATION",
            WorkflowType::PredictiveMaintenance => "PREDICTIVE_MAINTENANCE",
            WorkflowType::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ENVIRONMENTAL_MONITORING" => Ok(WorkflowType::EnvironmentalMonitoring),
            "ASSET_TRACKING" => Ok(WorkflowType::AssetTracking),
            "ANOMALY_DETECTION" => Ok(WorkflowType::AnomalyDetection),
            "CHANGE_DETECTION" => Ok(WorkflowType::ChangeDetection),
            "CLASSIFICATION" => Ok(WorkflowType::Classification),
            "SEGMENTATION" => Ok(WorkflowType::Segmentation),
            "PREDICTIVE_MAINTENANCE" => Ok(WorkflowType::PredictiveMaintenance),
            "CUSTOM" => Ok(WorkflowType::Custom),
            _ => Err(format!("Invalid workflow type: {}", s)),
        }
    }
}

/// Workflow status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    #[default]
    Created,
    Scheduled,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Created => "CREATED",
            WorkflowStatus::Scheduled => "SCHEDULED",
            WorkflowStatus::Running => "RUNNING",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Failed => "FAILED",
            WorkflowStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Analysis time window, both bounds optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,

    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

/// A typed unit of work within a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Step name, unique within its workflow by convention
    pub name: String,

    /// Step type; `None` when the stored record has no type
    #[serde(default, rename = "type")]
    pub step_type: Option<StepType>,

    /// Type-specific configuration string
    #[serde(default)]
    pub configuration: Option<String>,

    #[serde(default)]
    pub status: StepStatus,

    #[serde(default)]
    pub retry_count: u32,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Step {
    /// Create a pending step
    pub fn new(name: impl Into<String>, step_type: StepType) -> Self {
        Self {
            name: name.into(),
            step_type: Some(step_type),
            configuration: None,
            status: StepStatus::Pending,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Set the configuration string
    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }

    /// Set the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Reset the step for a fresh execution
    pub fn reset(&mut self) {
        self.status = StepStatus::Pending;
        self.retry_count = 0;
    }
}

/// Step type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepType {
    DataCollection,
    Preprocessing,
    AiAnalysis,
    Postprocessing,
    Notification,
    LambdaFunction,

    /// Any tag the engine does not know
    #[serde(other)]
    Unsupported,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::DataCollection => "DATA_COLLECTION",
            StepType::Preprocessing => "PREPROCESSING",
            StepType::AiAnalysis => "AI_ANALYSIS",
            StepType::Postprocessing => "POSTPROCESSING",
            StepType::Notification => "NOTIFICATION",
            StepType::LambdaFunction => "LAMBDA_FUNCTION",
            StepType::Unsupported => "UNSUPPORTED",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step execution status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "PENDING",
            StepStatus::Running => "RUNNING",
            StepStatus::Completed => "COMPLETED",
            StepStatus::Failed => "FAILED",
        }
    }
}
