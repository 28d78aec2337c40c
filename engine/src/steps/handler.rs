//! Step handler contract

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::errors::EngineError;
use crate::models::workflow::{Step, StepType, Workflow, WorkflowType};

/// Output map produced by one step, merged into the context by the runner
pub type StepOutput = Map<String, Value>;

/// Read-only view handed to a step handler
#[derive(Debug, Clone, Copy)]
pub struct StepInput<'a> {
    pub workflow_id: &'a str,
    pub workflow_name: &'a str,

    /// Type of the owning workflow, not of the step
    pub workflow_type: Option<WorkflowType>,

    pub parameters: &'a HashMap<String, String>,
    pub step: &'a Step,

    /// Accumulated outputs of the steps before this one
    pub context: &'a Map<String, Value>,
}

impl<'a> StepInput<'a> {
    pub fn new(workflow: &'a Workflow, step: &'a Step, context: &'a Map<String, Value>) -> Self {
        Self {
            workflow_id: &workflow.id,
            workflow_name: &workflow.name,
            workflow_type: workflow.workflow_type,
            parameters: &workflow.parameters,
            step,
            context,
        }
    }
}

/// Step handler failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// Not retried
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Retried up to the step's budget
    #[error("{0}")]
    Failed(String),
}

impl StepError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StepError::Failed(_))
    }
}

impl From<StepError> for EngineError {
    fn from(err: StepError) -> Self {
        match err {
            StepError::InvalidConfiguration(msg) => EngineError::InvalidConfiguration(msg),
            StepError::Failed(msg) => EngineError::StepFailed(msg),
        }
    }
}

/// Computation behind one step type
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Execute the step against a read-only context
    async fn execute(&self, input: StepInput<'_>) -> Result<StepOutput, StepError>;

    /// Get the step type this handler serves
    fn step_type(&self) -> StepType;
}
