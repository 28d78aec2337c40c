//! Step executor

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::models::workflow::{Step, StepStatus, Workflow};
use crate::steps::handler::{StepError, StepInput, StepOutput};
use crate::steps::registry::HandlerRegistry;

/// Terminal failure of one step
#[derive(Debug, Clone, PartialEq)]
pub struct StepFailure {
    pub step_name: String,
    pub error: StepError,
}

impl StepFailure {
    /// Error entry recorded in the result data
    pub fn to_entry(&self) -> Value {
        json!({
            "stepName": self.step_name,
            "status": StepStatus::Failed.as_str(),
            "error": self.error.to_string(),
        })
    }
}

/// Outcome of one step execution
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Completed(StepOutput),
    Failed(StepFailure),
}

impl StepOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, StepOutcome::Completed(_))
    }
}

/// Runs single steps through the handler registry with immediate retry
#[derive(Clone)]
pub struct StepExecutor {
    registry: Arc<HandlerRegistry>,
}

impl StepExecutor {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Execute `step` on behalf of `workflow`.
    ///
    /// The step's status and retry counter are updated in place. Retryable
    /// failures are retried while `retry_count < max_retries`; configuration
    /// errors fail the step on the first attempt.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        step: &mut Step,
        context: &Map<String, Value>,
    ) -> StepOutcome {
        step.status = StepStatus::Running;

        let handler = match self.registry.resolve(step.step_type) {
            Ok(handler) => handler,
            Err(e) => return Self::fail(step, e),
        };

        loop {
            debug!(
                "Executing step {} of workflow {} (attempt {})",
                step.name,
                workflow.id,
                step.retry_count + 1
            );

            let result = handler
                .execute(StepInput::new(workflow, step, context))
                .await;

            match result {
                Ok(output) => {
                    step.status = StepStatus::Completed;
                    return StepOutcome::Completed(output);
                }
                Err(e) if e.is_retryable() && step.retry_count < step.max_retries => {
                    step.retry_count += 1;
                    warn!(
                        "Step {} failed, retrying ({}/{}): {}",
                        step.name, step.retry_count, step.max_retries, e
                    );
                }
                Err(e) => return Self::fail(step, e),
            }
        }
    }

    fn fail(step: &mut Step, error: StepError) -> StepOutcome {
        warn!("Step {} failed: {}", step.name, error);
        step.status = StepStatus::Failed;
        StepOutcome::Failed(StepFailure {
            step_name: step.name.clone(),
            error,
        })
    }
}
