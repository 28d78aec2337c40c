//! Workflow runner

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use crate::errors::EngineError;
use crate::execute::executor::{StepExecutor, StepFailure, StepOutcome};
use crate::execute::fsm::{WorkflowEvent, WorkflowFsm};
use crate::execute::recorder::ResultRecorder;
use crate::models::result::{AnalysisResult, ResultStatus};
use crate::models::workflow::{Workflow, WorkflowStatus};
use crate::store::{ResultStore, WorkflowStore};

const NO_STEPS_ERROR: &str = "No steps defined in workflow";

/// What the step loop produced
#[derive(Debug, Default)]
struct StepRun {
    step_results: Vec<Value>,
    confidence_score: Option<f64>,
    failed_step: Option<StepFailure>,
    error: Option<String>,
}

impl StepRun {
    fn succeeded(&self) -> bool {
        self.failed_step.is_none() && self.error.is_none()
    }

    fn into_result_data(self, total_steps: usize) -> Map<String, Value> {
        let succeeded = self.succeeded();
        let completed_steps = self.step_results.len();

        let mut data = Map::new();
        data.insert("stepResults".to_string(), Value::Array(self.step_results));
        data.insert("totalSteps".to_string(), json!(total_steps));
        data.insert("completedSteps".to_string(), json!(completed_steps));

        if succeeded {
            return data;
        }

        let error = match (&self.failed_step, self.error) {
            (_, Some(error)) => error,
            (Some(failure), None) => {
                format!("Step {} failed: {}", failure.step_name, failure.error)
            }
            (None, None) => "Workflow execution failed".to_string(),
        };
        data.insert("error".to_string(), json!(error));
        if let Some(failure) = &self.failed_step {
            data.insert("failedStep".to_string(), failure.to_entry());
        }
        data
    }
}

/// Executes every step of a workflow and produces its analysis result
#[derive(Clone)]
pub struct WorkflowRunner {
    workflows: Arc<dyn WorkflowStore>,
    results: Arc<dyn ResultStore>,
    executor: StepExecutor,
    recorder: ResultRecorder,
}

impl WorkflowRunner {
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        results: Arc<dyn ResultStore>,
        executor: StepExecutor,
        recorder: ResultRecorder,
    ) -> Self {
        Self {
            workflows,
            results,
            executor,
            recorder,
        }
    }

    /// Run a workflow once and return its terminal result.
    ///
    /// Fails only if the workflow does not exist or the initial result and
    /// workflow records cannot be written. Every later failure is captured
    /// in a FAILED result.
    pub async fn execute(&self, workflow_id: &str) -> Result<AnalysisResult, EngineError> {
        let mut workflow = self
            .workflows
            .find_by_id(workflow_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Workflow {}", workflow_id)))?;

        let mut fsm = WorkflowFsm::from_status(Self::resumable_status(&workflow));
        workflow.status = fsm.process(WorkflowEvent::Start)?;

        let started_at = Utc::now();
        let mut result = AnalysisResult::start(&workflow, started_at);
        self.results.save(&result).await?;

        workflow.last_run_at = Some(started_at);
        for step in workflow.steps.iter_mut() {
            step.reset();
        }
        self.workflows.save(&workflow).await?;

        info!(
            workflow_id = %workflow.id,
            result_id = %result.id,
            "Starting workflow {} with {} steps",
            workflow.name,
            workflow.steps.len()
        );

        let run = self.run_steps(&mut workflow).await;
        let succeeded = run.succeeded();
        let total_steps = workflow.steps.len();

        result.confidence_score = run.confidence_score;
        result.result_data = run.into_result_data(total_steps);

        let (result_status, event) = if succeeded {
            (ResultStatus::Completed, WorkflowEvent::Complete)
        } else {
            (ResultStatus::Failed, WorkflowEvent::Fail)
        };
        result.finish(result_status, Utc::now());
        workflow.status = fsm.process(event)?;

        if let Err(e) = self.recorder.record(&workflow, &result).await {
            error!(
                workflow_id = %workflow.id,
                "Failed to record execution result {}: {}", result.id, e
            );
        }

        match result.error() {
            None => info!(
                workflow_id = %workflow.id,
                "Workflow {} completed in {} ms",
                workflow.name,
                result.processing_time_ms
            ),
            Some(err) => warn!(
                workflow_id = %workflow.id,
                "Workflow {} failed: {}", workflow.name, err
            ),
        }

        Ok(result)
    }

    /// Claims keep two executions of one workflow apart, so a stored
    /// RUNNING status can only be left over from an interrupted process.
    pub(crate) fn resumable_status(workflow: &Workflow) -> WorkflowStatus {
        match workflow.status {
            WorkflowStatus::Running => {
                warn!(
                    workflow_id = %workflow.id,
                    "Workflow was left RUNNING by an earlier execution"
                );
                WorkflowStatus::Failed
            }
            status => status,
        }
    }

    async fn run_steps(&self, workflow: &mut Workflow) -> StepRun {
        let mut run = StepRun::default();

        if workflow.steps.is_empty() {
            run.error = Some(NO_STEPS_ERROR.to_string());
            return run;
        }

        let mut context = Map::new();

        for index in 0..workflow.steps.len() {
            let mut step = workflow.steps[index].clone();
            let outcome = self.executor.execute(workflow, &mut step, &context).await;
            let step_name = step.name.clone();
            let step_type = step.step_type.map(|t| t.as_str()).unwrap_or("UNKNOWN");
            let step_status = step.status;
            workflow.steps[index] = step;

            match outcome {
                StepOutcome::Completed(output) => {
                    if let Some(score) = output.get("confidenceScore").and_then(|v| v.as_f64()) {
                        run.confidence_score = Some(score);
                    }

                    let mut entry = output.clone();
                    entry.insert("stepName".to_string(), json!(step_name));
                    entry.insert("stepType".to_string(), json!(step_type));
                    entry.insert("status".to_string(), json!(step_status.as_str()));
                    run.step_results.push(Value::Object(entry));

                    context.extend(output);
                }
                StepOutcome::Failed(failure) => {
                    run.failed_step = Some(failure);
                    break;
                }
            }

            if let Err(e) = self.workflows.save(workflow).await {
                run.error = Some(format!(
                    "Failed to persist progress after step {}: {}",
                    step_name, e
                ));
                break;
            }
        }

        run
    }
}
