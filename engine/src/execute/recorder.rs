//! Result recorder

use std::sync::Arc;

use tracing::info;

use crate::clients::MetricsSink;
use crate::errors::EngineError;
use crate::models::result::AnalysisResult;
use crate::models::workflow::Workflow;
use crate::store::{ResultStore, WorkflowStore};

/// Persists terminal execution state and reports the duration metric
#[derive(Clone)]
pub struct ResultRecorder {
    workflows: Arc<dyn WorkflowStore>,
    results: Arc<dyn ResultStore>,
    metrics: Arc<dyn MetricsSink>,
}

impl ResultRecorder {
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        results: Arc<dyn ResultStore>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            workflows,
            results,
            metrics,
        }
    }

    /// Write the finished result, then the workflow, then emit the metric.
    /// The metric is skipped if either write fails.
    pub async fn record(
        &self,
        workflow: &Workflow,
        result: &AnalysisResult,
    ) -> Result<(), EngineError> {
        if !result.is_finished() {
            return Err(EngineError::Internal(format!(
                "Result {} recorded before completion",
                result.id
            )));
        }

        self.results.save(result).await?;
        self.workflows.save(workflow).await?;

        self.metrics
            .record(workflow.workflow_type, result.processing_time_ms)
            .await;

        info!(
            workflow_id = %workflow.id,
            result_id = %result.id,
            status = result.status.as_str(),
            duration_ms = result.processing_time_ms,
            "Recorded workflow execution"
        );
        Ok(())
    }
}
