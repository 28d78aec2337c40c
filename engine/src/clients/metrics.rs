//! Metrics sinks

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::clients::MetricsSink;
use crate::models::workflow::WorkflowType;

/// Emits execution durations as structured tracing events
#[derive(Debug, Default)]
pub struct TracingMetricsSink;

#[async_trait]
impl MetricsSink for TracingMetricsSink {
    async fn record(&self, workflow_type: Option<WorkflowType>, duration_ms: i64) {
        let workflow_type = workflow_type.map(|t| t.as_str()).unwrap_or("UNKNOWN");
        info!(
            metric = "workflow.execution.duration",
            workflow_type,
            duration_ms,
            "Workflow execution recorded"
        );
    }
}

/// A recorded metric sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSample {
    pub workflow_type: Option<WorkflowType>,
    pub duration_ms: i64,
}

/// Keeps samples in memory
#[derive(Debug, Default)]
pub struct MemoryMetricsSink {
    samples: Mutex<Vec<MetricSample>>,
}

impl MemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded samples
    pub fn samples(&self) -> Vec<MetricSample> {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.clone()
    }
}

#[async_trait]
impl MetricsSink for MemoryMetricsSink {
    async fn record(&self, workflow_type: Option<WorkflowType>, duration_ms: i64) {
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.push(MetricSample {
            workflow_type,
            duration_ms,
        });
    }
}
