//! Built-in step handlers
//!
//! Data collection, preprocessing, postprocessing and notification return
//! deterministic descriptions of the work they stand for, so orchestration
//! can run without real I/O. Production deployments register real
//! collaborators for these types behind the same [`StepHandler`] contract.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::models::workflow::{StepType, WorkflowType};
use crate::steps::handler::{StepError, StepHandler, StepInput, StepOutput};

/// Turn a `json!` object literal into a step output
pub(crate) fn into_output(value: Value) -> StepOutput {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = StepOutput::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Imagery collection
pub struct DataCollectionHandler;

#[async_trait]
impl StepHandler for DataCollectionHandler {
    async fn execute(&self, input: StepInput<'_>) -> Result<StepOutput, StepError> {
        debug!("Data collection for workflow {}", input.workflow_id);

        let source = input
            .parameters
            .get("dataSource")
            .map(String::as_str)
            .unwrap_or("satellite_imagery");

        Ok(into_output(json!({
            "dataCollected": true,
            "dataSource": source,
            "imageCount": 12,
            "dataSizeMb": 256.5,
            "format": "GeoTIFF",
        })))
    }

    fn step_type(&self) -> StepType {
        StepType::DataCollection
    }
}

/// Cleaning and normalization
pub struct PreprocessingHandler;

#[async_trait]
impl StepHandler for PreprocessingHandler {
    async fn execute(&self, input: StepInput<'_>) -> Result<StepOutput, StepError> {
        let input_images = input
            .context
            .get("imageCount")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        debug!("Preprocessing {} images", input_images);

        Ok(into_output(json!({
            "preprocessed": true,
            "inputImages": input_images,
            "operations": ["cloud_masking", "atmospheric_correction", "normalization"],
            "cloudCoverage": 8.5,
        })))
    }

    fn step_type(&self) -> StepType {
        StepType::Preprocessing
    }
}

/// Model inference; the canned summary depends on the workflow type
pub struct AiAnalysisHandler;

impl AiAnalysisHandler {
    fn summary(workflow_type: Option<WorkflowType>) -> Value {
        match workflow_type {
            Some(WorkflowType::EnvironmentalMonitoring) => json!({
                "analysisType": "Environmental Monitoring",
                "vegetationIndex": 0.72,
                "waterQuality": "Good",
                "changePercentage": 5.3,
                "confidenceScore": 0.91,
            }),
            Some(WorkflowType::AssetTracking) => json!({
                "analysisType": "Asset Tracking",
                "assetsDetected": 15,
                "assetsMoved": 2,
                "confidenceScore": 0.94,
            }),
            Some(WorkflowType::AnomalyDetection) => json!({
                "analysisType": "Anomaly Detection",
                "anomaliesFound": 3,
                "confidenceScore": 0.87,
                "alertLevel": "Medium",
            }),
            Some(WorkflowType::ChangeDetection) => json!({
                "analysisType": "Change Detection",
                "changedAreas": 7,
                "changePercentage": 12.5,
                "confidenceScore": 0.89,
            }),
            Some(WorkflowType::Classification) => json!({
                "analysisType": "Classification",
                "classes": {
                    "urban": 0.35,
                    "vegetation": 0.45,
                    "water": 0.12,
                    "bare_soil": 0.08,
                },
                "confidenceScore": 0.92,
            }),
            _ => json!({
                "analysisType": "Generic Analysis",
                "result": "analysis completed",
                "confidenceScore": 0.8,
            }),
        }
    }
}

#[async_trait]
impl StepHandler for AiAnalysisHandler {
    async fn execute(&self, input: StepInput<'_>) -> Result<StepOutput, StepError> {
        debug!(
            "AI analysis for workflow {} ({:?})",
            input.workflow_id, input.workflow_type
        );
        Ok(into_output(Self::summary(input.workflow_type)))
    }

    fn step_type(&self) -> StepType {
        StepType::AiAnalysis
    }
}

/// Map and report rendering
pub struct PostprocessingHandler;

#[async_trait]
impl StepHandler for PostprocessingHandler {
    async fn execute(&self, _input: StepInput<'_>) -> Result<StepOutput, StepError> {
        Ok(into_output(json!({
            "postprocessed": true,
            "outputFormat": "GeoJSON",
            "mapGenerated": true,
            "reportGenerated": true,
        })))
    }

    fn step_type(&self) -> StepType {
        StepType::Postprocessing
    }
}

/// Completion notice
pub struct NotificationHandler;

#[async_trait]
impl StepHandler for NotificationHandler {
    async fn execute(&self, input: StepInput<'_>) -> Result<StepOutput, StepError> {
        let recipients: Vec<&str> = input
            .parameters
            .get("recipients")
            .map(|r| r.split(',').map(str::trim).filter(|r| !r.is_empty()).collect())
            .unwrap_or_else(|| vec!["operations@geoflow.dev"]);

        Ok(into_output(json!({
            "notificationSent": true,
            "channel": "email",
            "recipients": recipients,
            "message": format!("Workflow '{}' finished processing", input.workflow_name),
        })))
    }

    fn step_type(&self) -> StepType {
        StepType::Notification
    }
}
