//! Workflow runner tests

use std::sync::Arc;

use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use geoflow::errors::EngineError;
use geoflow::models::result::ResultStatus;
use geoflow::models::workflow::{Step, StepStatus, StepType, Workflow, WorkflowStatus, WorkflowType};
use geoflow::steps::handler::StepHandler;
use geoflow::store::ResultStore;

use crate::common::{anomaly_workflow, AlwaysFailingHandler, Harness, Reply};

#[tokio::test]
async fn test_all_steps_succeed() {
    let harness = Harness::new();
    let workflow = anomaly_workflow()
        .with_step(Step::new("render", StepType::Postprocessing))
        .with_step(Step::new("notify", StepType::Notification));
    harness.insert(&workflow).await;

    let result = assert_ok!(harness.runner.execute(&workflow.id).await);

    assert_eq!(result.status, ResultStatus::Completed);
    assert!(result.error().is_none());
    assert_eq!(result.result_data["totalSteps"], 5);
    assert_eq!(result.result_data["completedSteps"], 5);

    let names: Vec<&str> = result
        .step_results()
        .iter()
        .map(|s| s["stepName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["collect", "prepare", "analyze", "render", "notify"]);
    assert!(result
        .step_results()
        .iter()
        .all(|s| s["status"] == "COMPLETED"));

    assert!(result.completion_date.is_some());
    assert!(result.processing_time_ms >= 0);
    assert_eq!(result.area_of_interest, workflow.area_of_interest);

    let stored = harness.load(&workflow.id).await;
    assert_eq!(stored.status, WorkflowStatus::Completed);
    assert_eq!(stored.last_run_at, Some(result.execution_date));
    assert!(stored.steps.iter().all(|s| s.status == StepStatus::Completed));

    let persisted = harness.results.find_by_id(&result.id).await.unwrap().unwrap();
    assert_eq!(persisted.status, ResultStatus::Completed);

    let samples = harness.metrics.samples();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].workflow_type, Some(WorkflowType::AnomalyDetection));
    assert_eq!(samples[0].duration_ms, result.processing_time_ms);
}

#[tokio::test]
async fn test_anomaly_detection_scenario() {
    let harness = Harness::new();
    let workflow = anomaly_workflow();
    harness.insert(&workflow).await;

    let result = harness.runner.execute(&workflow.id).await.unwrap();

    assert_eq!(result.status, ResultStatus::Completed);
    let steps = result.step_results();
    assert_eq!(steps.len(), 3);

    let analysis = &steps[2];
    assert_eq!(analysis["stepName"], "analyze");
    assert_eq!(analysis["stepType"], "AI_ANALYSIS");
    assert_eq!(analysis["analysisType"], "Anomaly Detection");
    assert_eq!(analysis["anomaliesFound"], 3);
    assert_eq!(analysis["confidenceScore"], 0.87);
    assert_eq!(analysis["alertLevel"], "Medium");
    assert_eq!(result.confidence_score, Some(0.87));
}

#[tokio::test]
async fn test_later_steps_see_earlier_outputs() {
    let harness = Harness::new();
    let workflow = anomaly_workflow();
    harness.insert(&workflow).await;

    let result = harness.runner.execute(&workflow.id).await.unwrap();

    // Preprocessing reads the image count published by data collection
    assert_eq!(result.step_results()[0]["imageCount"], 12);
    assert_eq!(result.step_results()[1]["inputImages"], 12);
}

#[tokio::test]
async fn test_always_failing_step_exhausts_retries() {
    let failing = Arc::new(AlwaysFailingHandler::new(StepType::Postprocessing));
    let handler: Arc<dyn StepHandler> = failing.clone();
    let harness = Harness::with_handlers(vec![handler]);

    let workflow = Workflow::new("Flood maps", Some(WorkflowType::ChangeDetection))
        .with_step(Step::new("collect", StepType::DataCollection))
        .with_step(Step::new("render", StepType::Postprocessing).with_max_retries(3))
        .with_step(Step::new("notify", StepType::Notification));
    harness.insert(&workflow).await;

    let result = harness.runner.execute(&workflow.id).await.unwrap();

    assert_eq!(result.status, ResultStatus::Failed);
    assert_eq!(failing.attempts(), 4);
    assert_eq!(result.result_data["completedSteps"], 1);
    assert_eq!(result.result_data["totalSteps"], 3);
    assert_eq!(result.result_data["failedStep"]["stepName"], "render");
    assert_eq!(result.result_data["failedStep"]["status"], "FAILED");
    assert!(result.error().unwrap().contains("render"));

    let stored = harness.load(&workflow.id).await;
    assert_eq!(stored.status, WorkflowStatus::Failed);
    assert_eq!(stored.steps[1].retry_count, stored.steps[1].max_retries);
    assert_eq!(stored.steps[1].status, StepStatus::Failed);
    assert_eq!(stored.steps[2].status, StepStatus::Pending);
}

#[tokio::test]
async fn test_zero_steps_fails() {
    let harness = Harness::new();
    let workflow = Workflow::new("Empty", Some(WorkflowType::Classification));
    harness.insert(&workflow).await;

    let result = harness.runner.execute(&workflow.id).await.unwrap();

    assert_eq!(result.status, ResultStatus::Failed);
    assert_eq!(result.error(), Some("No steps defined in workflow"));
    assert_eq!(result.result_data["totalSteps"], 0);
    assert_eq!(harness.load(&workflow.id).await.status, WorkflowStatus::Failed);
    assert_eq!(harness.metrics.samples().len(), 1);
}

#[tokio::test]
async fn test_rerun_creates_independent_result() {
    let harness = Harness::new();
    let workflow = anomaly_workflow();
    harness.insert(&workflow).await;

    let first = harness.runner.execute(&workflow.id).await.unwrap();
    assert_eq!(harness.load(&workflow.id).await.status, WorkflowStatus::Completed);

    let second = harness.runner.execute(&workflow.id).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(second.status, ResultStatus::Completed);

    let history = harness
        .results
        .find_by_workflow_order_by_date_desc(&workflow.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id);
    assert_eq!(history[1].status, ResultStatus::Completed);
}

#[tokio::test]
async fn test_missing_workflow_is_not_found() {
    let harness = Harness::new();

    let err = assert_err!(harness.runner.execute("does-not-exist").await);
    assert!(matches!(err, EngineError::NotFound(_)));
    assert!(harness.results.is_empty());
}

#[tokio::test]
async fn test_null_lambda_configuration_fails_without_retry() {
    let harness = Harness::new();
    let workflow = Workflow::new("Lambda", None)
        .with_step(Step::new("invoke", StepType::LambdaFunction));
    harness.insert(&workflow).await;

    let result = harness.runner.execute(&workflow.id).await.unwrap();

    assert_eq!(result.status, ResultStatus::Failed);
    assert!(harness.invoker.calls().is_empty());

    let stored = harness.load(&workflow.id).await;
    assert_eq!(stored.steps[0].retry_count, 0);
    assert_eq!(stored.steps[0].status, StepStatus::Failed);
}

#[tokio::test]
async fn test_lambda_token_configuration() {
    let harness = Harness::new();
    harness.invoker.reply(
        "proc-img",
        Reply::Body(json!({"tiles": 42}).to_string()),
    );

    let workflow = Workflow::new("Tiling", Some(WorkflowType::Segmentation))
        .with_step(Step::new("collect", StepType::DataCollection))
        .with_step(
            Step::new("tile", StepType::LambdaFunction)
                .with_configuration("functionName=proc-img"),
        );
    harness.insert(&workflow).await;

    let result = harness.runner.execute(&workflow.id).await.unwrap();
    assert_eq!(result.status, ResultStatus::Completed);

    let output = &result.step_results()[1];
    assert_eq!(output["functionName"], "proc-img");
    assert_eq!(output["resolvedBy"], "token");
    assert_eq!(output["success"], true);
    assert_eq!(output["response"]["tiles"], 42);

    let calls = harness.invoker.calls();
    assert_eq!(calls.len(), 1);
    let (name, payload) = &calls[0];
    assert_eq!(name, "proc-img");
    assert_eq!(payload["workflowId"], workflow.id.as_str());
    assert_eq!(payload["stepName"], "tile");
    assert_eq!(payload["imageCount"], 12);
}

#[tokio::test]
async fn test_lambda_remote_failure_does_not_fail_workflow() {
    let harness = Harness::new();
    harness
        .invoker
        .reply("ndvi", Reply::Fail("503 Service Unavailable".to_string()));
    harness.invoker.reply("empty", Reply::Body(String::new()));

    let workflow = Workflow::new("Vegetation", Some(WorkflowType::EnvironmentalMonitoring))
        .with_step(
            Step::new("ndvi", StepType::LambdaFunction)
                .with_configuration(r#"{"functionName": "ndvi", "bands": ["B4", "B8"]}"#),
        )
        .with_step(Step::new("empty", StepType::LambdaFunction).with_configuration("empty"));
    harness.insert(&workflow).await;

    let result = harness.runner.execute(&workflow.id).await.unwrap();
    assert_eq!(result.status, ResultStatus::Completed);

    let failed_call = &result.step_results()[0];
    assert_eq!(failed_call["success"], false);
    assert_eq!(failed_call["resolvedBy"], "json");
    assert!(failed_call["error"].as_str().unwrap().contains("503"));

    let empty_call = &result.step_results()[1];
    assert_eq!(empty_call["success"], false);
    assert_eq!(empty_call["resolvedBy"], "whole");
    assert_eq!(empty_call["error"], "Empty response from function");

    let (_, payload) = &harness.invoker.calls()[0];
    assert_eq!(payload["bands"], json!(["B4", "B8"]));
}

#[tokio::test]
async fn test_unsupported_step_type_fails_immediately() {
    let harness = Harness::new();
    let workflow: Workflow = serde_json::from_value(json!({
        "id": "wf-legacy",
        "name": "Legacy",
        "type": "CUSTOM",
        "steps": [
            {"name": "collect", "type": "DATA_COLLECTION"},
            {"name": "teleport", "type": "TELEPORT"}
        ]
    }))
    .unwrap();
    harness.insert(&workflow).await;

    let result = harness.runner.execute("wf-legacy").await.unwrap();

    assert_eq!(result.status, ResultStatus::Failed);
    assert_eq!(result.result_data["completedSteps"], 1);
    assert!(result.result_data["failedStep"]["error"]
        .as_str()
        .unwrap()
        .contains("Unknown step type"));
    assert_eq!(harness.load("wf-legacy").await.steps[1].retry_count, 0);
}

#[tokio::test]
async fn test_stale_running_status_is_recovered() {
    let harness = Harness::new();
    let mut workflow = anomaly_workflow();
    workflow.status = WorkflowStatus::Running;
    harness.insert(&workflow).await;

    let result = harness.runner.execute(&workflow.id).await.unwrap();
    assert_eq!(result.status, ResultStatus::Completed);
    assert_eq!(harness.load(&workflow.id).await.status, WorkflowStatus::Completed);
}
