//! Control API tests

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use geoflow::server::serve::router;
use geoflow::server::state::ServerState;

use crate::common::{anomaly_workflow, Harness};

fn app(harness: &Harness) -> Router {
    router(Arc::new(ServerState::new(
        harness.workflows.clone(),
        harness.results.clone(),
        harness.scheduler.clone(),
    )))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let harness = Harness::new();
    let (status, body) = send(&app(&harness), "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "geoflow");
}

#[tokio::test]
async fn test_create_and_list_workflows() {
    let harness = Harness::new();
    let app = app(&harness);

    let (status, created) = send(
        &app,
        "POST",
        "/workflows",
        Some(json!({
            "name": "Port monitoring",
            "workflow_type": "asset_tracking",
            "schedule_expression": "daily",
            "steps": [
                {"step_type": "DATA_COLLECTION", "name": "collect"},
                {"step_type": "ai_analysis", "name": "analyze", "max_retries": 1}
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "CREATED");
    assert_eq!(created["workflow_type"], "ASSET_TRACKING");
    assert_eq!(created["step_count"], 2);

    let (status, list) = send(&app, "GET", "/workflows", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["workflows"][0]["id"], created["id"]);

    let uri = format!("/workflows/{}", created["id"].as_str().unwrap());
    let (status, workflow) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(workflow["steps"][1]["type"], "AI_ANALYSIS");
    assert_eq!(workflow["steps"][1]["maxRetries"], 1);
}

#[tokio::test]
async fn test_create_rejects_unknown_workflow_type() {
    let harness = Harness::new();
    let (status, body) = send(
        &app(&harness),
        "POST",
        "/workflows",
        Some(json!({"name": "Weather", "workflow_type": "FORECASTING"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("FORECASTING"));
    assert!(harness.workflows.is_empty());
}

#[tokio::test]
async fn test_missing_workflow() {
    let harness = Harness::new();
    let app = app(&harness);

    let (status, body) = send(&app, "GET", "/workflows/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());

    let (status, _) = send(&app, "POST", "/workflows/nope/execute", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/workflows/nope/results", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_execute_and_list_results() {
    let harness = Harness::new();
    let workflow = anomaly_workflow();
    harness.insert(&workflow).await;
    let app = app(&harness);

    let uri = format!("/workflows/{}/execute", workflow.id);
    let (status, execution) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(execution["status"], "COMPLETED");
    assert_eq!(execution["workflow_id"], workflow.id.as_str());
    assert_eq!(execution["confidence_score"], 0.87);
    assert!(execution["error"].is_null());
    assert_eq!(execution["result_data"]["completedSteps"], 3);

    let uri = format!("/workflows/{}/results", workflow.id);
    let (status, results) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["total"], 1);
    assert_eq!(results["results"][0]["id"], execution["result_id"]);
    assert_eq!(results["results"][0]["completed_steps"], 3);
    assert_eq!(results["results"][0]["total_steps"], 3);
}

#[tokio::test]
async fn test_schedule_and_cancel() {
    let harness = Harness::new();
    let workflow = anomaly_workflow();
    harness.insert(&workflow).await;
    let app = app(&harness);

    let uri = format!("/workflows/{}/schedule", workflow.id);
    let (status, scheduled) = send(&app, "POST", &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(scheduled["success"], true);
    assert_eq!(scheduled["status"], "SCHEDULED");
    assert!(scheduled["next_scheduled_run"].is_string());

    let uri = format!("/workflows/{}/cancel", workflow.id);
    let (status, cancelled) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "CREATED");
    assert!(cancelled["next_scheduled_run"].is_null());

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Invalid transition"));
}
