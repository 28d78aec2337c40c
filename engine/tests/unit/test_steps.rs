//! Step handler and executor tests

use std::sync::Arc;

use serde_json::{json, Map};
use tokio_test::assert_ok;

use geoflow::execute::executor::{StepExecutor, StepOutcome};
use geoflow::models::workflow::{Step, StepStatus, StepType, Workflow, WorkflowType};
use geoflow::steps::handler::{StepError, StepHandler, StepInput};
use geoflow::steps::lambda::LambdaHandler;
use geoflow::steps::registry::HandlerRegistry;

use crate::common::{AlwaysFailingHandler, Reply, ScriptedInvoker};

#[test]
fn test_registry_resolution() {
    let registry = HandlerRegistry::with_builtins(Arc::new(ScriptedInvoker::new()));

    let handler = assert_ok!(registry.resolve(Some(StepType::AiAnalysis)));
    assert_eq!(handler.step_type(), StepType::AiAnalysis);

    let err = registry.resolve(Some(StepType::Unsupported)).err().unwrap();
    assert_eq!(
        err,
        StepError::InvalidConfiguration("Unknown step type: UNSUPPORTED".to_string())
    );
    assert!(!err.is_retryable());

    let err = registry.resolve(None).err().unwrap();
    assert!(matches!(err, StepError::InvalidConfiguration(_)));
}

#[test]
fn test_registry_override_replaces_builtin() {
    let mut registry = HandlerRegistry::with_builtins(Arc::new(ScriptedInvoker::new()));
    let failing = Arc::new(AlwaysFailingHandler::new(StepType::Notification));
    registry.register(failing);

    assert_eq!(registry.step_types().len(), 6);
}

#[tokio::test]
async fn test_notification_uses_parameters() {
    let registry = HandlerRegistry::with_builtins(Arc::new(ScriptedInvoker::new()));
    let handler = registry.resolve(Some(StepType::Notification)).unwrap();

    let mut workflow = Workflow::new("Wildfire watch", Some(WorkflowType::EnvironmentalMonitoring));
    workflow
        .parameters
        .insert("recipients".to_string(), "ops@example.org, gis@example.org".to_string());
    let step = Step::new("notify", StepType::Notification);
    let context = Map::new();

    let output = assert_ok!(handler.execute(StepInput::new(&workflow, &step, &context)).await);
    assert_eq!(output["notificationSent"], true);
    assert_eq!(output["recipients"], json!(["ops@example.org", "gis@example.org"]));
    assert!(output["message"].as_str().unwrap().contains("Wildfire watch"));
}

#[tokio::test]
async fn test_lambda_payload_merges_context_and_configuration() {
    let invoker = Arc::new(ScriptedInvoker::new());
    invoker.reply("change-mask", Reply::Body("not json".to_string()));
    let handler = LambdaHandler::new(invoker.clone());

    let workflow = Workflow::new("Coastline", Some(WorkflowType::ChangeDetection));
    let step = Step::new("mask", StepType::LambdaFunction)
        .with_configuration(r#"{"functionName": "change-mask", "imageCount": 2}"#);
    let mut context = Map::new();
    context.insert("imageCount".to_string(), json!(12));
    context.insert("format".to_string(), json!("GeoTIFF"));

    let output = assert_ok!(handler.execute(StepInput::new(&workflow, &step, &context)).await);
    assert_eq!(output["success"], true);
    assert_eq!(output["response"], "not json");

    let (_, payload) = &invoker.calls()[0];
    // Configuration wins over context
    assert_eq!(payload["imageCount"], 2);
    assert_eq!(payload["format"], "GeoTIFF");
    assert_eq!(payload["workflowId"], workflow.id.as_str());
}

#[tokio::test]
async fn test_executor_retry_budget() {
    let failing = Arc::new(AlwaysFailingHandler::new(StepType::Preprocessing));
    let mut registry = HandlerRegistry::new();
    registry.register(failing.clone());
    let executor = StepExecutor::new(Arc::new(registry));

    let workflow = Workflow::new("Retries", None);
    let mut step = Step::new("prepare", StepType::Preprocessing).with_max_retries(2);

    let outcome = executor.execute(&workflow, &mut step, &Map::new()).await;

    let StepOutcome::Failed(failure) = outcome else {
        panic!("expected the step to fail");
    };
    assert_eq!(failure.step_name, "prepare");
    assert_eq!(failure.error, StepError::Failed("renderer unavailable".to_string()));
    assert_eq!(failing.attempts(), 3);
    assert_eq!(step.retry_count, 2);
    assert_eq!(step.status, StepStatus::Failed);
}

#[tokio::test]
async fn test_executor_zero_retries() {
    let failing = Arc::new(AlwaysFailingHandler::new(StepType::Postprocessing));
    let mut registry = HandlerRegistry::new();
    registry.register(failing.clone());
    let executor = StepExecutor::new(Arc::new(registry));

    let workflow = Workflow::new("No retries", None);
    let mut step = Step::new("render", StepType::Postprocessing).with_max_retries(0);

    let outcome = executor.execute(&workflow, &mut step, &Map::new()).await;
    assert!(!outcome.is_completed());
    assert_eq!(failing.attempts(), 1);
    assert_eq!(step.retry_count, 0);
}
