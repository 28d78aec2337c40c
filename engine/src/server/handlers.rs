//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use openapi_server::models::{
    CreateWorkflowRequest, ErrorResponse, ExecutionResponse, HealthResponse, ResultListResponse,
    ResultSummary, ScheduleRequest, StepRequest, VersionResponse, WorkflowControlResponse,
    WorkflowListResponse, WorkflowSummary,
};
use serde_json::Value;
use tracing::error;

use crate::errors::EngineError;
use crate::models::result::AnalysisResult;
use crate::models::workflow::{Step, StepType, Workflow, WorkflowType};
use crate::server::state::ServerState;
use crate::utils::version_info;

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidConfiguration(_) => StatusCode::BAD_REQUEST,
            EngineError::Conflict(_) | EngineError::InvalidTransition(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

fn workflow_summary(workflow: &Workflow) -> WorkflowSummary {
    WorkflowSummary {
        id: workflow.id.clone(),
        name: workflow.name.clone(),
        workflow_type: workflow.workflow_type.map(|t| t.to_string()),
        status: workflow.status.as_str().to_string(),
        is_active: workflow.is_active,
        schedule_expression: workflow.schedule_expression.clone(),
        next_scheduled_run: workflow.next_scheduled_run,
        last_run_at: workflow.last_run_at,
        step_count: workflow.steps.len(),
    }
}

fn control_response(workflow: &Workflow, message: &str) -> WorkflowControlResponse {
    WorkflowControlResponse {
        success: true,
        workflow_id: workflow.id.clone(),
        status: workflow.status.as_str().to_string(),
        next_scheduled_run: workflow.next_scheduled_run,
        message: Some(message.to_string()),
    }
}

fn result_summary(result: &AnalysisResult) -> ResultSummary {
    let count = |key: &str| result.result_data.get(key).and_then(Value::as_u64).unwrap_or(0);

    ResultSummary {
        id: result.id.clone(),
        workflow_id: result.workflow_id.clone(),
        status: result.status.as_str().to_string(),
        execution_date: result.execution_date,
        completion_date: result.completion_date,
        processing_time_ms: result.processing_time_ms,
        confidence_score: result.confidence_score,
        completed_steps: count("completedSteps"),
        total_steps: count("totalSteps"),
    }
}

fn step_from_request(request: StepRequest) -> Step {
    // Unknown tags become StepType::Unsupported and fail at execution
    let tag = Value::String(request.step_type.trim().to_uppercase());
    let step_type = serde_json::from_value::<StepType>(tag).unwrap_or(StepType::Unsupported);

    let mut step = Step::new(request.name, step_type);
    step.configuration = request.configuration;
    if let Some(max_retries) = request.max_retries {
        step.max_retries = max_retries;
    }
    step
}

fn workflow_from_request(request: CreateWorkflowRequest) -> Result<Workflow, EngineError> {
    if request.name.trim().is_empty() {
        return Err(EngineError::InvalidConfiguration(
            "Workflow name is required".to_string(),
        ));
    }

    let workflow_type = request
        .workflow_type
        .as_deref()
        .map(str::parse::<WorkflowType>)
        .transpose()
        .map_err(EngineError::InvalidConfiguration)?;

    let mut workflow = Workflow::new(request.name, workflow_type);
    workflow.schedule_expression = request.schedule_expression;
    workflow.is_active = request.is_active.unwrap_or(true);
    workflow.area_of_interest = request.area_of_interest;
    workflow.parameters = request.parameters;
    workflow.model_ids = request.model_ids;
    workflow.steps = request.steps.into_iter().map(step_from_request).collect();
    Ok(workflow)
}

async fn load_workflow(state: &ServerState, id: &str) -> Result<Workflow, EngineError> {
    state
        .workflows
        .find_by_id(id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("Workflow {}", id)))
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "geoflow".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// List workflows
pub async fn list_workflows_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<WorkflowListResponse>, EngineError> {
    let workflows: Vec<WorkflowSummary> = state
        .workflows
        .find_all()
        .await?
        .iter()
        .map(workflow_summary)
        .collect();

    Ok(Json(WorkflowListResponse {
        total: workflows.len(),
        workflows,
    }))
}

/// Create a workflow in CREATED state
pub async fn create_workflow_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<CreateWorkflowRequest>,
) -> Result<(StatusCode, Json<WorkflowSummary>), EngineError> {
    let workflow = workflow_from_request(request)?;
    state.workflows.save(&workflow).await?;
    Ok((StatusCode::CREATED, Json(workflow_summary(&workflow))))
}

/// Get a workflow with its steps
pub async fn get_workflow_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Workflow>, EngineError> {
    Ok(Json(load_workflow(&state, &id).await?))
}

/// Execute a workflow now and wait for its result
pub async fn execute_workflow_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<ExecutionResponse>, EngineError> {
    let result = state.scheduler.execute_now(&id).await?;

    Ok(Json(ExecutionResponse {
        result_id: result.id.clone(),
        workflow_id: result.workflow_id.clone(),
        status: result.status.as_str().to_string(),
        processing_time_ms: result.processing_time_ms,
        confidence_score: result.confidence_score,
        error: result.error().map(str::to_string),
        result_data: Value::Object(result.result_data),
    }))
}

/// Put a workflow on the schedule
pub async fn schedule_workflow_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    Json(request): Json<ScheduleRequest>,
) -> Result<Json<WorkflowControlResponse>, EngineError> {
    let workflow = state
        .scheduler
        .schedule(&id, request.expression, request.start_at)
        .await?;
    Ok(Json(control_response(&workflow, "Workflow scheduled")))
}

/// Take a workflow off the schedule
pub async fn cancel_workflow_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowControlResponse>, EngineError> {
    let workflow = state.scheduler.cancel(&id).await?;
    Ok(Json(control_response(&workflow, "Workflow schedule cancelled")))
}

/// Results of a workflow, newest first
pub async fn list_results_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<ResultListResponse>, EngineError> {
    load_workflow(&state, &id).await?;

    let results: Vec<ResultSummary> = state
        .results
        .find_by_workflow_order_by_date_desc(&id)
        .await?
        .iter()
        .map(result_summary)
        .collect();

    Ok(Json(ResultListResponse {
        total: results.len(),
        results,
    }))
}
