//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::EngineError;
use crate::server::handlers::{
    cancel_workflow_handler, create_workflow_handler, execute_workflow_handler,
    get_workflow_handler, health_handler, list_results_handler, list_workflows_handler,
    schedule_workflow_handler, version_handler,
};
use crate::server::state::ServerState;

/// Build the control API router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Workflows
        .route(
            "/workflows",
            get(list_workflows_handler).post(create_workflow_handler),
        )
        .route("/workflows/{id}", get(get_workflow_handler))
        .route("/workflows/{id}/execute", post(execute_workflow_handler))
        .route("/workflows/{id}/schedule", post(schedule_workflow_handler))
        .route("/workflows/{id}/cancel", post(cancel_workflow_handler))
        // Results
        .route("/workflows/{id}/results", get(list_results_handler))
        // State and middleware
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), EngineError>>, EngineError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| EngineError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| EngineError::ServerError(e.to_string()))
    });

    Ok(handle)
}
