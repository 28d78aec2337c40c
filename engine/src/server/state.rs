//! Server state

use std::sync::Arc;

use crate::app::state::AppState;
use crate::schedule::scheduler::Scheduler;
use crate::store::{ResultStore, WorkflowStore};

/// Server state shared across handlers
pub struct ServerState {
    pub workflows: Arc<dyn WorkflowStore>,
    pub results: Arc<dyn ResultStore>,
    pub scheduler: Arc<Scheduler>,
}

impl ServerState {
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        results: Arc<dyn ResultStore>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self {
            workflows,
            results,
            scheduler,
        }
    }

    pub fn from_app(app_state: &AppState) -> Self {
        Self::new(
            app_state.workflows.clone(),
            app_state.results.clone(),
            app_state.scheduler.clone(),
        )
    }
}
