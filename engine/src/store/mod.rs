//! Persistence seams for workflows and analysis results
//!
//! The engine only talks to storage through these traits. Every call is one
//! state transition and must be atomic on its own: a save either lands
//! entirely or not at all.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::EngineError;
use crate::models::result::AnalysisResult;
use crate::models::workflow::Workflow;

/// Workflow persistence
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Find a workflow by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Workflow>, EngineError>;

    /// List all workflows
    async fn find_all(&self) -> Result<Vec<Workflow>, EngineError>;

    /// Insert or replace a workflow
    async fn save(&self, workflow: &Workflow) -> Result<(), EngineError>;

    /// Delete a workflow. Returns `true` if it existed.
    async fn delete(&self, id: &str) -> Result<bool, EngineError>;

    /// Workflows with `next_scheduled_run <= now` that are active.
    /// No status filtering happens here.
    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Workflow>, EngineError>;

    /// Take an exclusive execution lease on a workflow.
    /// Returns `false` if another live lease holds it.
    async fn try_claim(&self, id: &str, ttl: Duration) -> Result<bool, EngineError>;

    /// Drop the execution lease
    async fn release(&self, id: &str) -> Result<(), EngineError>;
}

/// Analysis result persistence
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert or replace a result
    async fn save(&self, result: &AnalysisResult) -> Result<(), EngineError>;

    /// Find a result by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<AnalysisResult>, EngineError>;

    /// Results of one workflow, newest execution first
    async fn find_by_workflow_order_by_date_desc(
        &self,
        workflow_id: &str,
    ) -> Result<Vec<AnalysisResult>, EngineError>;
}
