//! In-memory stores

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::EngineError;
use crate::models::result::AnalysisResult;
use crate::models::workflow::Workflow;
use crate::store::{ResultStore, WorkflowStore};

/// In-memory workflow store with execution leases
#[derive(Default)]
pub struct MemoryWorkflowStore {
    entries: RwLock<HashMap<String, Workflow>>,
    leases: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MemoryWorkflowStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with workflows
    pub fn with_workflows(workflows: impl IntoIterator<Item = Workflow>) -> Self {
        let store = Self::new();
        {
            let mut entries = store.entries.write().unwrap_or_else(|e| e.into_inner());
            for workflow in workflows {
                entries.insert(workflow.id.clone(), workflow);
            }
        }
        store
    }

    /// Get store size
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while a live lease holds the workflow
    pub fn is_claimed(&self, id: &str) -> bool {
        let leases = self.leases.read().unwrap_or_else(|e| e.into_inner());
        leases.get(id).map(|exp| *exp > Utc::now()).unwrap_or(false)
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Workflow>, EngineError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Workflow>, EngineError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut workflows: Vec<Workflow> = entries.values().cloned().collect();
        workflows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(workflows)
    }

    async fn save(&self, workflow: &Workflow) -> Result<(), EngineError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, EngineError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Ok(entries.remove(id).is_some())
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Workflow>, EngineError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut due: Vec<Workflow> = entries
            .values()
            .filter(|w| w.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|w| w.next_scheduled_run);
        Ok(due)
    }

    async fn try_claim(&self, id: &str, ttl: Duration) -> Result<bool, EngineError> {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| EngineError::StoreError(format!("Invalid lease ttl: {}", e)))?;

        let mut leases = self.leases.write().unwrap_or_else(|e| e.into_inner());
        if let Some(expires_at) = leases.get(id) {
            if *expires_at > now {
                debug!("Workflow {} already claimed until {}", id, expires_at);
                return Ok(false);
            }
        }
        leases.insert(id.to_string(), now + ttl);
        Ok(true)
    }

    async fn release(&self, id: &str) -> Result<(), EngineError> {
        let mut leases = self.leases.write().unwrap_or_else(|e| e.into_inner());
        leases.remove(id);
        Ok(())
    }
}

/// In-memory result store
#[derive(Default)]
pub struct MemoryResultStore {
    entries: RwLock<HashMap<String, AnalysisResult>>,
}

impl MemoryResultStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get store size
    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn save(&self, result: &AnalysisResult) -> Result<(), EngineError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(result.id.clone(), result.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AnalysisResult>, EngineError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(id).cloned())
    }

    async fn find_by_workflow_order_by_date_desc(
        &self,
        workflow_id: &str,
    ) -> Result<Vec<AnalysisResult>, EngineError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut results: Vec<AnalysisResult> = entries
            .values()
            .filter(|r| r.workflow_id == workflow_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| b.execution_date.cmp(&a.execution_date));
        Ok(results)
    }
}
