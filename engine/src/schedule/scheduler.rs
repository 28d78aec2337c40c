//! Workflow scheduler
//!
//! A tick selects due SCHEDULED workflows, claims each one and queues its id
//! for the worker pool. Workers call [`Scheduler::process_queued`], which
//! drops ids whose workflow was cancelled while queued, runs the rest,
//! computes the next run of recurring workflows and releases the claim.
//! On-demand runs go through the same claim.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::errors::EngineError;
use crate::execute::fsm::{WorkflowEvent, WorkflowFsm};
use crate::execute::runner::WorkflowRunner;
use crate::models::result::AnalysisResult;
use crate::models::workflow::{Workflow, WorkflowStatus};
use crate::schedule::policy::NextRunPolicy;
use crate::store::WorkflowStore;

/// Default execution lease, long enough for the slowest workflow
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Counters for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Due, active and SCHEDULED
    pub due: usize,

    /// Claimed and queued
    pub dispatched: usize,

    /// Claimed elsewhere, queue full or failed to claim
    pub skipped: usize,
}

pub struct Scheduler {
    workflows: Arc<dyn WorkflowStore>,
    runner: WorkflowRunner,
    policy: Arc<dyn NextRunPolicy>,
    lease_ttl: Duration,
}

impl Scheduler {
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        runner: WorkflowRunner,
        policy: Arc<dyn NextRunPolicy>,
        lease_ttl: Duration,
    ) -> Self {
        Self {
            workflows,
            runner,
            policy,
            lease_ttl,
        }
    }

    pub fn runner(&self) -> &WorkflowRunner {
        &self.runner
    }

    /// Select due workflows and queue them for execution
    pub async fn tick(
        &self,
        now: DateTime<Utc>,
        queue: &mpsc::Sender<String>,
    ) -> Result<TickReport, EngineError> {
        let due: Vec<Workflow> = self
            .workflows
            .find_due(now)
            .await?
            .into_iter()
            .filter(|w| w.status == WorkflowStatus::Scheduled)
            .collect();

        let mut report = TickReport {
            due: due.len(),
            ..TickReport::default()
        };

        for workflow in due {
            match self.workflows.try_claim(&workflow.id, self.lease_ttl).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Workflow {} is already being executed", workflow.id);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!("Failed to claim workflow {}: {}", workflow.id, e);
                    report.skipped += 1;
                    continue;
                }
            }

            match queue.try_send(workflow.id.clone()) {
                Ok(()) => {
                    debug!("Queued workflow {} ({})", workflow.id, workflow.name);
                    report.dispatched += 1;
                }
                Err(TrySendError::Full(id)) => {
                    warn!("Execution queue full, deferring workflow {}", id);
                    self.abandon(&id).await;
                    report.skipped += 1;
                }
                Err(TrySendError::Closed(id)) => {
                    self.abandon(&id).await;
                    return Err(EngineError::ShutdownError(
                        "Execution queue is closed".to_string(),
                    ));
                }
            }
        }

        if report.due > 0 {
            info!(
                "Scheduler tick: {} due, {} dispatched, {} skipped",
                report.due, report.dispatched, report.skipped
            );
        }
        Ok(report)
    }

    /// Run a workflow id taken off the execution queue.
    ///
    /// The workflow may have changed since the tick that queued it. Returns
    /// `None` and releases the claim if it is no longer SCHEDULED and due.
    pub async fn process_queued(
        &self,
        workflow_id: &str,
    ) -> Result<Option<AnalysisResult>, EngineError> {
        let workflow = match self.workflows.find_by_id(workflow_id).await {
            Ok(workflow) => workflow,
            Err(e) => {
                self.abandon(workflow_id).await;
                return Err(e);
            }
        };

        let still_due = workflow
            .as_ref()
            .map(|w| w.status == WorkflowStatus::Scheduled && w.is_due(Utc::now()))
            .unwrap_or(false);
        if !still_due {
            debug!(
                "Workflow {} is no longer scheduled and due, dropping queued run",
                workflow_id
            );
            self.abandon(workflow_id).await;
            return Ok(None);
        }

        self.process(workflow_id).await.map(Some)
    }

    /// Run a claimed workflow and release the claim. A workflow that was
    /// SCHEDULED before the run gets its next run if it is recurring.
    pub async fn process(&self, workflow_id: &str) -> Result<AnalysisResult, EngineError> {
        let outcome = self.run(workflow_id).await;
        self.abandon(workflow_id).await;
        outcome
    }

    /// Run a workflow now, outside the schedule
    pub async fn execute_now(&self, workflow_id: &str) -> Result<AnalysisResult, EngineError> {
        if self.workflows.find_by_id(workflow_id).await?.is_none() {
            return Err(EngineError::NotFound(format!("Workflow {}", workflow_id)));
        }

        if !self.workflows.try_claim(workflow_id, self.lease_ttl).await? {
            return Err(EngineError::Conflict(format!(
                "Workflow {} is already being executed",
                workflow_id
            )));
        }

        info!("Executing workflow {} on demand", workflow_id);
        self.process(workflow_id).await
    }

    /// Put a workflow on the schedule.
    ///
    /// `expression` replaces the stored schedule expression when given. The
    /// first run is `start_at`, or the policy's next run from now.
    pub async fn schedule(
        &self,
        workflow_id: &str,
        expression: Option<String>,
        start_at: Option<DateTime<Utc>>,
    ) -> Result<Workflow, EngineError> {
        let mut workflow = self.load(workflow_id).await?;

        let mut fsm = WorkflowFsm::from_status(workflow.status);
        workflow.status = fsm.process(WorkflowEvent::Schedule)?;

        if let Some(expression) = expression {
            workflow.schedule_expression = Some(expression);
        }
        let expression = workflow.schedule_expression.clone().unwrap_or_default();
        let next_run = start_at.unwrap_or_else(|| self.policy.next_run(&expression, Utc::now()));
        workflow.next_scheduled_run = Some(next_run);

        self.workflows.save(&workflow).await?;
        info!("Scheduled workflow {} for {}", workflow.id, next_run);
        Ok(workflow)
    }

    /// Take a workflow off the schedule. An execution already in flight is
    /// not interrupted.
    pub async fn cancel(&self, workflow_id: &str) -> Result<Workflow, EngineError> {
        let mut workflow = self.load(workflow_id).await?;

        let mut fsm = WorkflowFsm::from_status(workflow.status);
        workflow.status = fsm.process(WorkflowEvent::Cancel)?;
        workflow.next_scheduled_run = None;

        self.workflows.save(&workflow).await?;
        info!("Cancelled schedule of workflow {}", workflow.id);
        Ok(workflow)
    }

    /// Drop the claim on a workflow that will not run
    pub async fn abandon(&self, workflow_id: &str) {
        if let Err(e) = self.workflows.release(workflow_id).await {
            warn!("Failed to release claim on workflow {}: {}", workflow_id, e);
        }
    }

    async fn run(&self, workflow_id: &str) -> Result<AnalysisResult, EngineError> {
        let was_scheduled = self.load(workflow_id).await?.status == WorkflowStatus::Scheduled;
        let result = self.runner.execute(workflow_id).await?;

        if was_scheduled {
            if let Err(e) = self.reschedule(workflow_id).await {
                error!("Failed to reschedule workflow {}: {}", workflow_id, e);
            }
        }
        Ok(result)
    }

    async fn reschedule(&self, workflow_id: &str) -> Result<(), EngineError> {
        let mut workflow = self.load(workflow_id).await?;

        let expression = match workflow.schedule_expression.as_deref() {
            Some(expr) if workflow.is_recurring() => expr.to_string(),
            _ => {
                debug!("Workflow {} is one-shot, not rescheduling", workflow_id);
                return Ok(());
            }
        };

        // A lost final save leaves the run's RUNNING status behind
        let mut fsm = WorkflowFsm::from_status(WorkflowRunner::resumable_status(&workflow));
        workflow.status = fsm.process(WorkflowEvent::Reschedule)?;

        let next_run = self.policy.next_run(&expression, Utc::now());
        workflow.next_scheduled_run = Some(next_run);
        self.workflows.save(&workflow).await?;

        info!("Workflow {} next run at {}", workflow_id, next_run);
        Ok(())
    }

    async fn load(&self, workflow_id: &str) -> Result<Workflow, EngineError> {
        self.workflows
            .find_by_id(workflow_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("Workflow {}", workflow_id)))
    }
}
