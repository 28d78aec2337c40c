//! Shared fixtures for the integration tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use geoflow::clients::metrics::MemoryMetricsSink;
use geoflow::clients::FunctionInvoker;
use geoflow::errors::EngineError;
use geoflow::execute::executor::StepExecutor;
use geoflow::execute::recorder::ResultRecorder;
use geoflow::execute::runner::WorkflowRunner;
use geoflow::models::workflow::{Step, StepType, Workflow, WorkflowStatus, WorkflowType};
use geoflow::schedule::policy::FixedDelayPolicy;
use geoflow::schedule::scheduler::Scheduler;
use geoflow::steps::handler::{StepError, StepHandler, StepInput, StepOutput};
use geoflow::steps::registry::HandlerRegistry;
use geoflow::store::memory::{MemoryResultStore, MemoryWorkflowStore};
use geoflow::store::WorkflowStore;

pub const LEASE_TTL: Duration = Duration::from_secs(60);

/// What the scripted invoker answers for a function
#[derive(Debug, Clone)]
pub enum Reply {
    Body(String),
    Fail(String),
}

/// Records invocations and answers from a script
#[derive(Default)]
pub struct ScriptedInvoker {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, function_name: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert(function_name.to_string(), reply);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FunctionInvoker for ScriptedInvoker {
    async fn invoke(&self, function_name: &str, payload: &Value) -> Result<String, EngineError> {
        self.calls
            .lock()
            .unwrap()
            .push((function_name.to_string(), payload.clone()));

        let reply = self.replies.lock().unwrap().get(function_name).cloned();
        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::Fail(msg)) => Err(EngineError::RemoteInvocation(msg)),
            None => Ok(json!({"status": "ok"}).to_string()),
        }
    }
}

/// Fails every attempt with a retryable error
pub struct AlwaysFailingHandler {
    step_type: StepType,
    attempts: AtomicU32,
}

impl AlwaysFailingHandler {
    pub fn new(step_type: StepType) -> Self {
        Self {
            step_type,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StepHandler for AlwaysFailingHandler {
    async fn execute(&self, _input: StepInput<'_>) -> Result<StepOutput, StepError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StepError::Failed("renderer unavailable".to_string()))
    }

    fn step_type(&self) -> StepType {
        self.step_type
    }
}

/// Fails the first save of a COMPLETED or FAILED workflow
pub struct LosesFinalSave {
    inner: Arc<MemoryWorkflowStore>,
    lost: AtomicBool,
}

impl LosesFinalSave {
    pub fn new(inner: Arc<MemoryWorkflowStore>) -> Self {
        Self {
            inner,
            lost: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl WorkflowStore for LosesFinalSave {
    async fn find_by_id(&self, id: &str) -> Result<Option<Workflow>, EngineError> {
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<Workflow>, EngineError> {
        self.inner.find_all().await
    }

    async fn save(&self, workflow: &Workflow) -> Result<(), EngineError> {
        let finished = matches!(
            workflow.status,
            WorkflowStatus::Completed | WorkflowStatus::Failed
        );
        if finished && !self.lost.swap(true, Ordering::SeqCst) {
            return Err(EngineError::StoreError("connection reset".to_string()));
        }
        self.inner.save(workflow).await
    }

    async fn delete(&self, id: &str) -> Result<bool, EngineError> {
        self.inner.delete(id).await
    }

    async fn find_due(&self, now: DateTime<Utc>) -> Result<Vec<Workflow>, EngineError> {
        self.inner.find_due(now).await
    }

    async fn try_claim(&self, id: &str, ttl: Duration) -> Result<bool, EngineError> {
        self.inner.try_claim(id, ttl).await
    }

    async fn release(&self, id: &str) -> Result<(), EngineError> {
        self.inner.release(id).await
    }
}

/// Engine wired over in-memory collaborators
pub struct Harness {
    pub workflows: Arc<MemoryWorkflowStore>,
    pub results: Arc<MemoryResultStore>,
    pub metrics: Arc<MemoryMetricsSink>,
    pub invoker: Arc<ScriptedInvoker>,
    pub runner: WorkflowRunner,
    pub scheduler: Arc<Scheduler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_handlers(Vec::new())
    }

    /// Built-in handlers, with `overrides` registered on top
    pub fn with_handlers(overrides: Vec<Arc<dyn StepHandler>>) -> Self {
        Self::build(overrides, |workflows| workflows)
    }

    /// The engine's first write of a finished workflow is lost
    pub fn with_lost_final_save() -> Self {
        Self::build(Vec::new(), |workflows| {
            Arc::new(LosesFinalSave::new(workflows))
        })
    }

    fn build(
        overrides: Vec<Arc<dyn StepHandler>>,
        engine_store: impl FnOnce(Arc<MemoryWorkflowStore>) -> Arc<dyn WorkflowStore>,
    ) -> Self {
        let workflows = Arc::new(MemoryWorkflowStore::new());
        let engine_workflows = engine_store(workflows.clone());
        let results = Arc::new(MemoryResultStore::new());
        let metrics = Arc::new(MemoryMetricsSink::new());
        let invoker = Arc::new(ScriptedInvoker::new());

        let mut registry = HandlerRegistry::with_builtins(invoker.clone());
        for handler in overrides {
            registry.register(handler);
        }

        let executor = StepExecutor::new(Arc::new(registry));
        let recorder =
            ResultRecorder::new(engine_workflows.clone(), results.clone(), metrics.clone());
        let runner =
            WorkflowRunner::new(engine_workflows.clone(), results.clone(), executor, recorder);
        let scheduler = Arc::new(Scheduler::new(
            engine_workflows,
            runner.clone(),
            Arc::new(FixedDelayPolicy::default()),
            LEASE_TTL,
        ));

        Self {
            workflows,
            results,
            metrics,
            invoker,
            runner,
            scheduler,
        }
    }

    pub async fn insert(&self, workflow: &Workflow) {
        self.workflows.save(workflow).await.unwrap();
    }

    pub async fn load(&self, id: &str) -> Workflow {
        self.workflows.find_by_id(id).await.unwrap().unwrap()
    }
}

/// Collection, preprocessing and analysis of an anomaly detection workflow
pub fn anomaly_workflow() -> Workflow {
    let mut workflow = Workflow::new("Harbor anomalies", Some(WorkflowType::AnomalyDetection))
        .with_step(Step::new("collect", StepType::DataCollection))
        .with_step(Step::new("prepare", StepType::Preprocessing))
        .with_step(Step::new("analyze", StepType::AiAnalysis));
    workflow.area_of_interest = Some(json!({
        "type": "Polygon",
        "coordinates": [[[4.40, 51.22], [4.42, 51.22], [4.42, 51.24], [4.40, 51.22]]],
    }));
    workflow
}

/// A SCHEDULED workflow due at `next_run`
pub fn scheduled_workflow(name: &str, next_run: DateTime<Utc>) -> Workflow {
    let mut workflow = Workflow::new(name, Some(WorkflowType::ChangeDetection))
        .with_step(Step::new("collect", StepType::DataCollection))
        .with_step(Step::new("analyze", StepType::AiAnalysis));
    workflow.status = WorkflowStatus::Scheduled;
    workflow.next_scheduled_run = Some(next_run);
    workflow
}
